use std::net::SocketAddr;

use anydoor_core::ClassificationVerdict;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::USER_AGENT, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::AppState;
use crate::landing::render_landing;

/// Longest user-agent prefix written to denial logs.
const LOGGED_UA_CHARS: usize = 100;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Best-effort client address, stored as a request extension.
///
/// Only used to derive the dedup identity hash, never for access control.
#[derive(Debug, Clone, Default)]
pub struct ClientAddr(pub Option<String>);

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Resolve the client address from proxy headers, falling back to the peer.
pub async fn client_address(mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let addr = resolve_client_addr(req.headers(), peer);
    req.extensions_mut().insert(ClientAddr(addr));
    next.run(req).await
}

/// First `x-forwarded-for` entry, then `x-real-ip`, then the socket peer.
fn resolve_client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(ToOwned::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Traffic gateway for dynamically generated pages.
///
/// Runs the classifier on the request path and user-agent before the
/// generation shell is reached. Blocked requests get an empty 404 or 403;
/// crawlers get the static landing document and never reach generation.
pub async fn gateway(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);

    let classification = state
        .classifier
        .classify_detailed(&path, user_agent.as_deref());

    match classification.verdict {
        ClassificationVerdict::Pass => next.run(req).await,
        ClassificationVerdict::BlockNotFound => {
            tracing::warn!(
                path = %path,
                user_agent = %ua_prefix(user_agent.as_deref()),
                reason = %classification.reason,
                "gateway: blocked path"
            );
            StatusCode::NOT_FOUND.into_response()
        }
        ClassificationVerdict::BlockForbidden => {
            tracing::warn!(
                path = %path,
                user_agent = %ua_prefix(user_agent.as_deref()),
                reason = %classification.reason,
                "gateway: blocked user-agent"
            );
            StatusCode::FORBIDDEN.into_response()
        }
        ClassificationVerdict::SyntheticLanding => {
            tracing::info!(
                path = %path,
                user_agent = %ua_prefix(user_agent.as_deref()),
                reason = %classification.reason,
                "gateway: serving crawler landing page"
            );
            render_landing(&path, &state.config)
        }
    }
}

fn ua_prefix(user_agent: Option<&str>) -> String {
    user_agent
        .unwrap_or("<none>")
        .chars()
        .take(LOGGED_UA_CHARS)
        .collect()
}
