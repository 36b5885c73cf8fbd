//! `POST /api/stream`: proxy a page-generation stream from the backend.
//!
//! This entry point is not behind the gateway, so it re-runs the path validity
//! check before anything is sent upstream.

use anydoor_stream::backend::GenerationRequest;
use anydoor_stream::{StreamError, StreamRequest};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_stream_error, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct StreamBody {
    path: Option<String>,
    #[serde(rename = "userAgent")]
    user_agent: Option<String>,
}

pub(super) async fn stream_page(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    payload: Result<Json<StreamBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload.map_err(|e| {
        ApiError::new(req_id.0.clone(), "bad_request", format!("invalid request body: {e}"))
    })?;

    let Some(path) = body.path else {
        return Err(ApiError::new(req_id.0, "bad_request", "missing path"));
    };

    if let Err(rejection) = state.classifier.path_rules().validate_search_path(&path) {
        tracing::warn!(path = %path, reason = %rejection, "stream: rejected path");
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            rejection.to_string(),
        ));
    }

    let user_agent = body
        .user_agent
        .filter(|ua| !ua.trim().is_empty())
        .or_else(|| {
            headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_default();

    let request = StreamRequest::new(path, user_agent);
    let upstream = match state
        .backend
        .open_stream(&GenerationRequest::for_page(&request))
        .await
    {
        Ok(response) => response,
        Err(StreamError::UpstreamStatus { status, body }) => {
            tracing::warn!(status, path = %request.path, "stream: upstream returned an error status");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            return Ok((
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response());
        }
        Err(e) => return Err(map_stream_error(req_id.0, &e)),
    };

    tracing::info!(path = %request.path, "stream: proxying generation stream");
    let mut response = Body::from_stream(upstream.bytes_stream()).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}
