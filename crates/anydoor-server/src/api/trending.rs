//! `GET /api/trending` (ranked read) and `POST /api/trending` (record a visit).

use anydoor_core::{clamp_trending_limit, identity_hash, today_utc, RecordOutcome};
use anydoor_db::{NewSearchEvent, TrendingRow};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::{ClientAddr, RequestId};

use super::{map_db_error, ApiError, AppState};

/// Trending reads may be cached by clients and proxies for five minutes.
const TRENDING_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Debug, Deserialize)]
pub(super) struct TrendingQuery {
    /// Kept as text so an unparseable value falls back to the default.
    pub limit: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TrendingList {
    success: bool,
    data: Vec<TrendingRow>,
    total: usize,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecordBody {
    path: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RecordResult {
    success: bool,
    outcome: RecordOutcome,
    message: String,
}

pub(super) async fn list_trending(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TrendingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = clamp_trending_limit(
        query
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok()),
    );

    let data = anydoor_db::list_trending(&state.pool, limit, query.category.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let body = TrendingList {
        success: true,
        total: data.len(),
        data,
        timestamp: Utc::now(),
    };
    Ok(([(header::CACHE_CONTROL, TRENDING_CACHE_CONTROL)], Json(body)))
}

/// Record one search. Duplicates and invalid paths are reported in the body,
/// not as HTTP errors.
pub(super) async fn record_trending(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(client): Extension<ClientAddr>,
    headers: HeaderMap,
    payload: Result<Json<RecordBody>, JsonRejection>,
) -> Result<Json<RecordResult>, ApiError> {
    let Json(body) = payload.map_err(|e| {
        ApiError::new(req_id.0.clone(), "bad_request", format!("invalid request body: {e}"))
    })?;
    let Some(path) = body.path else {
        return Err(ApiError::new(req_id.0, "bad_request", "missing path"));
    };

    if let Err(rejection) = state.classifier.path_rules().validate_search_path(&path) {
        tracing::warn!(path = %path, reason = %rejection, "trending: rejected path");
        return Ok(Json(RecordResult {
            success: true,
            outcome: RecordOutcome::Rejected,
            message: rejection.to_string(),
        }));
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let user_hash = identity_hash(client.0.as_deref(), user_agent);
    let category = body
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let event = NewSearchEvent {
        path: &path,
        category,
        user_hash: &user_hash,
        day: today_utc(),
        client_ip: client.0.as_deref(),
        user_agent,
    };
    let outcome = anydoor_db::record_search(&state.pool, &event)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::debug!(path = %path, outcome = %outcome, "trending: recorded search");
    let message = match outcome {
        RecordOutcome::Accepted => "search recorded",
        RecordOutcome::Duplicate => "already counted today",
        RecordOutcome::Rejected => "path rejected",
    };
    Ok(Json(RecordResult {
        success: true,
        outcome,
        message: message.to_string(),
    }))
}
