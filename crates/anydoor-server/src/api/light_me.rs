//! `POST /api/light-me`: one random word to explore next.

use anydoor_stream::prompt::light_me_prompt;
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_stream_error, ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub(super) struct LightMeBody {
    #[serde(default)]
    history: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct LightMeResult {
    word: String,
}

/// A malformed body is treated as an empty history.
pub(super) async fn light_me(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<LightMeBody>, JsonRejection>,
) -> Result<Json<LightMeResult>, ApiError> {
    let body = payload.map(|Json(body)| body).unwrap_or_default();
    let prompt = light_me_prompt(&body.history);

    let word = state
        .backend
        .complete(&prompt)
        .await
        .map_err(|e| map_stream_error(req_id.0, &e))?;

    tracing::debug!(word = %word, history = body.history.len(), "light-me: suggested word");
    Ok(Json(LightMeResult { word }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::build_app;
    use crate::api::test_support::{
        body_json, json_post, lazy_pool, mock_generation, state_with, test_config, test_state,
    };

    #[tokio::test]
    async fn unconfigured_backend_is_configuration_error() {
        let response = build_app(test_state())
            .oneshot(json_post("/api/light-me", &serde_json::json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["code"], "configuration_error");
    }

    #[tokio::test]
    async fn returns_word_from_free_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "model": "free-model" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": " aurora " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = test_config();
        config.generation = mock_generation(&server.uri());
        let response = build_app(state_with(lazy_pool(), config))
            .oneshot(json_post(
                "/api/light-me",
                &serde_json::json!({ "history": ["tokyo", "ramen"] }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["word"], "aurora");
    }

    #[tokio::test]
    async fn backend_failure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let mut config = test_config();
        config.generation = mock_generation(&server.uri());
        let response = build_app(state_with(lazy_pool(), config))
            .oneshot(json_post("/api/light-me", &serde_json::json!({})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "upstream_error");
        assert_eq!(json["error"]["message"], "overloaded");
    }
}
