mod light_me;
mod stream;
mod trending;

use std::sync::Arc;

use anydoor_core::{AppConfig, Classifier};
use anydoor_stream::{BackendClient, StreamError};
use axum::{
    extract::State,
    handler::Handler,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{client_address, gateway, request_id, RequestId};
use crate::pages;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub classifier: Arc<Classifier>,
    pub config: Arc<AppConfig>,
    pub backend: BackendClient,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`StreamError::Http`] if the backend HTTP client cannot be built.
    pub fn new(
        pool: PgPool,
        classifier: Arc<Classifier>,
        config: Arc<AppConfig>,
    ) -> Result<Self, StreamError> {
        let backend = BackendClient::new(&config.generation)?;
        Ok(Self {
            pool,
            classifier,
            config,
            backend,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &anydoor_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Configuration problems become a 500 naming what is missing; everything
/// else from the backend is a 502.
pub(super) fn map_stream_error(request_id: String, error: &StreamError) -> ApiError {
    match error {
        StreamError::Configuration(e) => {
            tracing::error!(error = %e, "generation backend is not configured");
            ApiError::new(request_id, "configuration_error", e.to_string())
        }
        other => {
            tracing::warn!(error = %other, "generation backend call failed");
            ApiError::new(request_id, "upstream_error", other.consumer_message())
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/stream", post(stream::stream_page))
        .route(
            "/api/trending",
            get(trending::list_trending).post(trending::record_trending),
        )
        .route("/api/light-me", post(light_me::light_me))
        .route("/api/{*rest}", get(pages::not_found).post(pages::not_found));

    let fixed_pages = Router::new()
        .route("/", get(pages::home))
        .route("/robots.txt", get(pages::robots))
        .route("/sitemap.xml", get(pages::sitemap))
        .route("/favicon.ico", get(pages::not_found))
        .route("/assets/{*rest}", get(pages::not_found));

    // Everything else is a dynamically generated page and goes through the gateway.
    let dynamic_page = pages::generation_shell.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        gateway,
    ));

    Router::new()
        .merge(api_routes)
        .merge(fixed_pages)
        .fallback(dynamic_page)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn(client_address)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match anydoor_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use anydoor_core::{
        AppConfig, Classifier, ClassifierRules, Environment, GenerationSettings,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Response};
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;

    use super::AppState;

    pub(crate) fn test_config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/anydoor_test".to_string(),
            env: Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "debug".to_string(),
            host_url: "localhost:3000".to_string(),
            site_name: "Any Door".to_string(),
            rules_path: None,
            db_max_connections: 2,
            db_min_connections: 0,
            db_acquire_timeout_secs: 1,
            generation: GenerationSettings {
                max_tokens: 4096,
                connect_timeout_secs: 5,
                ..GenerationSettings::default()
            },
            retention_cron: "0 30 3 * * *".to_string(),
            event_retention_days: 30,
            search_log_retention_days: 90,
        }
    }

    /// Settings pointing at a mock backend.
    pub(crate) fn mock_generation(endpoint: &str) -> GenerationSettings {
        GenerationSettings {
            endpoint: Some(format!("{endpoint}/v1/chat/completions")),
            api_key: Some("test-key".to_string()),
            model: Some("page-model".to_string()),
            free_model: Some("free-model".to_string()),
            max_tokens: 4096,
            connect_timeout_secs: 5,
        }
    }

    /// Pool that never connects; for routes that must not touch the database.
    pub(crate) fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://localhost/anydoor_unused")
            .expect("lazy pool")
    }

    pub(crate) fn state_with(pool: PgPool, config: AppConfig) -> AppState {
        let classifier =
            Arc::new(Classifier::new(&ClassifierRules::default()).expect("default rules"));
        AppState::new(pool, classifier, Arc::new(config)).expect("state")
    }

    pub(crate) fn test_state() -> AppState {
        state_with(lazy_pool(), test_config())
    }

    pub(crate) async fn body_text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    pub(crate) async fn body_json(response: Response<Body>) -> serde_json::Value {
        serde_json::from_str(&body_text(response).await).expect("json body")
    }

    pub(crate) fn json_post(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("user-agent", "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0")
            .body(Body::from(body.to_string()))
            .expect("request")
    }
}
