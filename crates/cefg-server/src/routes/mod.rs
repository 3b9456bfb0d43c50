//! HTTP route handlers: the paths the browser graph tool and pages call.

pub mod filters;
pub mod graphs;
pub mod messages;
pub mod stats;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let admin = Router::new()
        .merge(graphs::admin_routes())
        .merge(messages::admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(graphs::routes())
        .merge(filters::routes())
        .merge(messages::routes())
        .merge(admin)
        .nest("/api", stats::routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Header carrying the admin token.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin routes need `x-admin-token` to match the configured token.
/// Without a configured token they are closed to everyone.
async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "Admin access is disabled",
        ));
    };
    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided == Some(expected) {
        Ok(next.run(request).await)
    } else {
        warn!("Rejected admin request to {}", request.uri().path());
        Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Missing or invalid admin token",
        ))
    }
}

/// JSON error response: `{"error": message}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<cefg_core::Error> for ApiError {
    fn from(err: cefg_core::Error) -> Self {
        use cefg_core::Error;
        match err {
            Error::Validation(msg) => Self::bad_request(msg),
            Error::NotFound(msg) => Self::not_found(msg),
            other => {
                // Details stay in the server log.
                error!("Request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

pub type ApiResult<T = Json<serde_json::Value>> = Result<T, ApiError>;

/// Fallback for JSON endpoints hit with the wrong verb.
pub(crate) async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Path ids that do not parse are treated as unknown resources.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id >= 0)
}
