use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ladle_ai::GenerationError;
use thiserror::Error;
use tracing::error;

/// HTTP error taxonomy. NotFound deliberately covers both "absent" and
/// "caller lacks permission" so resource existence is never disclosed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub const RECIPE_NOT_FOUND: &'static str = "recipe not found";
    pub const SHARE_NOT_FOUND: &'static str = "recipe not found or share link expired";
    pub const USER_NOT_FOUND: &'static str = "user not found";
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(err.into())
        }
    }
}
