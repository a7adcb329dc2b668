//! API errors and their HTTP mapping.
//!
//! Upstream failures never reach this type: a missing snapshot or empty news
//! digest is rendered as an empty-state panel with status 200.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tickerlens_core::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::InvalidSymbol { .. }) => "invalid_symbol",
            Self::Validation(_) => "invalid_input",
            Self::BadRequest(_) => "bad_request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tickerlens_core::SymbolIssue;

    #[test]
    fn invalid_symbol_is_unprocessable() {
        let err = ApiError::from(ValidationError::InvalidSymbol {
            input: String::new(),
            issue: SymbolIssue::Empty,
        });

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "invalid_symbol");
        assert_eq!(err.to_string(), "invalid symbol '': symbol cannot be empty");
    }

    #[test]
    fn bad_request_maps_to_400() {
        let err = ApiError::BadRequest("days must be between 1 and 3650".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "bad_request");
    }
}
