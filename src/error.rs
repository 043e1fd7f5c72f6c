// Error taxonomy for the HTTP layer.
//
// Handlers return `Result<HttpResponse, ApiError>`; actix renders the error
// through `ResponseError` as the standard `{"error":{code,message}}` body.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

use crate::types::ErrorResponse;

#[derive(Debug, Clone)]
pub enum ApiError {
    /// Missing item/space/label -> 404
    NotFound(String),
    /// Bad or missing request data -> 400
    Validation(String),
    /// No/expired third-party token -> 401
    UpstreamAuth(String),
    /// Third-party API or filesystem failure -> 500
    Upstream(String),
    /// Database failure -> 500
    Database(String),
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::UpstreamAuth(_) => "not_authenticated",
            Self::Upstream(_) => "upstream_error",
            Self::Database(_) => "database_error",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Validation(m)
            | Self::UpstreamAuth(m)
            | Self::Upstream(m)
            | Self::Database(m) => m,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamAuth(_) => StatusCode::UNAUTHORIZED,
            Self::Upstream(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            crate::logging::log_error(&format!("request failed: {}", self));
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.code(), self.message()))
    }
}

impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::not_found("Item not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::validation("space_name required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::UpstreamAuth("no refresh token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Upstream("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Database("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_has_error_field() {
        let res = ApiError::not_found("Label not found").error_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
