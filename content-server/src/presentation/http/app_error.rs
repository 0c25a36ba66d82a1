use crate::domain::error::DomainError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid request body: {0}")]
    Json(#[from] JsonRejection),

    #[error("invalid path parameter: {0}")]
    Path(#[from] PathRejection),

    #[error("invalid query string: {0}")]
    Query(#[from] QueryRejection),

    #[error("unauthorized")]
    Unauthorized,

    #[error("too many requests")]
    TooManyRequests,

    #[error("request timed out")]
    Timeout,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

pub(crate) type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

const INTERNAL: &str = "internal error";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::Domain(err) => match &err {
                DomainError::Validation { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                DomainError::AlreadyExists(_) => (StatusCode::CONFLICT, err.to_string()),
                DomainError::InvalidCredentials
                | DomainError::InvalidToken
                | DomainError::ExpiredToken => (StatusCode::UNAUTHORIZED, err.to_string()),
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                DomainError::Unexpected(cause) => {
                    error!(cause = %cause, "unexpected domain error");
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
                }
            },
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Json(rejection) => {
                warn!(error = %rejection, "rejected request body");
                (
                    StatusCode::BAD_REQUEST,
                    format!("invalid request body: {}", rejection.body_text()),
                )
            }
            AppError::Path(rejection) => (
                StatusCode::BAD_REQUEST,
                format!("invalid path parameter: {}", rejection.body_text()),
            ),
            AppError::Query(rejection) => (
                StatusCode::BAD_REQUEST,
                format!("invalid query string: {}", rejection.body_text()),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "too many requests".to_string(),
            ),
            AppError::Timeout => (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string()),
            AppError::Internal(err) => {
                error!(error = ?err, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
            }
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::AppError;
    use crate::domain::error::DomainError;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        let cases = [
            (
                DomainError::Validation {
                    field: "name",
                    message: "must not be empty",
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::AlreadyExists("email".to_string()),
                StatusCode::CONFLICT,
            ),
            (DomainError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (DomainError::InvalidToken, StatusCode::UNAUTHORIZED),
            (DomainError::ExpiredToken, StatusCode::UNAUTHORIZED),
            (
                DomainError::NotFound("post id: 1".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::Unexpected("db down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(status_of(AppError::Domain(err)), expected);
        }
    }

    #[test]
    fn transport_errors_map_to_expected_statuses() {
        assert_eq!(status_of(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AppError::TooManyRequests),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status_of(AppError::Timeout), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            status_of(AppError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
