use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::backends::BackendError;
use crate::envelope::Envelope;

/// Message returned when a free-plan caller has exhausted their quota.
pub const LIMIT_REACHED_MESSAGE: &str = "Limit has been reached. Upgrade to premium";
/// Message returned when a free-plan caller requests a premium-gated kind.
pub const PLAN_REQUIRED_MESSAGE: &str = "This feature is only available for premium users";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every variant renders as the uniform `{success, message}` envelope.
/// Business-logic refusals (quota, plan) are HTTP 200 — they are normal
/// "please upgrade" responses, not transport failures.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Free usage limit reached")]
    LimitReached,

    #[error("Premium plan required")]
    PlanRequired,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::LimitReached => (StatusCode::OK, LIMIT_REACHED_MESSAGE.to_string()),
            AppError::PlanRequired => (StatusCode::OK, PLAN_REQUIRED_MESSAGE.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Backend(e) => {
                tracing::error!("Backend error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "request failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        (status, Json(Envelope::failure(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_reached_is_a_normal_response() {
        assert_eq!(AppError::LimitReached.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn test_plan_required_is_a_normal_response() {
        assert_eq!(AppError::PlanRequired.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn test_unauthorized_is_401() {
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_validation_is_400() {
        let response = AppError::Validation("image file missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backend_failure_is_500() {
        let response = AppError::Backend(BackendError::Empty {
            provider: "completion",
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
