use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::dto::ApiMessage;
use crate::store::StoreError;

/// Error surface of the auth flows. Display strings are the exact caller-facing
/// messages; anything with internal detail is logged server-side only.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    // Covers both unknown email and wrong password so callers cannot
    // enumerate registered accounts.
    #[error("Invalid credentials")]
    Credentials,
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid or expired OTP")]
    InvalidOtp,
    #[error("Failed to send email")]
    MailDispatch(#[source] anyhow::Error),
    #[error("Service unavailable")]
    Dependency(#[from] StoreError),
    #[error("An error occurred")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(msg) => {
                warn!(reason = %msg, "request rejected");
                StatusCode::BAD_REQUEST
            }
            ApiError::Conflict(_) | ApiError::InvalidOtp => StatusCode::BAD_REQUEST,
            ApiError::Credentials => StatusCode::UNAUTHORIZED,
            ApiError::MailDispatch(e) => {
                error!(error = %e, "mail dispatch failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Dependency(e) => {
                error!(error = %e, "row store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Internal(e) => {
                error!(error = %e, "unexpected failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ApiMessage::err(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let resp = ApiError::Validation("All fields are required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn credentials_maps_to_401() {
        let resp = ApiError::Credentials.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn conflict_maps_to_400() {
        let resp = ApiError::Conflict("Email already registered".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn dependency_hides_detail_behind_500() {
        let err = ApiError::Dependency(StoreError::Rejected {
            status: 503,
            detail: "connection refused to db-internal:5432".into(),
        });
        let message = err.to_string();
        assert_eq!(message, "Service unavailable");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
