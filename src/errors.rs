//! HTTP-facing error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::jwt::IssuanceError;
use crate::auth::models::IdentityError;
use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request rejected: {0:?}")]
    BadRequest(Vec<IdentityError>),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Issuance(#[from] IssuanceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Issuance(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::BadRequest(errors) => (status, Json(errors)).into_response(),
            ApiError::Unauthorized(message) => (status, Json(message)).into_response(),
            other => {
                let cause = root_cause_message(&other);
                tracing::error!(error = %other, cause = %cause, "Request failed");
                let message = if cfg!(debug_assertions) {
                    cause
                } else {
                    "Internal server error".to_string()
                };
                (status, Json(message)).into_response()
            }
        }
    }
}

/// Message of the innermost error in the source chain.
fn root_cause_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut current = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
