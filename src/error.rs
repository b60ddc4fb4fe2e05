use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::services::credits::BucketViolation;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Credit constraints unmet")]
    ConstraintUnmet { violations: Vec<BucketViolation> },

    #[error("Insufficient seats")]
    InsufficientSeats { offering_ids: Vec<String> },

    #[error("Already enrolled in offering {offering_id}")]
    DuplicateEnrollment { offering_id: String },

    #[error("Conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, what, None),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotAuthorized(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::ConstraintUnmet { violations } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "credit constraints unmet".to_string(),
                serde_json::to_value(&violations).ok(),
            ),
            AppError::InsufficientSeats { offering_ids } => (
                StatusCode::CONFLICT,
                format!("no seats left in: {}", offering_ids.join(", ")),
                serde_json::to_value(&offering_ids).ok(),
            ),
            AppError::DuplicateEnrollment { offering_id } => (
                StatusCode::CONFLICT,
                format!("already enrolled in offering {offering_id}"),
                None,
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}
