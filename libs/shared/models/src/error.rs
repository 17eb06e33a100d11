use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Machine-readable reason attached to 409 responses: the requested window
/// overlaps an existing appointment.
pub const CONFLICTO_CITA: &str = "cita_solapada";

/// Machine-readable reason attached to 409 responses: the employee has an
/// approved absence covering the requested window.
pub const CONFLICTO_AUSENCIA: &str = "empleado_ausente";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict ({codigo}): {message}")]
    Conflict { codigo: &'static str, message: String },

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict { message, .. } => (StatusCode::CONFLICT, message),
            AppError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = match &self {
            AppError::Conflict { codigo, message } => Json(json!({
                "success": false,
                "error": message,
                "codigo": codigo,
            })),
            _ => Json(json!({
                "success": false,
                "error": message,
            })),
        };

        (status, body).into_response()
    }
}
