use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::scheduling::SchedulingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Scheduling(e) => scheduling_status(e),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let body = match &self {
            // Closed-slot rejections carry the alternatives so a caller can
            // offer them without a second round trip.
            AppError::Scheduling(SchedulingError::SlotNotOffered { open_slots }) => {
                serde_json::json!({ "error": self.to_string(), "open_slots": open_slots })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

fn scheduling_status(e: &SchedulingError) -> StatusCode {
    match e {
        SchedulingError::SlotConflict => StatusCode::CONFLICT,
        SchedulingError::NotFound => StatusCode::NOT_FOUND,
        SchedulingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}
