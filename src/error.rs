// Application error type and its conversion into HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::session::SubmitError;

#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    NotFound(String),
    // The form is still waiting on a prediction.
    Conflict(String),
    // The draft could not be normalized; carries the offending field if known.
    UnprocessableEntity { field: Option<String>, message: String },
}

// Implement conversion from anyhow::Error for easier error propagation
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::InternalServerError(error)
    }
}

impl From<SubmitError> for AppError {
    fn from(error: SubmitError) -> Self {
        match error {
            SubmitError::Invalid(form_error) => AppError::UnprocessableEntity {
                field: form_error.field().map(|field| field.to_string()),
                message: form_error.to_string(),
            },
            SubmitError::Busy(busy) => AppError::Conflict(busy.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InternalServerError(e) => {
                // Log the detailed error here, don't expose internals to the client
                tracing::error!("Internal server error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::NotFound(message) => {
                tracing::debug!("Not found: {}", message);
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
            AppError::Conflict(message) => {
                tracing::info!("Conflict: {}", message);
                (StatusCode::CONFLICT, json!({ "error": message }))
            }
            AppError::UnprocessableEntity { field, message } => {
                tracing::info!("Rejected form submission: {}", message);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({ "error": message, "field": field }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
