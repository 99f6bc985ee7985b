use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::todo_service::TodoError;
use crate::domain::todo::{Todo, ValidationError};

/// Envelope for single-document responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct TodoBody { pub todo: Todo }

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoList { pub todos: Vec<Todo> }

#[derive(Debug)]
pub enum ApiError {
    Todo(TodoError),
    InvalidBody(String),
}

impl From<TodoError> for ApiError {
    fn from(e: TodoError) -> Self { Self::Todo(e) }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self { Self::InvalidBody(e.body_text()) }
}

// An id segment the router cannot even decode is just another malformed id.
impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        tracing::debug!(error = %e, "undecodable todo id");
        Self::Todo(TodoError::NotFound)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Todo(TodoError::Validation(err)) => validation_failed(err),
            // Malformed and unknown ids look the same from outside.
            ApiError::Todo(TodoError::NotFound) => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
            ApiError::Todo(TodoError::Store(err)) => {
                tracing::warn!(error = %err, "todo store failure");
                let body = json!({ "name": "StoreError", "message": format!("{err:#}") });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::InvalidBody(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "name": "InvalidBody", "message": message }))).into_response()
            }
        }
    }
}

fn validation_failed(err: ValidationError) -> Response {
    tracing::debug!(error = %err, "rejected todo body");
    let body = json!({
        "name": "ValidationError",
        "message": ValidationError::MESSAGE,
        "errors": err.errors,
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
