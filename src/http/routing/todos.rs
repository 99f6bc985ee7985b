use axum::extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::Value;

use crate::application::todo_service::TodoService;
use crate::domain::todo::Todo;
use crate::http::types::{ApiError, TodoBody, TodoList};

#[derive(Clone)]
pub struct AppState<S: TodoService> { pub service: S }

pub fn router<S: TodoService + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/todos", post(create_todo::<S>).get(list_todos::<S>))
        .route("/todos/:id", get(get_todo::<S>).patch(update_todo::<S>).delete(delete_todo::<S>))
        .with_state(state)
}

async fn create_todo<S: TodoService>(
    State(state): State<AppState<S>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Json(body) = payload?;
    let todo = state.service.create(&body).await?;
    tracing::info!(id = %todo.id, "created todo");
    Ok(Json(todo))
}

async fn list_todos<S: TodoService>(State(state): State<AppState<S>>) -> Result<Json<TodoList>, ApiError> {
    let todos = state.service.list().await?;
    tracing::debug!(count = todos.len(), "listed todos");
    Ok(Json(TodoList { todos }))
}

async fn get_todo<S: TodoService>(
    State(state): State<AppState<S>>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<TodoBody>, ApiError> {
    let Path(id) = id?;
    let todo = state.service.get(&id).await?;
    Ok(Json(TodoBody { todo }))
}

async fn update_todo<S: TodoService>(
    State(state): State<AppState<S>>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TodoBody>, ApiError> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let todo = state.service.update(&id, &body).await?;
    tracing::info!(id = %todo.id, completed = todo.completed, "updated todo");
    Ok(Json(TodoBody { todo }))
}

async fn delete_todo<S: TodoService>(
    State(state): State<AppState<S>>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<TodoBody>, ApiError> {
    let Path(id) = id?;
    let todo = state.service.delete(&id).await?;
    tracing::info!(id = %todo.id, "deleted todo");
    Ok(Json(TodoBody { todo }))
}
