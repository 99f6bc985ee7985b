use async_trait::async_trait;
use serde_json::Value;

use crate::domain::store::TodoStore;
use crate::domain::todo::{NewTodo, Todo, TodoFilter, TodoPatch, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Covers malformed ids as well as ids that match nothing.
    #[error("todo not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TodoError>;

/// Request-level operations. Ids arrive as raw path segments and bodies as
/// untyped JSON; nothing reaches the store before it has been validated.
#[async_trait]
pub trait TodoService: Send + Sync + 'static {
    async fn create(&self, body: &Value) -> Result<Todo>;
    async fn list(&self) -> Result<Vec<Todo>>;
    async fn get(&self, id: &str) -> Result<Todo>;
    async fn update(&self, id: &str, body: &Value) -> Result<Todo>;
    async fn delete(&self, id: &str) -> Result<Todo>;
}

#[derive(Clone)]
pub struct TodoServiceImpl<S: TodoStore> {
    store: S,
}

impl<S: TodoStore> TodoServiceImpl<S> {
    pub fn new(store: S) -> Self { Self { store } }
}

#[async_trait]
impl<S: TodoStore> TodoService for TodoServiceImpl<S> {
    async fn create(&self, body: &Value) -> Result<Todo> {
        let doc = NewTodo::from_json(body)?;
        Ok(self.store.insert(doc).await?)
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        Ok(self.store.find(TodoFilter::all()).await?)
    }

    async fn get(&self, id: &str) -> Result<Todo> {
        let id = self.store.parse_id(id).ok_or(TodoError::NotFound)?;
        self.store.find_by_id(id).await?.ok_or(TodoError::NotFound)
    }

    async fn update(&self, id: &str, body: &Value) -> Result<Todo> {
        let id = self.store.parse_id(id).ok_or(TodoError::NotFound)?;
        let patch = TodoPatch::from_json(body)?;
        self.store.find_one_and_update(id, patch).await?.ok_or(TodoError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<Todo> {
        let id = self.store.parse_id(id).ok_or(TodoError::NotFound)?;
        self.store.delete_by_id(id).await?.ok_or(TodoError::NotFound)
    }
}
