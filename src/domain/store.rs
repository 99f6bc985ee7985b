use async_trait::async_trait;

use super::id::TodoId;
use super::todo::{NewTodo, Todo, TodoFilter, TodoPatch};

/// Collection-scoped access to the todo documents.
///
/// Implementations own their connection; callers construct one at startup
/// and `close` it on shutdown.
#[async_trait]
pub trait TodoStore: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    async fn insert(&self, doc: NewTodo) -> anyhow::Result<Todo>;
    async fn insert_many(&self, docs: Vec<NewTodo>) -> anyhow::Result<Vec<Todo>>;
    async fn find(&self, filter: TodoFilter) -> anyhow::Result<Vec<Todo>>;
    async fn find_by_id(&self, id: TodoId) -> anyhow::Result<Option<Todo>>;
    async fn find_one_and_update(&self, id: TodoId, patch: TodoPatch) -> anyhow::Result<Option<Todo>>;
    async fn delete_by_id(&self, id: TodoId) -> anyhow::Result<Option<Todo>>;
    async fn delete_all(&self) -> anyhow::Result<u64>;

    async fn close(&self) {}

    /// Shape check run before any round trip; never touches the store.
    fn parse_id(&self, raw: &str) -> Option<TodoId> {
        TodoId::parse(raw)
    }
}
