use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sqlx::{
    Pool, QueryBuilder, Row, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};

use crate::domain::{
    id::TodoId,
    store::TodoStore,
    todo::{NewTodo, Todo, TodoFilter, TodoPatch},
};

const COLUMNS: &str = "_id, text, completed, completed_at";

/// Todo collection stored one document per row.
#[derive(Clone)]
pub struct SqliteTodoStore {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteTodoStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to an in-memory database is a fresh database.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool.connect_with(options).await?;
        tracing::info!(url = %database_url, "connected to todo store");
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Connects and makes sure the collection exists.
    pub async fn open(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.init().await?;
        Ok(store)
    }
}

#[async_trait]
impl TodoStore for SqliteTodoStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS todos (
                _id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                completed_at INTEGER
            )",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn insert(&self, doc: NewTodo) -> Result<Todo> {
        let todo = assign_id(doc);
        sqlx::query("INSERT INTO todos (_id, text, completed, completed_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(todo.id.to_string())
            .bind(&todo.text)
            .bind(todo.completed)
            .bind(todo.completed_at)
            .execute(&*self.pool)
            .await?;
        tracing::debug!(id = %todo.id, "inserted todo");
        Ok(todo)
    }

    async fn insert_many(&self, docs: Vec<NewTodo>) -> Result<Vec<Todo>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(docs.len());
        for doc in docs {
            let todo = assign_id(doc);
            sqlx::query("INSERT INTO todos (_id, text, completed, completed_at) VALUES (?1, ?2, ?3, ?4)")
                .bind(todo.id.to_string())
                .bind(&todo.text)
                .bind(todo.completed)
                .bind(todo.completed_at)
                .execute(&mut *tx)
                .await?;
            inserted.push(todo);
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn find(&self, filter: TodoFilter) -> Result<Vec<Todo>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM todos"));
        let mut sep = " WHERE ";
        if let Some(text) = filter.text {
            query.push(sep).push("text = ").push_bind(text);
            sep = " AND ";
        }
        if let Some(completed) = filter.completed {
            query.push(sep).push("completed = ").push_bind(completed);
        }
        query.push(" ORDER BY rowid");
        let rows = query.build().fetch_all(&*self.pool).await?;
        rows.into_iter().map(row_to_todo).collect()
    }

    async fn find_by_id(&self, id: TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM todos WHERE _id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&*self.pool)
            .await?;
        row.map(row_to_todo).transpose()
    }

    async fn find_one_and_update(&self, id: TodoId, patch: TodoPatch) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!(
            "UPDATE todos SET
                text = COALESCE(?1, text),
                completed = COALESCE(?2, completed),
                completed_at = CASE WHEN ?3 THEN ?4 ELSE completed_at END
             WHERE _id = ?5
             RETURNING {COLUMNS}"
        ))
        .bind(patch.text)
        .bind(patch.completed)
        .bind(patch.completed_at.is_some())
        .bind(patch.completed_at.flatten())
        .bind(id.to_string())
        .fetch_optional(&*self.pool)
        .await?;
        row.map(row_to_todo).transpose()
    }

    async fn delete_by_id(&self, id: TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!("DELETE FROM todos WHERE _id = ?1 RETURNING {COLUMNS}"))
            .bind(id.to_string())
            .fetch_optional(&*self.pool)
            .await?;
        row.map(row_to_todo).transpose()
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM todos").execute(&*self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("todo store closed");
    }
}

fn assign_id(doc: NewTodo) -> Todo {
    Todo {
        id: doc.id.unwrap_or_else(TodoId::generate),
        text: doc.text,
        completed: doc.completed,
        completed_at: doc.completed_at,
    }
}

fn row_to_todo(row: SqliteRow) -> Result<Todo> {
    let id_str: String = row.try_get("_id")?;
    let id = TodoId::parse(&id_str).ok_or_else(|| anyhow!("stored todo has malformed id {id_str:?}"))?;
    Ok(Todo {
        id,
        text: row.try_get("text")?,
        completed: row.try_get("completed")?,
        completed_at: row.try_get("completed_at")?,
    })
}
