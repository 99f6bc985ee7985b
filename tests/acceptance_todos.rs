use anyhow::anyhow;
use async_trait::async_trait;
use axum::Router;
use axum::body::to_bytes;
use serde_json::{json, Value};
use todo_api::application::todo_service::TodoServiceImpl;
use todo_api::domain::{
    id::TodoId,
    store::TodoStore,
    todo::{NewTodo, Todo, TodoFilter, TodoPatch},
};
use todo_api::http::routing::{self, todos};
use todo_api::infrastructure::sqlite_store::SqliteTodoStore;

const FIRST_ID: &str = "58d316af3b28d2801f60a6ba";
const ABSENT_ID: &str = "48d316af3b28d2801f60a6ba";

async fn seeded() -> (Router, SqliteTodoStore) {
    let store = SqliteTodoStore::open("sqlite::memory:").await.unwrap();
    store.delete_all().await.unwrap();
    store
        .insert_many(vec![
            NewTodo::new("First test todo").with_id(TodoId::parse(FIRST_ID).unwrap()),
            NewTodo::new("second test todo"),
        ])
        .await
        .unwrap();
    let service = TodoServiceImpl::new(store.clone());
    (routing::app(todos::router(todos::AppState { service })), store)
}

#[tokio::test]
async fn create_todo_returns_document() {
    let (app, store) = seeded().await;
    let text = "Test todo text";

    let (status, body) = request(&app, "POST", "/todos", Some(json!({ "text": text }))).await;
    assert_eq!(status, 200);
    assert_eq!(body["text"], text);
    assert_eq!(body["completed"], false);
    assert_eq!(body["completedAt"], Value::Null);
    assert!(TodoId::is_valid(body["_id"].as_str().unwrap()));

    let found = store.find(TodoFilter::by_text(text)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, text);
}

#[tokio::test]
async fn create_todo_stores_trimmed_text() {
    let (app, store) = seeded().await;
    let (status, body) = request(&app, "POST", "/todos", Some(json!({ "text": "  padded  " }))).await;
    assert_eq!(status, 200);
    assert_eq!(body["text"], "padded");
    assert_eq!(store.find(TodoFilter::by_text("padded")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn create_todo_rejects_invalid_body() {
    let (app, store) = seeded().await;

    let (status, body) = request(&app, "POST", "/todos", Some(json!({}))).await;
    assert_eq!(status, 400);
    assert_eq!(body["name"], "ValidationError");
    assert_eq!(body["errors"]["text"]["kind"], "required");

    let (status, _) = request(&app, "POST", "/todos", Some(json!({ "text": "   " }))).await;
    assert_eq!(status, 400);

    assert_eq!(store.find(TodoFilter::all()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn create_todo_rejects_non_json_body() {
    let (app, store) = seeded().await;
    let (status, body) = request(&app, "POST", "/todos", None).await;
    assert_eq!(status, 400);
    assert_eq!(body["name"], "InvalidBody");
    assert_eq!(store.find(TodoFilter::all()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn list_returns_every_todo() {
    let (app, _) = seeded().await;
    let (status, body) = request(&app, "GET", "/todos", None).await;
    assert_eq!(status, 200);
    let todos = body["todos"].as_array().unwrap();
    assert_eq!(todos.len(), 2);
    assert_eq!(todos[0]["text"], "First test todo");
    assert_eq!(todos[1]["text"], "second test todo");
}

#[tokio::test]
async fn get_todo_by_id() {
    let (app, _) = seeded().await;
    let (status, body) = request(&app, "GET", &format!("/todos/{FIRST_ID}"), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["todo"]["text"], "First test todo");
    assert_eq!(body["todo"]["_id"], FIRST_ID);
}

#[tokio::test]
async fn get_todo_invalid_id_is_404_with_empty_body() {
    let (app, _) = seeded().await;
    let (status, body) = request(&app, "GET", "/todos/1g2g1h", None).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn get_todo_absent_id_is_404_with_empty_body() {
    let (app, _) = seeded().await;
    let (status, body) = request(&app, "GET", &format!("/todos/{ABSENT_ID}"), None).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn undecodable_id_is_404_with_empty_body() {
    let (app, store) = seeded().await;
    for method in ["GET", "DELETE"] {
        let (status, body) = request(&app, method, "/todos/%FF", None).await;
        assert_eq!(status, 404, "{method}");
        assert_eq!(body, json!({}), "{method}");
    }
    let (status, body) = request(&app, "PATCH", "/todos/%FF", Some(json!({ "completed": true }))).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({}));
    assert_eq!(store.find(TodoFilter::all()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_todo_removes_it() {
    let (app, store) = seeded().await;
    let (status, body) = request(&app, "DELETE", &format!("/todos/{FIRST_ID}"), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["todo"]["_id"], FIRST_ID);

    let id = TodoId::parse(FIRST_ID).unwrap();
    assert!(store.find_by_id(id).await.unwrap().is_none());

    let (status, _) = request(&app, "GET", &format!("/todos/{FIRST_ID}"), None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn delete_todo_absent_id_is_404() {
    let (app, store) = seeded().await;
    let (status, body) = request(&app, "DELETE", &format!("/todos/{ABSENT_ID}"), None).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({}));
    assert_eq!(store.find(TodoFilter::all()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_todo_invalid_id_is_404() {
    let (app, _) = seeded().await;
    let (status, body) = request(&app, "DELETE", "/todos/rrr444", None).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn patch_todo_completes_and_reopens() {
    let (app, _) = seeded().await;
    let path = format!("/todos/{FIRST_ID}");

    let (status, body) = request(&app, "PATCH", &path, Some(json!({ "completed": true, "text": "done it" }))).await;
    assert_eq!(status, 200);
    assert_eq!(body["todo"]["text"], "done it");
    assert_eq!(body["todo"]["completed"], true);
    assert!(body["todo"]["completedAt"].is_i64());

    let (status, body) = request(&app, "PATCH", &path, Some(json!({ "completed": false }))).await;
    assert_eq!(status, 200);
    assert_eq!(body["todo"]["completed"], false);
    assert_eq!(body["todo"]["completedAt"], Value::Null);
    assert_eq!(body["todo"]["text"], "done it");
}

#[tokio::test]
async fn patch_todo_validates_and_checks_id() {
    let (app, _) = seeded().await;

    let (status, body) = request(&app, "PATCH", &format!("/todos/{FIRST_ID}"), Some(json!({ "text": "" }))).await;
    assert_eq!(status, 400);
    assert_eq!(body["errors"]["text"]["kind"], "minlength");

    let (status, _) = request(&app, "PATCH", "/todos/rrr444", Some(json!({ "completed": true }))).await;
    assert_eq!(status, 404);
    let (status, _) = request(&app, "PATCH", &format!("/todos/{ABSENT_ID}"), Some(json!({ "completed": true }))).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = seeded().await;
    let res = raw_request(&app, "GET", "/health", None).await;
    assert_eq!(res.status(), 200);
    let bytes = to_bytes(res.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn unknown_route_is_404_with_empty_body() {
    let (app, _) = seeded().await;
    let (status, body) = request(&app, "GET", "/nope", None).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({}));
}

#[derive(Clone)]
struct UnreachableStore;

#[async_trait]
impl TodoStore for UnreachableStore {
    async fn init(&self) -> anyhow::Result<()> { Err(anyhow!("connection refused")) }
    async fn insert(&self, _: NewTodo) -> anyhow::Result<Todo> { Err(anyhow!("connection refused")) }
    async fn insert_many(&self, _: Vec<NewTodo>) -> anyhow::Result<Vec<Todo>> { Err(anyhow!("connection refused")) }
    async fn find(&self, _: TodoFilter) -> anyhow::Result<Vec<Todo>> { Err(anyhow!("connection refused")) }
    async fn find_by_id(&self, _: TodoId) -> anyhow::Result<Option<Todo>> { Err(anyhow!("connection refused")) }
    async fn find_one_and_update(&self, _: TodoId, _: TodoPatch) -> anyhow::Result<Option<Todo>> { Err(anyhow!("connection refused")) }
    async fn delete_by_id(&self, _: TodoId) -> anyhow::Result<Option<Todo>> { Err(anyhow!("connection refused")) }
    async fn delete_all(&self) -> anyhow::Result<u64> { Err(anyhow!("connection refused")) }
}

#[tokio::test]
async fn store_failures_surface_as_400() {
    let service = TodoServiceImpl::new(UnreachableStore);
    let app = routing::app(todos::router(todos::AppState { service }));

    let (status, body) = request(&app, "POST", "/todos", Some(json!({ "text": "x" }))).await;
    assert_eq!(status, 400);
    assert_eq!(body["name"], "StoreError");
    assert_eq!(body["message"], "connection refused");

    let (status, _) = request(&app, "GET", "/todos", None).await;
    assert_eq!(status, 400);
    let (status, _) = request(&app, "GET", &format!("/todos/{FIRST_ID}"), None).await;
    assert_eq!(status, 400);
    let (status, _) = request(&app, "DELETE", &format!("/todos/{FIRST_ID}"), None).await;
    assert_eq!(status, 400);

    // id shape is checked before the store is touched
    let (status, body) = request(&app, "GET", "/todos/1g2g1h", None).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({}));

    // validation runs before the store is touched
    let (status, body) = request(&app, "POST", "/todos", Some(json!({}))).await;
    assert_eq!(status, 400);
    assert_eq!(body["name"], "ValidationError");
}

async fn request(app: &Router, method: &str, path: &str, body: Option<Value>) -> (u16, Value) {
    let res = raw_request(app, method, path, body).await;
    let status = res.status().as_u16();
    let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

async fn raw_request(app: &Router, method: &str, path: &str, body: Option<Value>) -> hyper::Response<axum::body::Body> {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    let req = Request::builder().method(Method::from_bytes(method.as_bytes()).unwrap()).uri(path);
    let req = match body {
        Some(json) => req.header("content-type", "application/json").body(Body::from(json.to_string())).unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
}
