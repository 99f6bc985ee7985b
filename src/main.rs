use todo_api::application::todo_service::TodoServiceImpl;
use todo_api::config::Config;
use todo_api::domain::store::TodoStore;
use todo_api::http::routing::{self, todos};
use todo_api::infrastructure::sqlite_store::SqliteTodoStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let store = SqliteTodoStore::open(&config.database_url).await?;
    let service = TodoServiceImpl::new(store.clone());
    let todos_router = todos::router(todos::AppState { service });
    let router = routing::app(todos_router);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    store.close().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
