use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_tracker_backend::config::{Config, StorageBackend};
use todo_tracker_backend::domain::{LogScheduler, SessionService, TimeSlotRegistry, TodoService};
use todo_tracker_backend::io::{api_routes, AppState};
use todo_tracker_backend::storage::local::{JsonPreferenceStore, LocalAccountService, LocalFileStore};
use todo_tracker_backend::storage::memory::MemoryCollectionStore;
use todo_tracker_backend::storage::CollectionStore;
use todo_tracker_backend::sync::SyncReconciler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!("Data directory: {}", config.data_dir.display());

    let store: Arc<dyn CollectionStore> = match config.backend {
        StorageBackend::Local => Arc::new(LocalFileStore::new(config.data_dir.join("collections"))?),
        StorageBackend::Memory => {
            info!("Using in-memory collection store; data will not persist");
            Arc::new(MemoryCollectionStore::new())
        }
    };

    let accounts = Arc::new(LocalAccountService::open(config.data_dir.join("accounts.json"))?);
    let prefs = Arc::new(JsonPreferenceStore::open(config.data_dir.join("prefs.json"))?);

    let reconciler = Arc::new(SyncReconciler::new(store, config.debounce));
    let session = Arc::new(SessionService::new(accounts, prefs, reconciler.clone()));
    let todos = Arc::new(TodoService::new(reconciler, Arc::new(LogScheduler)));
    let registry = Arc::new(TimeSlotRegistry::new());

    if let Some(user) = session.restore_remembered().await {
        info!("Restored remembered session for {}", user.email);
    }

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", api_routes())
        .fallback_service(ServeDir::new(PathBuf::from("web/dist")))
        .layer(cors)
        .with_state(AppState::new(session, todos, registry));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
