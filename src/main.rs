use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloudbox::storage::{FsObjectStore, ObjectStore};
use cloudbox::{AppState, Catalog, Config, NoteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudbox=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Cloudbox server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    // Open the metadata catalog
    let catalog = Arc::new(Catalog::open(config.catalog_path.clone())?);

    // Bootstrap the object store bucket
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(config.bucket_dir.clone()));
    store.ensure_bucket().await?;

    let notes = Arc::new(NoteStore::new(config.notes_dir.clone()));

    // Configure CORS
    let origins: Vec<axum::http::HeaderValue> = config
        .allowed_origins
        .iter()
        .map(|s| s.parse())
        .collect::<Result<_, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    // Create app state and build router
    let state = AppState::new(catalog, store, notes, config.clone());
    let app = cloudbox::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
