//! Mission Rush Back binary entrypoint wiring REST, SSE, the timeline drivers, and storage.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mission_rush_back::{
    config::AppConfig,
    dao::{
        match_store::{MatchStore, memory::InMemoryMatchStore},
        storage::StorageResult,
    },
    routes,
    services::{catalog_service, sse_events, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    tokio::spawn(sse_events::forward_system_status(app_state.clone()));
    install_store(&app_state)
        .await
        .context("installing storage backend")?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend from the environment.
///
/// `MONGO_URI` selects MongoDB and `COUCH_BASE_URL` selects CouchDB; both are
/// connected in the background by the storage supervisor. Without either, an
/// in-memory store is seeded and installed right away.
async fn install_store(state: &SharedState) -> anyhow::Result<()> {
    #[cfg(feature = "mongo-store")]
    {
        if env::var("MONGO_URI").is_ok() {
            spawn_mongo_supervisor(state);
            return Ok(());
        }
    }

    #[cfg(feature = "couch-store")]
    {
        if env::var("COUCH_BASE_URL").is_ok() {
            spawn_couch_supervisor(state);
            return Ok(());
        }
    }

    warn!("no storage backend configured; matches live in memory only");
    let store = InMemoryMatchStore::new();
    catalog_service::seed(&store, state.config())
        .await
        .context("seeding in-memory catalog")?;
    state.set_match_store(Arc::new(store)).await;
    Ok(())
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: &SharedState) {
    info!("using MongoDB storage");
    let seed_state = state.clone();
    let connect = move || connect_mongo(seed_state.clone());
    tokio::spawn(storage_supervisor::run(state.clone(), connect));
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(state: SharedState) -> StorageResult<Arc<dyn MatchStore>> {
    use mission_rush_back::dao::match_store::mongodb::{MongoConfig, MongoMatchStore};

    let config = MongoConfig::from_env().await?;
    let store = MongoMatchStore::connect(config).await?;
    catalog_service::seed(&store, state.config()).await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "couch-store")]
fn spawn_couch_supervisor(state: &SharedState) {
    info!("using CouchDB storage");
    let seed_state = state.clone();
    let connect = move || connect_couch(seed_state.clone());
    tokio::spawn(storage_supervisor::run(state.clone(), connect));
}

#[cfg(feature = "couch-store")]
async fn connect_couch(state: SharedState) -> StorageResult<Arc<dyn MatchStore>> {
    use mission_rush_back::dao::match_store::couchdb::{CouchConfig, CouchMatchStore};

    let config = CouchConfig::from_env()?;
    let store = CouchMatchStore::connect(config).await?;
    catalog_service::seed(&store, state.config()).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
