mod config;
mod db;
mod documents;
mod errors;
mod import;
mod llm_client;
mod models;
mod profile;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::import::registry::SessionRegistry;
use crate::llm_client::LlmClient;
use crate::profile::{MemoryProfileStore, PgProfileStore, ProfileStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting profile import API v{}", env!("CARGO_PKG_VERSION"));

    // Profile store: PostgreSQL when configured, otherwise process memory
    let profiles: Arc<dyn ProfileStore> = match &config.database_url {
        Some(url) => Arc::new(PgProfileStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set, confirmed imports are kept in memory only");
            Arc::new(MemoryProfileStore::new())
        }
    };

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let sessions = Arc::new(SessionRegistry::new(config.session_ttl));
    info!(
        "Import sessions expire after {}s idle",
        config.session_ttl.as_secs()
    );

    let state = AppState {
        llm: Arc::new(llm),
        profiles,
        sessions,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
