mod backends;
mod config;
mod envelope;
mod errors;
mod identity;
mod models;
mod pipeline;
mod quota;
mod request;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backends::assets::AssetHostClient;
use crate::backends::completion::CompletionClient;
use crate::backends::image_gen::ImageGenClient;
use crate::backends::DispatchTable;
use crate::config::Config;
use crate::identity::HttpIdentityProvider;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgCreationStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quillworks API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and the creation store
    let store = Arc::new(PgCreationStore::connect(&config.database_url).await?);

    // Initialize the identity provider client
    let identity = Arc::new(HttpIdentityProvider::new(
        config.identity_api_url.clone(),
        config.identity_secret_key.clone(),
    ));
    info!("Identity provider client initialized");

    // Initialize the generation backends and dispatch table
    let completion = CompletionClient::new(
        config.completion_api_url.clone(),
        config.completion_api_key.clone(),
    );
    info!(
        "Completion client initialized (model: {})",
        backends::completion::MODEL
    );

    let image_gen = ImageGenClient::new(config.image_api_url.clone(), config.image_api_key.clone());
    let assets = AssetHostClient::new(
        config.asset_api_url.clone(),
        config.asset_cloud_name.clone(),
        config.asset_api_key.clone(),
        config.asset_api_secret.clone(),
    );
    let dispatch = Arc::new(DispatchTable::new(completion, image_gen, assets));
    info!("Backend dispatch table initialized");

    // Build app state
    let state = AppState {
        identity,
        store,
        dispatch,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
