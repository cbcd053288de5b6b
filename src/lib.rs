pub mod api;
pub mod config;
pub mod conversation;
pub mod core_state;
pub mod directory;
pub mod generation;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Fatal startup or serve failure.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Startup(#[from] core_state::StartupError),
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Initialise logging, build the core from the environment, and serve the
/// HTTP API until the process is stopped.
pub async fn run() -> Result<(), RunError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Postcare starting v{}", config::APP_VERSION);

    let settings = config::Settings::from_env();
    let addr = format!("{}:{}", settings.host, settings.port);
    let core = Arc::new(core_state::CoreState::initialize(settings)?);
    let app = api::build_router(core);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "HTTP API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
