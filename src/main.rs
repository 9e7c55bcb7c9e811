use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use vigil_backend::config::{AppConfig, AppPaths};
use vigil_backend::logging;
use vigil_backend::server::router::router;
use vigil_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let config = AppConfig::load(&paths).context("Failed to load configuration")?;
    let state = AppState::initialize(config).context("Failed to initialize application state")?;

    let bind_addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
