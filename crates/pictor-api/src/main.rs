mod error;
mod handlers;
mod routes;
mod setup;
mod state;
mod tenant;

use pictor_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let port = config.server_port;

    let (_state, router) = setup::initialize_app(config).await?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "Server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
