//! Coursewright - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the course-building API.

use coursewright::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursewright=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        researcher = %config.models.researcher,
        judge = %config.models.judge,
        content_builder = %config.models.content_builder,
        "Loaded configuration"
    );

    api::serve(config).await?;

    Ok(())
}
