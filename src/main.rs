use std::sync::Arc;

use anyhow::Result;
use lesson_forge::clients::{GeminiClient, LessonModel};
use lesson_forge::config::{Config, RuntimeConfig};
use lesson_forge::http;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Subscriber first, so warnings raised while loading config are not lost
    lesson_forge::load_env();
    let runtime = RuntimeConfig::load_from_env();
    tracing_subscriber::fmt()
        .with_env_filter(runtime.log_level.as_str())
        .with_ansi(false)
        .init();

    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        "Starting lesson-forge {} (provider={}, region={})",
        env!("CARGO_PKG_VERSION"),
        config.provider.name,
        config.provider.location
    );

    let model: Arc<dyn LessonModel> = Arc::new(GeminiClient::from_config(&config)?);
    http::start_http_server(Arc::new(config), model).await?;

    Ok(())
}
