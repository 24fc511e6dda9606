//! Chat gateway - Main entry point.

use anyhow::Result;
use chat_gateway::config::Config;
use chat_gateway::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from the environment
    let config = Config::load_with_env();

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Chat gateway v{}", env!("CARGO_PKG_VERSION"));

    // Start the server
    chat_gateway::start_server(&config).await
}
