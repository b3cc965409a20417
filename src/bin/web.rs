#![cfg(not(tarpaulin_include))]

use clap::Parser;
use sheetconv::app;
use sheetconv::config::ServerConfig;

/// Main entry point for the web application
///
/// Reads the server settings from flags / environment and serves the upload
/// page until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    log::info!(
        "Starting web server (preview rows: {}, upload limit: {})",
        config.preview_rows,
        config
            .max_upload_bytes
            .map_or_else(|| "none".to_string(), |n| format!("{n} bytes"))
    );

    app::run(config).await
}
