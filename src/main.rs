use std::env;
use std::process;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod http;
mod routes;
mod utils;

use config::ServerConfig;
use http::server::HttpServer;
use utils::completion::OpenAiClient;

#[tokio::main]
async fn main() {
    // A missing .env file is normal outside development.
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let matches = config::command().get_matches();

    // Logs go to stderr; RUST_LOG overrides the default level.
    let default_level = if matches.get_flag("quiet") {
        "error"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    if dotenv_loaded {
        info!("Loaded environment from .env");
    }

    let config = match ServerConfig::from_sources(&matches, |var| env::var(var).ok()) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            process::exit(1);
        }
    };

    // Log configuration status without exposing secrets
    match &config.completion.api_key {
        Some(_) => info!("Completion provider API key configured"),
        None => warn!(
            "OPENAI_API_KEY not set - /summarise will answer with a configuration error"
        ),
    }
    match config.completion.timeout {
        Some(timeout) => info!("Upstream timeout: {:?}", timeout),
        None => warn!("No upstream timeout configured - completion calls may wait indefinitely"),
    }

    let client = match OpenAiClient::new(config.completion.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create completion client: {}", e);
            process::exit(1);
        }
    };
    info!(
        "Using model {} at {}",
        client.model(),
        config.completion.base_url
    );

    info!("Starting HTTP server...");

    let server = HttpServer::new(config, Arc::new(client));
    if let Err(e) = server.start().await {
        error!("Failed to start server: {:#}", e);
        process::exit(1);
    }
}
