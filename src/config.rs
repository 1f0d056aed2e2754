use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

use crate::routes::summarise_route::DEFAULT_MAX_MESSAGE_CHARS;
use crate::utils::completion::{OpenAiSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub completion: OpenAiSettings,
    pub max_message_chars: usize,
    pub max_upload_bytes: usize,
}

pub fn command() -> Command {
    Command::new("pdf-summariser")
        .version(env!("CARGO_PKG_VERSION"))
        .about("HTTP service that extracts text from PDFs and summarises text")
        .long_about(
            "This server exposes the following endpoints:\n\
            - POST /extract-pdf: extract the text of an uploaded PDF\n\
            - POST /summarise: summarise a user message with a hosted chat-completion model\n\
            - GET /health: liveness probe",
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Socket address to listen on [env: BIND_ADDR] (default: 127.0.0.1:3000)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("openai-api-key")
                .long("openai-api-key")
                .value_name("KEY")
                .help("API key for the completion provider [env: OPENAI_API_KEY]")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("openai-base-url")
                .long("openai-base-url")
                .value_name("URL")
                .help("Base URL of the OpenAI-compatible API [env: OPENAI_BASE_URL]")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("MODEL")
                .help("Chat-completion model [env: OPENAI_MODEL]")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("upstream-timeout-secs")
                .long("upstream-timeout-secs")
                .value_name("SECS")
                .help("Timeout for completion calls; unset waits indefinitely [env: UPSTREAM_TIMEOUT_SECS]")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("max-message-chars")
                .long("max-message-chars")
                .value_name("N")
                .help("Longest accepted summarise message, 0 disables [env: MAX_MESSAGE_CHARS] (default: 5000)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("max-upload-bytes")
                .long("max-upload-bytes")
                .value_name("BYTES")
                .help("Largest accepted PDF upload [env: MAX_UPLOAD_BYTES] (default: 20 MiB)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log errors")
                .action(clap::ArgAction::SetTrue),
        )
}

impl ServerConfig {
    /// Resolves every setting from the command line first, then `env`.
    pub fn from_sources<F>(matches: &ArgMatches, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |id: &str, var: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .or_else(|| env(var))
                .filter(|value| !value.trim().is_empty())
        };

        let bind_addr = lookup("bind", "BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("invalid bind address")?;

        let base_url = lookup("openai-base-url", "OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)
            .with_context(|| format!("invalid completion base URL: {}", base_url))?;

        let timeout = lookup("upstream-timeout-secs", "UPSTREAM_TIMEOUT_SECS")
            .map(|secs| secs.parse::<u64>())
            .transpose()
            .context("invalid upstream timeout")?
            .map(Duration::from_secs);

        let max_message_chars = lookup("max-message-chars", "MAX_MESSAGE_CHARS")
            .map(|n| n.parse::<usize>())
            .transpose()
            .context("invalid message length limit")?
            .unwrap_or(DEFAULT_MAX_MESSAGE_CHARS);

        let max_upload_bytes = lookup("max-upload-bytes", "MAX_UPLOAD_BYTES")
            .map(|n| n.parse::<usize>())
            .transpose()
            .context("invalid upload size limit")?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            bind_addr,
            completion: OpenAiSettings {
                api_key: lookup("openai-api-key", "OPENAI_API_KEY"),
                base_url,
                model: lookup("model", "OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout,
            },
            max_message_chars,
            max_upload_bytes,
        })
    }
}
