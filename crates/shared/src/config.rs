use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::config_env::{optional_trimmed_env, parse_u32_env, parse_u64_env};

pub const DEFAULT_RELAY_PORT: u16 = 3001;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
const DEFAULT_RELAY_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub relay_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = resolve_bind_addr(
            optional_trimmed_env("RELAY_BIND_ADDR"),
            optional_trimmed_env("PORT"),
        )?;

        let max_output_tokens = parse_u32_env("ANTHROPIC_MAX_TOKENS", DEFAULT_MAX_OUTPUT_TOKENS)?;
        if max_output_tokens == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "ANTHROPIC_MAX_TOKENS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            max_output_tokens,
        })
    }
}

impl DispatcherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let relay_url = optional_trimmed_env("RELAY_URL")
            .unwrap_or_else(|| format!("http://localhost:{DEFAULT_RELAY_PORT}"));
        if !relay_url.starts_with("http://") && !relay_url.starts_with("https://") {
            return Err(ConfigError::InvalidConfiguration(
                "RELAY_URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            relay_url,
            timeout_ms: parse_u64_env("RELAY_TIMEOUT_MS", DEFAULT_RELAY_TIMEOUT_MS)?,
        })
    }
}

/// An explicit `RELAY_BIND_ADDR` wins. A bare `PORT` is how hosting
/// platforms assign the listener, so it binds every interface; with neither
/// set the relay stays on loopback.
fn resolve_bind_addr(
    bind_addr: Option<String>,
    port: Option<String>,
) -> Result<String, ConfigError> {
    if let Some(addr) = bind_addr {
        return Ok(addr);
    }

    match port {
        Some(raw) => {
            let port = raw
                .parse::<u16>()
                .map_err(|_| ConfigError::ParseInt("PORT".to_string()))?;
            Ok(format!("0.0.0.0:{port}"))
        }
        None => Ok(format!("127.0.0.1:{DEFAULT_RELAY_PORT}")),
    }
}

/// Loads `.env` from the working directory, then `server/.env`.
/// Variables already present in the process environment win.
pub fn load_env_files() {
    for path in [Path::new(".env"), Path::new("server/.env")] {
        match dotenvy::from_path(path) {
            Ok(()) => debug!(path = %path.display(), "loaded environment file"),
            Err(err) if err.not_found() => {}
            Err(err) => debug!(path = %path.display(), "skipping environment file: {err}"),
        }
    }
}
