//! Configuration for the boardwalk server.
//!
//! TOML file + environment merge (figment) and the env-first upstream
//! credential chain. Settings are loaded once at startup and passed down
//! by value; nothing rereads ambient state after that.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boardwalk_api::TransportConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings structs ────────────────────────────────────────────────

/// Top-level settings, merged from defaults, file, and environment.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Local HTTP listener.
    #[serde(default)]
    pub server: ServerSettings,

    /// ThingsBoard connection.
    #[serde(default)]
    pub upstream: UpstreamSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpstreamSettings {
    /// ThingsBoard origin (e.g., "https://tb.example.com"). Absence is
    /// not a startup error; upstream calls fail until one is set.
    pub base_url: Option<String>,

    /// Service JWT sent as a bearer header on every upstream call.
    /// Prefer the UPSTREAM_API_TOKEN env var over plaintext here.
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept any certificate (for self-signed ThingsBoard installs).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            timeout: default_timeout(),
            accept_invalid_certs: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$BOARDWALK_CONFIG` if set, else
/// `boardwalk.toml` in the working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os("BOARDWALK_CONFIG")
        .map_or_else(|| PathBuf::from("boardwalk.toml"), PathBuf::from)
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, file, and environment.
///
/// Merge order, later wins: built-in defaults, then the TOML file (a
/// missing file is fine), then `BOARDWALK_`-prefixed env vars with `__`
/// as the section separator (`BOARDWALK_SERVER__PORT`,
/// `BOARDWALK_UPSTREAM__BASE_URL`, ...).
pub fn load_config() -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("BOARDWALK_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Check the constraints the merge itself cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "upstream.timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(())
    }

    // ── Upstream resolution (env-first) ─────────────────────────────

    /// Upstream origin: `$UPSTREAM_BASE_URL` wins over the config file.
    /// Empty values count as unset.
    pub fn resolve_base_url(&self) -> Option<String> {
        std::env::var("UPSTREAM_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.upstream.base_url.clone().filter(|v| !v.is_empty()))
    }

    /// Upstream service token: `$UPSTREAM_API_TOKEN` wins over the
    /// config file. Empty values count as unset.
    pub fn resolve_api_token(&self) -> Option<SecretString> {
        std::env::var("UPSTREAM_API_TOKEN")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.upstream.api_token.clone().filter(|v| !v.is_empty()))
            .map(SecretString::from)
    }

    /// Translate the upstream section into HTTP client options.
    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.upstream.timeout),
            accept_invalid_certs: self.upstream.accept_invalid_certs,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
