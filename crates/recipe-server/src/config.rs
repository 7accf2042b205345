use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use recipe_ai_harness::RelayOptions;
use recipe_ai_harness::vendors::openai_compat::DEFAULT_BASE_URL;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_PROVIDER_NAME: &str = "groq";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:8081";
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Load `.env` files into the process environment.
///
/// The crate-local file is read first, then one in the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Origins allowed to call the relay from a browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsOrigins {
    /// `*`: any origin, credentials not allowed.
    Any,
    /// Explicit list, credentials allowed.
    List(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Label the completion provider is registered under (used in logs).
    pub provider_name: String,
    pub provider_api_key: String,
    pub provider_base_url: String,
    pub model: String,
    pub cors_origins: CorsOrigins,
    /// `None` waits on the provider forever.
    pub idle_timeout: Option<Duration>,
    pub forward_empty_fragments: bool,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the raw value
    /// of a variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_api_key = get("RECIPE_PROVIDER_API_KEY")
            .or_else(|| get("GROQ_API_KEY"))
            .ok_or(ConfigError::Missing("RECIPE_PROVIDER_API_KEY"))?;

        let idle_secs: u64 = parse_or(&get, "RECIPE_PROVIDER_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?;
        let forward_empty_fragments = match get("RECIPE_FORWARD_EMPTY_FRAGMENTS") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "RECIPE_FORWARD_EMPTY_FRAGMENTS",
                value: raw,
            })?,
            None => true,
        };

        Ok(Self {
            bind_addr: parse_or(&get, "RECIPE_BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            provider_name: get("RECIPE_PROVIDER_NAME")
                .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
            provider_api_key,
            provider_base_url: get("RECIPE_PROVIDER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("RECIPE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            cors_origins: parse_cors_origins(
                &get("RECIPE_CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            )?,
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            forward_empty_fragments,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            idle_timeout: self.idle_timeout,
            forward_empty_fragments: self.forward_empty_fragments,
            ..RelayOptions::default()
        }
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            tracing::error!("Error parsing {}", key);
            ConfigError::Invalid { key, value: raw }
        }),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_cors_origins(raw: &str) -> Result<CorsOrigins, ConfigError> {
    if raw.trim() == "*" {
        return Ok(CorsOrigins::Any);
    }
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect();
    let valid = !origins.is_empty()
        && origins
            .iter()
            .all(|o| o.starts_with("http://") || o.starts_with("https://"));
    if !valid {
        return Err(ConfigError::Invalid {
            key: "RECIPE_CORS_ORIGINS",
            value: raw.to_string(),
        });
    }
    Ok(CorsOrigins::List(origins))
}
