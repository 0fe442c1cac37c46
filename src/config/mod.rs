use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level relay configuration. Loaded once at startup and injected into
/// the handlers; never re-read per request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "0.0.0.0" or "127.0.0.1".
    pub host: String,
    pub port: u16,
}

/// Upstream provider endpoints and credentials. API keys normally arrive via
/// environment override (RELAY__PROVIDERS__OPENAI__API_KEY and friends); an
/// empty key does not prevent startup, it just makes that provider's calls
/// fail at request time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub cohere: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Upper bound on one buffered request, humantime format (e.g. "40s").
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// TCP connect timeout for all upstream calls. Streaming requests carry
    /// no total-duration timeout so long generations are not cut off.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Config {
    /// Load from a config file, then apply environment overrides with the
    /// RELAY prefix (e.g. RELAY__SERVER__PORT=8081 overrides server.port).
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("RELAY").separator("__"))
            .build()
            .map_err(|e| crate::error::Error::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| crate::error::Error::Config(e.to_string()))
    }

    /// Defaults used when no config file is present. Environment overrides
    /// still apply on top via `from_env`.
    pub fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            providers: ProvidersConfig {
                openai: ProviderConfig {
                    api_key: String::new(),
                    base_url: "https://api.openai.com/v1".to_string(),
                    model: "gpt-4o-mini".to_string(),
                },
                cohere: ProviderConfig {
                    api_key: String::new(),
                    base_url: "https://api.cohere.ai/v1".to_string(),
                    model: "command-r".to_string(),
                },
            },
            relay: RelayConfig {
                request_timeout: Duration::from_secs(40),
                connect_timeout: Duration::from_secs(10),
            },
        }
    }

    /// Defaults plus environment overrides, for deployments without a file.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(key) = std::env::var("RELAY__PROVIDERS__OPENAI__API_KEY") {
            cfg.providers.openai.api_key = key;
        }
        if let Ok(key) = std::env::var("RELAY__PROVIDERS__COHERE__API_KEY") {
            cfg.providers.cohere.api_key = key;
        }
        cfg
    }
}
