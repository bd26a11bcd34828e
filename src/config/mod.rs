use serde::{Deserialize, Serialize};

use crate::client::RetryConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub search_console: SearchConsoleConfig,
    pub api_server: ServerConfig,
    pub auth: AuthConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConsoleConfig {
    pub api_base_url: String,
    pub inspection_base_url: String,
    /// Bearer token issued by an external credential flow. Never serialized.
    #[serde(skip)]
    pub access_token: Option<String>,
    pub scope: AccessScope,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub cache: CacheConfig,
}

/// OAuth scope the configured credential was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessScope {
    Readonly,
    Full,
}

impl AccessScope {
    pub fn allows_writes(&self) -> bool {
        matches!(self, AccessScope::Full)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Zero disables the response cache.
    pub ttl_secs: u64,
    pub max_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub enabled: bool,
    #[serde(skip)]
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Serialized tool payloads above this size get their row arrays cut.
    pub max_result_bytes: usize,
}

impl SearchConsoleConfig {
    pub const DEFAULT_API_BASE_URL: &'static str = "https://www.googleapis.com/webmasters/v3";
    pub const DEFAULT_INSPECTION_BASE_URL: &'static str = "https://searchconsole.googleapis.com/v1";

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.retry_base_delay_ms,
        }
    }
}

impl Default for SearchConsoleConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            inspection_base_url: Self::DEFAULT_INSPECTION_BASE_URL.to_string(),
            access_token: None,
            scope: AccessScope::Readonly,
            request_timeout_secs: 30,
            max_retries: retry.max_retries,
            retry_base_delay_ms: retry.base_delay_ms,
            cache: CacheConfig {
                ttl_secs: 300,
                max_entries: 1000,
            },
        }
    }
}

impl ToolsConfig {
    pub const DEFAULT_MAX_RESULT_BYTES: usize = 200_000;
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_result_bytes: Self::DEFAULT_MAX_RESULT_BYTES,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {key} ('{raw}'): {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = SearchConsoleConfig::default();

        let api_base_url =
            std::env::var("GSC_API_BASE_URL").unwrap_or(defaults.api_base_url.clone());
        let inspection_base_url = std::env::var("GSC_INSPECTION_BASE_URL")
            .unwrap_or(defaults.inspection_base_url.clone());
        let access_token = std::env::var("GSC_ACCESS_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let scope = match std::env::var("GSC_SCOPE")
            .unwrap_or_else(|_| "readonly".to_string())
            .to_lowercase()
            .as_str()
        {
            "full" | "write" | "webmasters" => AccessScope::Full,
            "readonly" | "read" | "webmasters.readonly" => AccessScope::Readonly,
            other => {
                tracing::warn!(
                    "Unknown GSC_SCOPE '{other}', falling back to 'readonly'. Supported values: readonly, full"
                );
                AccessScope::Readonly
            }
        };

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = env_or("API_PORT", 8080u16)?;

        let auth_enabled = std::env::var("AUTH_ENABLED")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        let api_keys = std::env::var("API_KEYS")
            .map(|keys| {
                keys.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            search_console: SearchConsoleConfig {
                api_base_url,
                inspection_base_url,
                access_token,
                scope,
                request_timeout_secs: env_or(
                    "GSC_REQUEST_TIMEOUT_SECS",
                    defaults.request_timeout_secs,
                )?,
                max_retries: env_or("GSC_MAX_RETRIES", defaults.max_retries)?,
                retry_base_delay_ms: env_or(
                    "GSC_RETRY_BASE_DELAY_MS",
                    defaults.retry_base_delay_ms,
                )?,
                cache: CacheConfig {
                    ttl_secs: env_or("GSC_CACHE_TTL_SECS", defaults.cache.ttl_secs)?,
                    max_entries: env_or("GSC_CACHE_MAX_ENTRIES", defaults.cache.max_entries)?,
                },
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            auth: AuthConfig {
                enabled: auth_enabled,
                api_keys,
            },
            tools: ToolsConfig {
                max_result_bytes: env_or(
                    "TOOLS_MAX_RESULT_BYTES",
                    ToolsConfig::DEFAULT_MAX_RESULT_BYTES,
                )?,
            },
        })
    }
}
