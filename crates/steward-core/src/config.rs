use std::collections::HashMap;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StewardError};

fn default_true() -> bool {
    true
}
fn default_ttl_seconds() -> u64 {
    300
}
fn default_max_size() -> usize {
    100
}
fn default_gateway_port() -> u16 {
    8080
}
fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_db_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.steward")
}

/// Top-level config: `steward.toml` + `STEWARD_*` env var overrides. Field
/// names below mirror spec.md §6's recognized-variable table exactly (one
/// config field per row), plus an ambient `gateway` section the spec leaves
/// implicit (a bind address/port is required to actually run the HTTP
/// server, even though spec.md doesn't name the variable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StewardConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
    /// `<PROVIDER>_API_KEY` — keyed by lowercase provider name (e.g. "anthropic", "ollama").
    #[serde(default)]
    pub provider_api_keys: HashMap<String, String>,
    /// `<PLATFORM>_TOKEN` — keyed by "primary" / "secondary".
    #[serde(default)]
    pub platform_tokens: HashMap<String, String>,
    /// `AUTHORIZED_USERS` — comma-separated in the env var, parsed into a list.
    #[serde(default)]
    pub authorized_users: Vec<String>,
    /// `HQ_CHAT_ID` — chat id receiving cross-project alerts.
    pub hq_chat_id: Option<String>,
    /// `AUTO_CALL_ENABLED` — enables the voice tier of C11.
    #[serde(default)]
    pub auto_call_enabled: bool,
}

impl Default for StewardConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            channels: ChannelsConfig::default(),
            webhooks: WebhooksConfig::default(),
            provider_api_keys: HashMap::new(),
            platform_tokens: HashMap::new(),
            authorized_users: Vec::new(),
            hq_chat_id: None,
            auto_call_enabled: false,
        }
    }
}

/// C4's cache configuration contract (spec.md §4.4): `{enabled, ttlSeconds,
/// maxSize}`. Invalid values fail fast at startup (`ConfigError`, exit 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0 = never expires.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_ttl_seconds(),
            max_size: default_max_size(),
        }
    }
}

impl CacheConfig {
    /// Fails fast with a human-readable error — spec.md §4.4.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(StewardError::ConfigError(
                "cache.max_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_memory_db_path")]
    pub memory_db_path: String,
    #[serde(default = "default_state_db_path")]
    pub state_db_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            memory_db_path: default_memory_db_path(),
            state_db_path: default_state_db_path(),
        }
    }
}

fn default_memory_db_path() -> String {
    format!("{}/memory.db", default_db_dir())
}
fn default_state_db_path() -> String {
    format!("{}/state.db", default_db_dir())
}

impl StewardConfig {
    /// Load config from a TOML file with `STEWARD_*` env var overrides,
    /// then validate. Returns a `ConfigError` on any failure — the caller
    /// exits with code 1 (spec.md §6).
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: StewardConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("STEWARD_").split("_"))
            .merge(Env::raw().map(|k| {
                // CACHE_ENABLED / CACHE_TTL_SECONDS / CACHE_MAX_SIZE map onto
                // the nested `cache` table per spec.md §6's variable names
                // (no STEWARD_ prefix — these are the spec's literal names).
                match k.as_str() {
                    "CACHE_ENABLED" => "cache.enabled".into(),
                    "CACHE_TTL_SECONDS" => "cache.ttl_seconds".into(),
                    "CACHE_MAX_SIZE" => "cache.max_size".into(),
                    "AUTHORIZED_USERS" => "authorized_users".into(),
                    "HQ_CHAT_ID" => "hq_chat_id".into(),
                    "AUTO_CALL_ENABLED" => "auto_call_enabled".into(),
                    other => other.into(),
                }
            }))
            .extract()
            .map_err(|e| StewardError::ConfigError(e.to_string()))?;

        config.cache.validate()?;
        Ok(config)
    }
}

fn default_config_path() -> String {
    format!("{}/steward.toml", default_db_dir())
}

fn default_max_attachment_bytes() -> u64 {
    20 * 1024 * 1024
}

/// C1 adapter tuning — spec.md §4.1. Two sub-tables, one per adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub primary: PrimaryChannelConfig,
    #[serde(default)]
    pub secondary: SecondaryChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryChannelConfig {
    /// Allow the bot to respond in private DMs.
    #[serde(default = "default_true")]
    pub dm_allowed: bool,
    /// In group chats, only respond when the bot is @-mentioned.
    #[serde(default)]
    pub require_mention: bool,
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
}

impl Default for PrimaryChannelConfig {
    fn default() -> Self {
        Self {
            dm_allowed: true,
            require_mention: false,
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecondaryChannelConfig {
    /// Base URL of the secondary provider's send API, e.g. an SMS gateway.
    pub base_url: Option<String>,
}

/// C13's webhook ingress table (spec.md §4.13): one authenticated source per
/// upstream integration, plus the `/api/*` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhooksConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub sources: Vec<WebhookSource>,
    /// Expected `X-API-Key` header value for `/api/*`.
    pub api_key: Option<String>,
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sources: Vec::new(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSource {
    pub name: String,
    #[serde(default)]
    pub auth_mode: WebhookAuthMode,
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAuthMode {
    #[default]
    None,
    HmacSha256,
    BearerToken,
}
