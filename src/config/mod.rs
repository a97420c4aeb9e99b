use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::channel::ReconnectPolicy;
use crate::notice::Locale;

/// Floor for reconnect delays; zero would reconnect in a tight loop
pub const MIN_RECONNECT_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub channel: ChannelConfig,
    pub cache: CacheConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket endpoint without the token query parameter
    pub ws_url: String,
    pub reconnect_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub reconnect_backoff: bool,
    pub buffer_capacity: usize,
    pub subscriber_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How many times a fetch overtaken by an invalidation is re-issued
    pub max_superseded_refetches: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub locale: Locale,
    pub page_size: u32,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("KITCHEN_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Config pointing at an explicit backend, used by tests and embedders.
    pub fn for_backend(base_url: &str, ws_url: &str) -> Self {
        let mut config = Self::development();
        config.api.base_url = base_url.trim_end_matches('/').to_string();
        config.channel.ws_url = ws_url.to_string();
        config
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("KITCHEN_API_URL") {
            self.api.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("KITCHEN_HTTP_TIMEOUT_SECS") {
            self.api.timeout_secs = v.parse().unwrap_or(self.api.timeout_secs);
        }

        // Channel overrides
        if let Ok(v) = env::var("KITCHEN_WS_URL") {
            self.channel.ws_url = v;
        }
        if let Ok(v) = env::var("KITCHEN_RECONNECT_DELAY_MS") {
            self.channel.reconnect_delay_ms = v.parse().unwrap_or(self.channel.reconnect_delay_ms);
        }
        if let Ok(v) = env::var("KITCHEN_RECONNECT_MAX_DELAY_MS") {
            self.channel.reconnect_max_delay_ms = v.parse().unwrap_or(self.channel.reconnect_max_delay_ms);
        }
        if let Ok(v) = env::var("KITCHEN_RECONNECT_POLICY") {
            self.channel.reconnect_backoff = v.eq_ignore_ascii_case("backoff");
        }
        if let Ok(v) = env::var("KITCHEN_MESSAGE_BUFFER") {
            self.channel.buffer_capacity = v.parse().unwrap_or(self.channel.buffer_capacity);
        }

        // Cache overrides
        if let Ok(v) = env::var("KITCHEN_MAX_SUPERSEDED_REFETCHES") {
            self.cache.max_superseded_refetches = v.parse().unwrap_or(self.cache.max_superseded_refetches);
        }

        // UI overrides
        if let Ok(v) = env::var("KITCHEN_LOCALE") {
            self.ui.locale = Locale::parse(&v).unwrap_or(self.ui.locale);
        }
        if let Ok(v) = env::var("KITCHEN_PAGE_SIZE") {
            self.ui.page_size = v.parse().unwrap_or(self.ui.page_size);
        }

        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let initial_ms = self.channel.reconnect_delay_ms.max(MIN_RECONNECT_DELAY_MS);
        let initial = Duration::from_millis(initial_ms);
        if self.channel.reconnect_backoff {
            ReconnectPolicy::Backoff {
                initial,
                max: Duration::from_millis(self.channel.reconnect_max_delay_ms.max(initial_ms)),
            }
        } else {
            ReconnectPolicy::Fixed(initial)
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                timeout_secs: 30,
                user_agent: format!("kitchen-client/{}", env!("CARGO_PKG_VERSION")),
            },
            channel: ChannelConfig {
                ws_url: "ws://127.0.0.1:8000/api/ws".to_string(),
                reconnect_delay_ms: 5_000,
                reconnect_max_delay_ms: 60_000,
                reconnect_backoff: false,
                buffer_capacity: 10,
                subscriber_capacity: 64,
            },
            cache: CacheConfig {
                max_superseded_refetches: 3,
            },
            ui: UiConfig {
                locale: Locale::Uz,
                page_size: 100,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging.kitchen.example.com".to_string(),
                timeout_secs: 15,
                user_agent: format!("kitchen-client/{}", env!("CARGO_PKG_VERSION")),
            },
            channel: ChannelConfig {
                ws_url: "wss://staging.kitchen.example.com/api/ws".to_string(),
                reconnect_delay_ms: 5_000,
                reconnect_max_delay_ms: 60_000,
                reconnect_backoff: false,
                buffer_capacity: 10,
                subscriber_capacity: 64,
            },
            cache: CacheConfig {
                max_superseded_refetches: 3,
            },
            ui: UiConfig {
                locale: Locale::Uz,
                page_size: 50,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://kitchen.example.com".to_string(),
                timeout_secs: 10,
                user_agent: format!("kitchen-client/{}", env!("CARGO_PKG_VERSION")),
            },
            channel: ChannelConfig {
                ws_url: "wss://kitchen.example.com/api/ws".to_string(),
                reconnect_delay_ms: 5_000,
                reconnect_max_delay_ms: 60_000,
                reconnect_backoff: false,
                buffer_capacity: 10,
                subscriber_capacity: 128,
            },
            cache: CacheConfig {
                max_superseded_refetches: 3,
            },
            ui: UiConfig {
                locale: Locale::Uz,
                page_size: 50,
            },
        }
    }
}

// Global config for the binary - initialized once at startup.
// Library code receives its config through AppContext instead.
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

pub fn config() -> &'static ClientConfig {
    &CONFIG
}
