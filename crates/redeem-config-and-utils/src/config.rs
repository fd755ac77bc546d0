//! Configuration management for the service.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Default upper bound for a single store operation.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Default request timeout for the delivery relay.
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 10;

/// Which code derivation scheme the service runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DerivationSchemeName {
    /// Truncated SHA-256 of the identity; verify codes are reversed beta codes.
    #[default]
    Legacy,
    /// HKDF-SHA256 keyed by a secret with a per-kind label.
    Keyed,
}

impl DerivationSchemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Keyed => "keyed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Some(Self::Legacy),
            "keyed" => Some(Self::Keyed),
            _ => None,
        }
    }
}

/// Code derivation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivationConfig {
    #[serde(default)]
    pub scheme: DerivationSchemeName,
    /// Secret used as HKDF salt by the keyed scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Private delivery relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Endpoint that forwards a message privately to an identity.
    pub url: String,
    /// Optional bearer token sent to the relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default = "default_delivery_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_delivery_timeout_secs() -> u64 {
    DEFAULT_DELIVERY_TIMEOUT_SECS
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_store_timeout_ms() -> u64 {
    DEFAULT_STORE_TIMEOUT_MS
}

/// Main service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// HTTP listen address.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Timeout applied to every store operation.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default)]
    pub derivation: DerivationConfig,
    /// Delivery relay; when absent, issuance skips private delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryConfig>,
    /// Bearer token guarding the trigger endpoint. The endpoint is not
    /// mounted without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            derivation: DerivationConfig::default(),
            delivery: None,
            trigger_token: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file (defaults when missing),
    /// apply environment overrides and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `REDEEM_*` overrides from the given variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).and_then(non_empty);

        if let Some(level) = lookup("REDEEM_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(addr) = lookup("REDEEM_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(ms) = lookup("REDEEM_STORE_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.store_timeout_ms = ms;
        }
        if let Some(scheme) = lookup("REDEEM_DERIVATION_SCHEME")
            .as_deref()
            .and_then(DerivationSchemeName::parse)
        {
            self.derivation.scheme = scheme;
        }
        if let Some(secret) = lookup("REDEEM_DERIVATION_SECRET") {
            self.derivation.secret = Some(secret);
        }
        if let Some(url) = lookup("REDEEM_DELIVERY_URL") {
            match self.delivery.as_mut() {
                Some(delivery) => delivery.url = url,
                None => {
                    self.delivery = Some(DeliveryConfig {
                        url,
                        auth_token: None,
                        timeout_secs: DEFAULT_DELIVERY_TIMEOUT_SECS,
                    })
                }
            }
        }
        if let Some(token) = lookup("REDEEM_DELIVERY_TOKEN") {
            if let Some(delivery) = self.delivery.as_mut() {
                delivery.auth_token = Some(token);
            }
        }
        if let Some(token) = lookup("REDEEM_TRIGGER_TOKEN") {
            self.trigger_token = Some(token);
        }
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> CoreResult<()> {
        self.bind_addr()?;

        if self.store_timeout_ms == 0 {
            return Err(CoreError::Config(
                "store_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.derivation.scheme == DerivationSchemeName::Keyed
            && self.derivation.secret.as_deref().map_or(true, str::is_empty)
        {
            return Err(CoreError::Config(
                "keyed derivation requires a non-empty derivation secret".to_string(),
            ));
        }

        if let Some(delivery) = &self.delivery {
            let url = Url::parse(&delivery.url)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(CoreError::Config(format!(
                    "delivery url must be http(s), got {}",
                    url.scheme()
                )));
            }
        }

        if matches!(self.trigger_token.as_deref(), Some("")) {
            return Err(CoreError::Config("trigger_token must not be empty".to_string()));
        }

        Ok(())
    }

    /// Parsed listen address.
    pub fn bind_addr(&self) -> CoreResult<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| CoreError::Config(format!("invalid bind_addr {}: {}", self.bind_addr, e)))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
