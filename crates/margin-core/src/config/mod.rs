//! Client configuration.
//!
//! Values come from an optional JSON file and are then overridden by
//! environment variables. Everything has a working default, so a missing
//! file just means local-only defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::SyncSettings;
use crate::db::SyncConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::util::{is_remote_database_url, normalize_text_option};

pub const ENV_DEBOUNCE_MS: &str = "MARGIN_DEBOUNCE_MS";
pub const ENV_FLUSH_ON_SWITCH: &str = "MARGIN_FLUSH_ON_SWITCH";
pub const ENV_SYNC_URL: &str = "TURSO_DATABASE_URL";
pub const ENV_SYNC_TOKEN: &str = "TURSO_AUTH_TOKEN";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    /// Quiet period before buffered edits are written
    pub debounce_ms: u64,
    /// Write unflushed edits before switching to another note
    pub flush_on_switch: bool,
    pub retry_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Remote Turso database for live sync
    pub sync_url: Option<String>,
    pub sync_auth_token: Option<String>,
    /// Background pull interval for the replica; `0` disables it
    pub sync_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            debounce_ms: 500,
            flush_on_switch: false,
            retry_attempts: retry.max_attempts,
            retry_initial_delay_ms: duration_ms(retry.initial_delay),
            retry_max_delay_ms: duration_ms(retry.max_delay),
            sync_url: None,
            sync_auth_token: None,
            sync_interval_secs: 60,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("debounce_ms", &self.debounce_ms)
            .field("flush_on_switch", &self.flush_on_switch)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_initial_delay_ms", &self.retry_initial_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("sync_url", &self.sync_url)
            .field(
                "sync_auth_token",
                &self.sync_auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sync_interval_secs", &self.sync_interval_secs)
            .finish()
    }
}

impl ClientConfig {
    /// Load from `path` (if it exists), apply process environment overrides
    /// and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let payload = std::fs::read_to_string(path)?;
                let config = parse_client_config(&payload)?;
                tracing::debug!(path = %path.display(), "Loaded client config");
                config
            }
            _ => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from variables resolved by `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = normalize_text_option(lookup(ENV_DEBOUNCE_MS)) {
            self.debounce_ms = raw.parse().map_err(|_| {
                Error::Config(format!("{ENV_DEBOUNCE_MS} must be a whole number of milliseconds"))
            })?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_FLUSH_ON_SWITCH)) {
            self.flush_on_switch = matches!(
                raw.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(url) = normalize_text_option(lookup(ENV_SYNC_URL)) {
            self.sync_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_SYNC_TOKEN)) {
            self.sync_auth_token = Some(token);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::Config("debounce_ms must be greater than zero".to_string()));
        }
        if self.retry_attempts == 0 {
            return Err(Error::Config("retry_attempts must be at least 1".to_string()));
        }
        if let Some(url) = normalize_text_option(self.sync_url.clone()) {
            if !is_remote_database_url(&url) {
                return Err(Error::Config(
                    "sync_url must start with libsql://, http:// or https://".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Controller tuning derived from this config
    pub const fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            flush_on_switch: self.flush_on_switch,
            retry: RetryPolicy {
                max_attempts: self.retry_attempts,
                initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
                max_delay: Duration::from_millis(self.retry_max_delay_ms),
            },
        }
    }

    /// Replica settings, when both URL and token are present
    pub fn sync_config(&self) -> Option<SyncConfig> {
        let url = normalize_text_option(self.sync_url.clone())?;
        let token = normalize_text_option(self.sync_auth_token.clone())?;
        let config = SyncConfig::new(url, token);
        Some(if self.sync_interval_secs == 0 {
            config.without_auto_sync()
        } else {
            config.with_sync_interval(Duration::from_secs(self.sync_interval_secs))
        })
    }
}

/// Parse a config file payload
pub fn parse_client_config(payload: &str) -> Result<ClientConfig> {
    serde_json::from_str(payload)
        .map_err(|error| Error::Config(format!("invalid client config JSON: {error}")))
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_controller_defaults() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync_settings(), SyncSettings::default());
        assert!(config.sync_config().is_none());
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let error = parse_client_config(r#"{"debounce_ms": 300, "surprise": true}"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn parse_fills_missing_fields_with_defaults() {
        let config = parse_client_config(r#"{"flush_on_switch": true}"#).unwrap();
        assert!(config.flush_on_switch);
        assert_eq!(config.debounce_ms, 500);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = parse_client_config(r#"{"debounce_ms": 300}"#).unwrap();
        config
            .apply_env_overrides(env(&[
                (ENV_DEBOUNCE_MS, "750"),
                (ENV_FLUSH_ON_SWITCH, "yes"),
                (ENV_SYNC_URL, " libsql://notes.turso.io "),
                (ENV_SYNC_TOKEN, "secret"),
            ]))
            .unwrap();

        assert_eq!(config.debounce_ms, 750);
        assert!(config.flush_on_switch);
        let sync = config.sync_config().unwrap();
        assert_eq!(sync.url.as_deref(), Some("libsql://notes.turso.io"));
        assert_eq!(sync.sync_interval, Some(Duration::from_secs(60)));
    }

    #[test]
    fn invalid_debounce_env_is_rejected() {
        let mut config = ClientConfig::default();
        assert!(config
            .apply_env_overrides(env(&[(ENV_DEBOUNCE_MS, "soon")]))
            .is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero = ClientConfig {
            debounce_ms: 0,
            ..ClientConfig::default()
        };
        assert!(zero.validate().is_err());

        let bad_url = ClientConfig {
            sync_url: Some("notes.turso.io".to_string()),
            ..ClientConfig::default()
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn sync_interval_zero_disables_auto_sync() {
        let config = ClientConfig {
            sync_url: Some("libsql://notes.turso.io".to_string()),
            sync_auth_token: Some("token".to_string()),
            sync_interval_secs: 0,
            ..ClientConfig::default()
        };
        assert_eq!(config.sync_config().unwrap().sync_interval, None);
    }

    #[test]
    fn debug_redacts_token() {
        let config = ClientConfig {
            sync_auth_token: Some("secret".to_string()),
            ..ClientConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
