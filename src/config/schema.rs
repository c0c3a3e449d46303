//! Configuration schema definitions.
//!
//! This module defines the structure of the boxform configuration files.
//! Every section and field is optional in a file; missing values take the
//! defaults below.
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [server]
//! page_url = "http://127.0.0.1:8080/"
//! path = "/ws"
//!
//! [transport]
//! initial_backoff_secs = 1
//! max_backoff_secs = 16
//! retry_later_code = 1013
//! event_buffer = 64
//!
//! [form]
//! auto_submit = false
//! ```

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::transport::{socket_address, TransportOptions, RETRY_LATER};

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Where the form server lives.
    #[serde(default)]
    pub server: ServerConfig,

    /// Reconnect policy and buffering.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Form behavior.
    #[serde(default)]
    pub form: FormConfig,
}

impl Config {
    /// Merge another config into this one.
    ///
    /// Scalars are overridden when the other side differs from the default.
    pub fn merge(&mut self, other: Config) {
        self.general.merge(other.general);
        self.server.merge(other.server);
        self.transport.merge(other.transport);
        self.form.merge(other.form);
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.transport;
        if t.initial_backoff_secs == 0 {
            return Err(invalid("transport.initial_backoff_secs", "must be at least 1"));
        }
        if t.max_backoff_secs < t.initial_backoff_secs {
            return Err(invalid(
                "transport.max_backoff_secs",
                format!("must not be below initial_backoff_secs ({})", t.initial_backoff_secs),
            ));
        }
        if t.event_buffer == 0 {
            return Err(invalid("transport.event_buffer", "must be at least 1"));
        }
        if !self.server.path.starts_with('/') {
            return Err(invalid("server.path", "must start with '/'"));
        }
        self.socket_url()?;
        Ok(())
    }

    /// WebSocket address derived from the server section.
    pub fn socket_url(&self) -> Result<String, ConfigError> {
        socket_address(&self.server.page_url, &self.server.path)
            .map_err(|e| invalid("server.page_url", e.to_string()))
    }

    /// Transport settings for this configuration.
    pub fn transport_options(&self) -> Result<TransportOptions, ConfigError> {
        Ok(TransportOptions {
            url: self.socket_url()?,
            initial_backoff_secs: self.transport.initial_backoff_secs,
            max_backoff_secs: self.transport.max_backoff_secs,
            retry_later_code: self.transport.retry_later_code,
            event_buffer: self.transport.event_buffer,
        })
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub log_level: String,
}

impl GeneralConfig {
    fn merge(&mut self, other: GeneralConfig) {
        if !other.log_level.is_empty() {
            self.log_level = other.log_level;
        }
    }
}

/// Form server location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// URL of the page hosting the form; its scheme and host pick the socket.
    pub page_url: String,
    /// Socket path on that host.
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            page_url: "http://127.0.0.1:8080/".to_string(),
            path: "/ws".to_string(),
        }
    }
}

impl ServerConfig {
    fn merge(&mut self, other: ServerConfig) {
        let defaults = ServerConfig::default();
        if other.page_url != defaults.page_url {
            self.page_url = other.page_url;
        }
        if other.path != defaults.path {
            self.path = other.path;
        }
    }
}

/// Reconnect policy and buffering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// First reconnect delay, in seconds.
    pub initial_backoff_secs: u64,
    /// Ceiling of the reconnect delay, in seconds.
    pub max_backoff_secs: u64,
    /// Close code after which the client waits instead of reconnecting.
    pub retry_later_code: u16,
    /// Capacity of the transport event channel.
    pub event_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            initial_backoff_secs: 1,
            max_backoff_secs: 16,
            retry_later_code: RETRY_LATER,
            event_buffer: 64,
        }
    }
}

impl TransportConfig {
    fn merge(&mut self, other: TransportConfig) {
        let defaults = TransportConfig::default();
        if other.initial_backoff_secs != defaults.initial_backoff_secs {
            self.initial_backoff_secs = other.initial_backoff_secs;
        }
        if other.max_backoff_secs != defaults.max_backoff_secs {
            self.max_backoff_secs = other.max_backoff_secs;
        }
        if other.retry_later_code != defaults.retry_later_code {
            self.retry_later_code = other.retry_later_code;
        }
        if other.event_buffer != defaults.event_buffer {
            self.event_buffer = other.event_buffer;
        }
    }
}

/// Form behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FormConfig {
    /// Submit the seeded values as soon as a form is mounted.
    pub auto_submit: bool,
}

impl FormConfig {
    fn merge(&mut self, other: FormConfig) {
        if other.auto_submit {
            self.auto_submit = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.transport.max_backoff_secs, 16);
        assert_eq!(config.server.path, "/ws");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [transport]
            max_backoff_secs = 30

            [form]
            auto_submit = true
            "#,
        )
        .unwrap();
        assert_eq!(config.transport.initial_backoff_secs, 1);
        assert_eq!(config.transport.max_backoff_secs, 30);
        assert!(config.form.auto_submit);
    }

    #[test]
    fn test_merge_overrides_non_defaults() {
        let mut base: Config = toml::from_str(
            r#"
            [general]
            log_level = "debug"
            [server]
            page_url = "https://a.example/"
            "#,
        )
        .unwrap();
        let other: Config = toml::from_str(
            r#"
            [server]
            path = "/socket"
            "#,
        )
        .unwrap();
        base.merge(other);

        assert_eq!(base.general.log_level, "debug");
        assert_eq!(base.server.page_url, "https://a.example/");
        assert_eq!(base.server.path, "/socket");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.transport.initial_backoff_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "transport.initial_backoff_secs"
        ));

        let mut config = Config::default();
        config.transport.initial_backoff_secs = 8;
        config.transport.max_backoff_secs = 4;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.path = "ws".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.page_url = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_options() {
        let mut config = Config::default();
        config.server.page_url = "https://forms.example:8443/page".to_string();
        let options = config.transport_options().unwrap();
        assert_eq!(options.url, "wss://forms.example:8443/ws");
        assert_eq!(options.retry_later_code, 1013);
        assert_eq!(options.event_buffer, 64);
    }

    #[test]
    fn test_international_host_becomes_connectable() {
        let mut config = Config::default();
        config.server.page_url = "http://bücher.example:8080/app".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_url().unwrap(), "ws://xn--bcher-kva.example:8080/ws");

        config.server.page_url = "http://bad host.example/".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "server.page_url"
        ));
    }

    #[test]
    fn test_default_toml_parses() {
        let toml_content = include_str!("../../config/default.toml");
        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config, Config::default());
    }
}
