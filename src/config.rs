use std::collections::BTreeMap;
use std::time::Duration;

use tracing::Level;

use crate::env;

/// Error raised while assembling or validating a [`BridgeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No DSN/connection string available. Fatal to bridge initialization:
    /// the dispatcher refuses to be built rather than silently no-opping.
    #[error("no DSN configured for the error-tracking bridge")]
    MissingDsn,
}

/// Explicit configuration for the bridge.
///
/// Passed into the dispatcher's constructor; the core never reaches into
/// ambient global state to fetch its options. Use [`BridgeConfig::from_env`]
/// when environment-variable configuration is wanted.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Connection string identifying the remote project/endpoint. Treated
    /// as opaque by the core; concrete transports parse it.
    pub dsn: String,
    /// Environment name seeded into the scope (e.g. "production").
    pub environment: Option<String>,
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,
    /// When true the dispatcher builds its own normalized backtrace and
    /// attaches it as an event hint instead of relying on the remote SDK's
    /// automatic capture.
    pub custom_stacktrace: bool,
    /// Tags seeded into the scope at construction.
    pub tags: BTreeMap<String, String>,
    /// Extra data seeded into the scope at construction.
    pub extra: BTreeMap<String, serde_json::Value>,
    /// Bound on each remote capture call; a hung endpoint surfaces as a
    /// delivery failure instead of stalling the host.
    pub timeout: Duration,
    /// Events below this level are ignored by the layer.
    pub capture_level: Level,
    /// Capacity of the layer→dispatch-task channel; records are dropped
    /// (and counted) when it is full.
    pub channel_buffer: usize,
}

impl BridgeConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        BridgeConfig {
            dsn: dsn.into(),
            environment: None,
            proxy_host: None,
            proxy_port: None,
            custom_stacktrace: false,
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
            timeout: Duration::from_secs(5),
            capture_level: Level::ERROR,
            channel_buffer: 1024,
        }
    }

    /// Read configuration from the `BRIDGE_*` environment variables.
    ///
    /// Fails with [`ConfigError::MissingDsn`] when `BRIDGE_DSN` is unset
    /// or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let dsn = std::env::var(env::BRIDGE_DSN_ENV).unwrap_or_default();
        if dsn.trim().is_empty() {
            return Err(ConfigError::MissingDsn);
        }

        let mut config = BridgeConfig::new(dsn);
        if let Ok(environment) = std::env::var(env::BRIDGE_ENVIRONMENT_ENV) {
            config.environment = Some(environment);
        }
        if let Ok(host) = std::env::var(env::BRIDGE_PROXY_HOST_ENV) {
            config.proxy_host = Some(host);
        }
        if let Ok(port) = std::env::var(env::BRIDGE_PROXY_PORT_ENV) {
            config.proxy_port = port.parse().ok();
        }
        Ok(config)
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy_host = Some(host.into());
        self.proxy_port = Some(port);
        self
    }

    pub fn with_custom_stacktrace(mut self, enabled: bool) -> Self {
        self.custom_stacktrace = enabled;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_capture_level(mut self, level: Level) -> Self {
        self.capture_level = level;
        self
    }

    /// Proxy as the `host:port` string transports expect, when both parts
    /// are configured. The only parsing the core performs on proxy data.
    pub fn proxy(&self) -> Option<String> {
        match (&self.proxy_host, self.proxy_port) {
            (Some(host), Some(port)) => Some(format!("{}:{}", host, port)),
            _ => None,
        }
    }

    /// Reject configurations that cannot possibly deliver anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dsn.trim().is_empty() {
            return Err(ConfigError::MissingDsn);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dsn_is_rejected() {
        assert!(matches!(
            BridgeConfig::new("").validate(),
            Err(ConfigError::MissingDsn)
        ));
        assert!(BridgeConfig::new("https://key@host/1").validate().is_ok());
    }

    #[test]
    fn proxy_joins_host_and_port() {
        let config = BridgeConfig::new("https://key@host/1").with_proxy("proxy.local", 8080);
        assert_eq!(config.proxy().as_deref(), Some("proxy.local:8080"));
        assert_eq!(BridgeConfig::new("x").proxy(), None);
    }
}
