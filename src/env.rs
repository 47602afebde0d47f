/// Environment variable names used for convenient configuration of the
/// bridge from host applications.
///
/// These are purely helpers consumed by
/// [`BridgeConfig::from_env`](crate::config::BridgeConfig::from_env); the
/// core types remain decoupled from environment access.

/// The DSN/connection string of the remote error-tracking project.
pub const BRIDGE_DSN_ENV: &str = "BRIDGE_DSN";

/// Environment name attached to every report, e.g. `production`.
pub const BRIDGE_ENVIRONMENT_ENV: &str = "BRIDGE_ENVIRONMENT";

/// Optional HTTP proxy host.
pub const BRIDGE_PROXY_HOST_ENV: &str = "BRIDGE_PROXY_HOST";

/// Optional HTTP proxy port.
pub const BRIDGE_PROXY_PORT_ENV: &str = "BRIDGE_PROXY_PORT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
