//! Health reporter configuration.

use std::path::PathBuf;

use postwatch_common::env;
use serde::Serialize;

use crate::error::HealthError;

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

const fn default_command_timeout() -> u64 {
    10
}

const fn default_max_queue_lines() -> usize {
    50
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("/etc/postfix")
}

/// Configuration for the health reporter.
///
/// Constructed once at startup; the only environment override is
/// `HEALTH_PORT` (the remaining fields exist so tests and embedders can
/// point the reporter elsewhere).
#[derive(Debug, Clone, Serialize)]
pub struct HealthConfig {
    /// Address to bind the HTTP listener.
    pub listen_address: String,

    /// Timeout applied to each control-utility invocation, in seconds.
    pub command_timeout_secs: u64,

    /// Queue listings with at least this many lines mark the queue
    /// unhealthy. The threshold is a heuristic carried over from relay
    /// operations; an empty queue always passes.
    pub max_queue_lines: usize,

    /// Directory holding the Postfix configuration files reported by
    /// `/status` (`main.cf`, `master.cf`, `clients.cidr`,
    /// `sasl_passwd.lmdb`).
    #[serde(skip)]
    pub config_dir: PathBuf,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            command_timeout_secs: default_command_timeout(),
            max_queue_lines: default_max_queue_lines(),
            config_dir: default_config_dir(),
        }
    }
}

impl HealthConfig {
    /// Build the configuration from the environment.
    ///
    /// `HEALTH_PORT` overrides the listening port (default 8080); the
    /// listener always binds on all interfaces.
    ///
    /// # Errors
    /// Returns an error if `HEALTH_PORT` is set but not a valid port.
    pub fn from_env() -> Result<Self, HealthError> {
        let mut config = Self::default();
        if let Some(port) = env::var::<u16>("HEALTH_PORT")? {
            config.listen_address = format!("0.0.0.0:{port}");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HealthConfig::default();
        assert_eq!(config.listen_address, "0.0.0.0:8080");
        assert_eq!(config.command_timeout_secs, 10);
        assert_eq!(config.max_queue_lines, 50);
        assert_eq!(config.config_dir, PathBuf::from("/etc/postfix"));
    }
}
