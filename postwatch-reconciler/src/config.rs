//! Reconciler configuration.
//!
//! All environment lookups happen here, once, at startup. Components receive
//! the resulting struct and never consult the environment themselves.

use std::path::PathBuf;

use postwatch_common::env::{self, EnvVarError};

fn default_feed_url() -> String {
    "https://ip-ranges.atlassian.com/".to_string()
}

fn default_whitelist_path() -> PathBuf {
    PathBuf::from("/etc/postfix/clients.cidr")
}

fn default_state_path() -> PathBuf {
    PathBuf::from("/var/lib/postwatch/state.json")
}

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 3600;
const DEFAULT_METRIC_INTERVAL_SECS: u64 = 300;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BACKUP_RETENTION: usize = 10;

/// Configuration for the whitelist reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// URL of the remote IP-range feed (`FEED_URL`).
    pub feed_url: String,

    /// Path of the Postfix client-whitelist file (`WHITELIST_PATH`).
    pub whitelist_path: PathBuf,

    /// Path of the persisted reconciliation state (`STATE_PATH`).
    pub state_path: PathBuf,

    /// Seconds between update checks (`UPDATE_INTERVAL_SECS`, default 3600).
    pub update_interval_secs: u64,

    /// Seconds between periodic metric emissions (`METRIC_INTERVAL_SECS`,
    /// default 300).
    pub metric_interval_secs: u64,

    /// Timeout for one feed fetch, in seconds.
    pub fetch_timeout_secs: u64,

    /// Timeout for one Postfix control-utility invocation, in seconds.
    pub command_timeout_secs: u64,

    /// How many whitelist backups to retain (`BACKUP_RETENTION`, default
    /// 10; 0 disables pruning and lets backups accumulate unbounded).
    pub backup_retention: Option<usize>,

    /// Base URL of the monitoring backend (`MONITOR_BASE_URL`). Unset
    /// disables all notifications and metrics.
    pub monitor_base_url: Option<String>,

    /// API key for the monitoring backend (`MONITOR_API_KEY`).
    pub monitor_api_key: Option<String>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            whitelist_path: default_whitelist_path(),
            state_path: default_state_path(),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            metric_interval_secs: DEFAULT_METRIC_INTERVAL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            backup_retention: Some(DEFAULT_BACKUP_RETENTION),
            monitor_base_url: None,
            monitor_api_key: None,
        }
    }
}

impl ReconcilerConfig {
    /// Build the configuration from the environment, falling back to the
    /// documented defaults for anything unset.
    ///
    /// # Errors
    /// Returns an error if a variable is set but unparseable; startup fails
    /// rather than running with a half-applied configuration.
    pub fn from_env() -> Result<Self, EnvVarError> {
        let mut config = Self::default();

        if let Some(url) = env::var::<String>("FEED_URL")? {
            config.feed_url = url;
        }
        if let Some(path) = env::var::<PathBuf>("WHITELIST_PATH")? {
            config.whitelist_path = path;
        }
        if let Some(path) = env::var::<PathBuf>("STATE_PATH")? {
            config.state_path = path;
        }
        if let Some(secs) = env::var::<u64>("UPDATE_INTERVAL_SECS")? {
            config.update_interval_secs = secs;
        }
        if let Some(secs) = env::var::<u64>("METRIC_INTERVAL_SECS")? {
            config.metric_interval_secs = secs;
        }
        if let Some(retention) = env::var::<usize>("BACKUP_RETENTION")? {
            config.backup_retention = (retention > 0).then_some(retention);
        }
        config.monitor_base_url = env::var::<String>("MONITOR_BASE_URL")?;
        config.monitor_api_key = env::var::<String>("MONITOR_API_KEY")?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.feed_url, "https://ip-ranges.atlassian.com/");
        assert_eq!(config.whitelist_path, PathBuf::from("/etc/postfix/clients.cidr"));
        assert_eq!(config.update_interval_secs, 3600);
        assert_eq!(config.metric_interval_secs, 300);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.backup_retention, Some(10));
        assert!(config.monitor_base_url.is_none());
    }
}
