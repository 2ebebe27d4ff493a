//! Persisted reconciliation state.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Record of the last successful reconciliation, persisted as JSON.
///
/// Read at startup and before every fetch so change detection survives
/// restarts. A missing or corrupt file is treated as "no previous state":
/// the next fetch then unconditionally counts as changed, which is safe
/// because rewriting the whitelist is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileState {
    /// Digest of the feed body that produced the current whitelist.
    pub content_hash: String,

    /// When the whitelist was last rewritten.
    pub last_update: DateTime<Utc>,

    /// Number of ranges written to the whitelist.
    pub ip_count: u64,
}

impl ReconcileState {
    /// Load the state record, or `None` if it is absent or unreadable.
    pub async fn load(path: &Path) -> Option<Self> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no previous state");
                return None;
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "could not read state file");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "state file is corrupt, treating as absent"
                );
                None
            }
        }
    }

    /// Persist the state record, creating parent directories as needed.
    ///
    /// The file is written in place; the only reader is this process at
    /// startup, so a torn write costs at worst one redundant whitelist
    /// rewrite.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let state = ReconcileState {
            content_hash: "abc123".to_string(),
            last_update: Utc::now(),
            ip_count: 17,
        };
        state.save(&path).await.unwrap();

        let loaded = ReconcileState::load(&path).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReconcileState::load(&dir.path().join("state.json")).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        assert!(ReconcileState::load(&path).await.is_none());
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/state.json");

        let state = ReconcileState {
            content_hash: "abc".to_string(),
            last_update: Utc::now(),
            ip_count: 1,
        };
        state.save(&path).await.unwrap();

        assert!(path.exists());
    }
}
