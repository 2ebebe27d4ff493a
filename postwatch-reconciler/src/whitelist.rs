//! Whitelist file generation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;

/// Writer for the Postfix client-whitelist file.
///
/// The file is fully rewritten on every update: a generated header comment
/// block, a blank separator line, then one `<cidr> OK` line per accepted
/// range. Content is written to a temporary sibling and renamed into place
/// so Postfix never observes a torn file (rename is atomic when the
/// temporary lands on the same filesystem, which a sibling path guarantees).
#[derive(Debug, Clone)]
pub struct WhitelistFile {
    path: PathBuf,
    source_url: String,
    backup_retention: Option<usize>,
}

impl WhitelistFile {
    /// Create a writer for `path`, recording `source_url` in the header.
    #[must_use]
    pub fn new(path: PathBuf, source_url: String, backup_retention: Option<usize>) -> Self {
        Self {
            path,
            source_url,
            backup_retention,
        }
    }

    /// Path of the live whitelist file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whitelist with `ip_ranges`.
    ///
    /// If a whitelist already exists it is first copied to a timestamped
    /// backup path. After a successful write, backups beyond the retention
    /// count are pruned oldest-first (pruning failures are logged, never
    /// propagated).
    ///
    /// # Errors
    /// Returns an error if the backup copy or the write itself fails; in
    /// that case the previous whitelist is left in place.
    pub async fn write(&self, ip_ranges: &[String]) -> std::io::Result<()> {
        if fs::try_exists(&self.path).await? {
            let backup = self.backup_path(Utc::now().timestamp());
            fs::copy(&self.path, &backup).await?;
            tracing::info!(backup = %backup.display(), "backed up previous whitelist");
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = self.render(ip_ranges, Utc::now());
        let staging = self.staging_path();
        fs::write(&staging, content).await?;
        fs::rename(&staging, &self.path).await?;

        tracing::info!(
            path = %self.path.display(),
            count = ip_ranges.len(),
            "whitelist updated"
        );

        if let Err(error) = self.prune_backups().await {
            tracing::warn!(%error, "could not prune old whitelist backups");
        }

        Ok(())
    }

    /// Render the full file content for `ip_ranges`.
    pub(crate) fn render(&self, ip_ranges: &[String], generated_at: DateTime<Utc>) -> String {
        let mut lines = vec![
            format!("# Generated at {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("# Source: {}", self.source_url),
            format!("# Total IP ranges: {}", ip_ranges.len()),
            String::new(),
        ];
        lines.extend(ip_ranges.iter().map(|range| format!("{range} OK")));
        lines.push(String::new());
        lines.join("\n")
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn backup_path(&self, timestamp: i64) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".backup.{timestamp}"));
        PathBuf::from(name)
    }

    async fn prune_backups(&self) -> std::io::Result<()> {
        let Some(retention) = self.backup_retention else {
            return Ok(());
        };
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        let Some(file_name) = self.path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };

        let prefix = format!("{file_name}.backup.");
        let mut backups = Vec::new();

        let mut entries = fs::read_dir(parent).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(suffix) = name.strip_prefix(&prefix)
                && let Ok(timestamp) = suffix.parse::<i64>()
            {
                backups.push((timestamp, entry.path()));
            }
        }

        if backups.len() <= retention {
            return Ok(());
        }

        backups.sort_unstable_by_key(|(timestamp, _)| *timestamp);
        let excess = backups.len() - retention;
        for (_, path) in backups.into_iter().take(excess) {
            tracing::debug!(path = %path.display(), "pruning old whitelist backup");
            fs::remove_file(&path).await?;
        }

        Ok(())
    }
}
