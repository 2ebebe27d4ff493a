//! Health check logic.

use std::sync::Arc;

use chrono::Utc;
use postwatch_common::{
    mta::MtaControl,
    queue::parse_queue_listing,
};
use serde::Serialize;

use crate::{
    config::HealthConfig,
    report::{ConfigFileInfo, FilesPresent, PostfixReport, ProcessInfo, QueueStats, StatusReport},
};

/// Computes health snapshots by invoking the Postfix control utilities.
///
/// Stateless: every snapshot is computed fresh from the current command
/// results, so concurrent requests are independent.
#[derive(Debug)]
pub struct HealthChecker {
    mta: Arc<dyn MtaControl>,
    config: HealthConfig,
}

/// Point-in-time health verdict.
#[derive(Debug, Clone, Copy, Serialize)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Snapshot intentionally has one boolean per check"
)]
pub struct HealthSnapshot {
    /// Overall health: all individual checks passed.
    pub healthy: bool,

    /// `postfix status` exited 0.
    pub postfix_running: bool,

    /// The mail queue is empty or below the configured line threshold.
    pub queue_healthy: bool,

    /// `postfix check` exited 0.
    pub config_valid: bool,
}

impl HealthChecker {
    /// Create a checker driving the given control seam.
    #[must_use]
    pub const fn new(mta: Arc<dyn MtaControl>, config: HealthConfig) -> Self {
        Self { mta, config }
    }

    /// The configuration this checker was built with.
    #[must_use]
    pub const fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Compute a fresh health snapshot.
    ///
    /// The three checks run concurrently; a control-utility failure marks
    /// that one check unhealthy and never propagates.
    pub async fn snapshot(&self) -> HealthSnapshot {
        let (postfix_running, queue_healthy, config_valid) = tokio::join!(
            self.postfix_running(),
            self.queue_healthy(),
            self.config_valid(),
        );

        HealthSnapshot {
            healthy: postfix_running && queue_healthy && config_valid,
            postfix_running,
            queue_healthy,
            config_valid,
        }
    }

    async fn postfix_running(&self) -> bool {
        match self.mta.status().await {
            Ok(output) => output.success,
            Err(error) => {
                tracing::debug!(%error, "could not check postfix status");
                false
            }
        }
    }

    async fn queue_healthy(&self) -> bool {
        match self.mta.queue_listing().await {
            Ok(output) if output.success => {
                let listing = parse_queue_listing(&output.stdout);
                listing.empty || listing.line_count < self.config.max_queue_lines
            }
            Ok(_) => false,
            Err(error) => {
                tracing::debug!(%error, "could not check postfix queue");
                false
            }
        }
    }

    async fn config_valid(&self) -> bool {
        match self.mta.check().await {
            Ok(output) => output.success,
            Err(error) => {
                tracing::debug!(%error, "could not check postfix configuration");
                false
            }
        }
    }

    /// Assemble the verbose report served by `/status`.
    pub async fn status_report(&self) -> StatusReport {
        let (health, queue_stats, process_info) = tokio::join!(
            self.snapshot(),
            self.queue_stats(),
            self.process_info(),
        );

        let config_dir = &self.config.config_dir;
        let main_cf = config_dir.join("main.cf");
        let master_cf = config_dir.join("master.cf");
        let clients_cidr = config_dir.join("clients.cidr");
        let sasl_passwd = config_dir.join("sasl_passwd.lmdb");

        let config_info = [
            ("main.cf", ConfigFileInfo::inspect(&main_cf).await),
            ("master.cf", ConfigFileInfo::inspect(&master_cf).await),
            ("clients.cidr", ConfigFileInfo::inspect(&clients_cidr).await),
        ]
        .into_iter()
        .map(|(name, info)| (name.to_string(), info))
        .collect();

        let files = FilesPresent {
            main_config: file_exists(&main_cf).await,
            master_config: file_exists(&master_cf).await,
            clients_cidr: file_exists(&clients_cidr).await,
            sasl_passwd: file_exists(&sasl_passwd).await,
        };

        StatusReport {
            service: "postwatch-health",
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
            health,
            postfix: PostfixReport {
                queue_stats,
                process_info,
                config_info,
            },
            files,
            configuration: self.config.clone(),
        }
    }

    async fn queue_stats(&self) -> QueueStats {
        match self.mta.queue_listing().await {
            Ok(output) if output.success => {
                QueueStats::from_listing(&parse_queue_listing(&output.stdout))
            }
            Ok(output) => QueueStats::Unavailable {
                error: output.stderr.trim().to_string(),
            },
            Err(error) => QueueStats::Unavailable {
                error: error.to_string(),
            },
        }
    }

    async fn process_info(&self) -> ProcessInfo {
        match self.mta.status().await {
            Ok(output) => ProcessInfo {
                running: output.success,
                exit_code: output.exit_code,
                output: Some(output.stdout.trim().to_string()),
                error: None,
            },
            Err(error) => ProcessInfo {
                running: false,
                exit_code: None,
                output: None,
                error: Some(error.to_string()),
            },
        }
    }
}

async fn file_exists(path: &std::path::Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use postwatch_common::mta::{CommandOutput, MockMta, MtaCommand};

    use super::*;

    fn checker_with(mta: MockMta) -> HealthChecker {
        HealthChecker::new(Arc::new(mta), HealthConfig::default())
    }

    #[tokio::test]
    async fn test_all_checks_passing() {
        let mta = MockMta::new();
        mta.set_output(
            MtaCommand::QueueListing,
            CommandOutput::ok("Mail queue is empty\n"),
        );

        let snapshot = checker_with(mta).snapshot().await;
        assert!(snapshot.healthy);
        assert!(snapshot.postfix_running);
        assert!(snapshot.queue_healthy);
        assert!(snapshot.config_valid);
    }

    #[tokio::test]
    async fn test_stopped_postfix_fails_only_that_check() {
        let mta = MockMta::new();
        mta.set_output(MtaCommand::Status, CommandOutput::failed(1, "not running"));
        mta.set_output(
            MtaCommand::QueueListing,
            CommandOutput::ok("Mail queue is empty\n"),
        );

        let snapshot = checker_with(mta).snapshot().await;
        assert!(!snapshot.healthy);
        assert!(!snapshot.postfix_running);
        assert!(snapshot.queue_healthy);
        assert!(snapshot.config_valid);
    }

    #[tokio::test]
    async fn test_missing_cli_marks_checks_unhealthy_without_erroring() {
        let mta = MockMta::new();
        mta.fail_to_spawn(MtaCommand::Status);
        mta.fail_to_spawn(MtaCommand::Check);
        mta.set_output(
            MtaCommand::QueueListing,
            CommandOutput::ok("Mail queue is empty\n"),
        );

        let snapshot = checker_with(mta).snapshot().await;
        assert!(!snapshot.healthy);
        assert!(!snapshot.postfix_running);
        assert!(!snapshot.config_valid);
        assert!(snapshot.queue_healthy);
    }

    #[tokio::test]
    async fn test_large_queue_is_unhealthy() {
        let listing = (0..60)
            .map(|i| format!("QUEUE{i}     1024 Tue Aug  4 09:15:22  sender@example.com"))
            .collect::<Vec<_>>()
            .join("\n");

        let mta = MockMta::new();
        mta.set_output(MtaCommand::QueueListing, CommandOutput::ok(listing));

        let snapshot = checker_with(mta).snapshot().await;
        assert!(!snapshot.queue_healthy);
        assert!(!snapshot.healthy);
    }

    #[tokio::test]
    async fn test_status_report_degrades_when_cli_is_absent() {
        let mta = MockMta::new();
        mta.fail_to_spawn(MtaCommand::Status);
        mta.fail_to_spawn(MtaCommand::Check);
        mta.fail_to_spawn(MtaCommand::QueueListing);

        let report = checker_with(mta).status_report().await;
        assert!(!report.health.healthy);
        assert!(matches!(report.postfix.queue_stats, QueueStats::Unavailable { .. }));
        assert!(report.postfix.process_info.error.is_some());
    }
}
