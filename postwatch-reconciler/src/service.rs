//! Reconciliation orchestration and the service loop.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use postwatch_common::{Signal, mta::MtaControl};

use crate::{
    config::ReconcilerConfig,
    error::ReconcileError,
    feed::{FeedClient, FeedOutcome, extract_ip_ranges},
    monitor::{MonitorClient, Severity},
    state::ReconcileState,
    whitelist::WhitelistFile,
};

const EVENT_TITLE: &str = "Postfix whitelist update";
const METRIC_IP_RANGES: &str = "postwatch.whitelist.ip_ranges";
const METRIC_RELOAD_SUCCESS: &str = "postwatch.whitelist.reload_success";

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The feed content matched the stored hash; nothing was touched.
    Unchanged,

    /// The whitelist was rewritten and state persisted. `reload_ok` records
    /// whether Postfix picked the change up.
    Updated { ip_count: u64, reload_ok: bool },
}

/// The whitelist reconciler.
///
/// Strictly sequential: one pass runs at a time, and each pass performs
/// fetch, write, reload and persist in order. The struct owns no locks
/// because it is the only writer to the whitelist and state files (single
/// instance per deployment, by convention).
#[derive(Debug)]
pub struct Reconciler {
    config: ReconcilerConfig,
    feed: FeedClient,
    whitelist: WhitelistFile,
    monitor: MonitorClient,
    mta: Arc<dyn MtaControl>,

    /// Outcome of the most recent reload in this process, fed into the
    /// periodic metric emission. `None` until a reconciliation has run.
    last_reload_ok: Option<bool>,
}

impl Reconciler {
    /// Wire up a reconciler from its configuration.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: ReconcilerConfig, mta: Arc<dyn MtaControl>) -> Result<Self, reqwest::Error> {
        let feed = FeedClient::new(
            config.feed_url.clone(),
            Duration::from_secs(config.fetch_timeout_secs),
        )?;
        let monitor = MonitorClient::new(
            config.monitor_base_url.clone(),
            config.monitor_api_key.clone(),
            Duration::from_secs(10),
        )?;
        let whitelist = WhitelistFile::new(
            config.whitelist_path.clone(),
            config.feed_url.clone(),
            config.backup_retention,
        );

        Ok(Self {
            config,
            feed,
            whitelist,
            monitor,
            mta,
            last_reload_ok: None,
        })
    }

    /// Run one full reconciliation pass.
    ///
    /// On an unchanged feed this emits the cached metrics and returns
    /// without touching the filesystem or Postfix. State is persisted
    /// whenever the whitelist was rewritten, even if the reload failed:
    /// the file on disk is already the new version, and re-running the
    /// whole pass next cycle would not fix a reload problem.
    ///
    /// # Errors
    /// See [`ReconcileError`]; every variant is recoverable and leaves the
    /// previous whitelist in place.
    pub async fn reconcile_once(&mut self) -> Result<ReconcileOutcome, ReconcileError> {
        tracing::info!("checking for whitelist updates");

        let state = ReconcileState::load(&self.config.state_path).await;
        let last_hash = state.as_ref().map(|state| state.content_hash.as_str());

        let (document, content_hash) = match self.feed.fetch_and_diff(last_hash).await? {
            FeedOutcome::Unchanged => {
                tracing::info!("no changes detected");
                self.emit_metrics(state.as_ref()).await;
                return Ok(ReconcileOutcome::Unchanged);
            }
            FeedOutcome::Changed {
                document,
                content_hash,
            } => (document, content_hash),
        };

        let ranges = extract_ip_ranges(&document);
        if ranges.is_empty() {
            self.monitor
                .emit_event(
                    Severity::Error,
                    EVENT_TITLE,
                    "feed changed but contained no email egress ranges; whitelist left untouched",
                )
                .await;
            return Err(ReconcileError::NoMatchingRanges);
        }

        if let Err(source) = self.whitelist.write(&ranges).await {
            self.monitor
                .emit_event(
                    Severity::Error,
                    EVENT_TITLE,
                    &format!("failed to write whitelist: {source}"),
                )
                .await;
            return Err(ReconcileError::Write(source));
        }

        let reload_ok = self.reload_mta().await;
        self.last_reload_ok = Some(reload_ok);

        let ip_count = ranges.len() as u64;
        let new_state = ReconcileState {
            content_hash,
            last_update: Utc::now(),
            ip_count,
        };
        if let Err(error) = new_state.save(&self.config.state_path).await {
            // The whitelist itself was updated; losing the hash only costs
            // one redundant rewrite next cycle.
            tracing::error!(%error, "could not persist reconciliation state");
        }

        let (severity, text) = if reload_ok {
            (
                Severity::Success,
                format!("updated whitelist with {ip_count} IP ranges and reloaded postfix"),
            )
        } else {
            (
                Severity::Warning,
                format!("updated whitelist with {ip_count} IP ranges but failed to reload postfix"),
            )
        };
        self.monitor.emit_event(severity, EVENT_TITLE, &text).await;
        self.monitor
            .emit_gauge(METRIC_IP_RANGES, ip_count as f64)
            .await;
        self.monitor
            .emit_gauge(METRIC_RELOAD_SUCCESS, if reload_ok { 1.0 } else { 0.0 })
            .await;

        Ok(ReconcileOutcome::Updated {
            ip_count,
            reload_ok,
        })
    }

    /// Re-emit the current gauges from persisted state, so dashboards have
    /// data points between reconciliations.
    pub async fn periodic_metric_emit(&self) {
        let state = ReconcileState::load(&self.config.state_path).await;
        self.emit_metrics(state.as_ref()).await;
    }

    async fn emit_metrics(&self, state: Option<&ReconcileState>) {
        if let Some(state) = state {
            self.monitor
                .emit_gauge(METRIC_IP_RANGES, state.ip_count as f64)
                .await;
        }
        if let Some(reload_ok) = self.last_reload_ok {
            self.monitor
                .emit_gauge(METRIC_RELOAD_SUCCESS, if reload_ok { 1.0 } else { 0.0 })
                .await;
        }
    }

    /// Ensure Postfix is running, then reload it.
    ///
    /// Returns whether the reload exited 0. Failures along the way are
    /// logged; the caller decides notification severity.
    async fn reload_mta(&self) -> bool {
        let running = match self.mta.status().await {
            Ok(output) => output.success,
            Err(error) => {
                tracing::error!(%error, "could not check postfix status");
                false
            }
        };

        if !running {
            tracing::info!("postfix is not running, starting it");
            match self.mta.start().await {
                Ok(output) if output.success => tracing::info!("postfix started"),
                Ok(output) => {
                    tracing::error!(stderr = %output.stderr.trim(), "failed to start postfix");
                }
                Err(error) => tracing::error!(%error, "failed to start postfix"),
            }
        }

        match self.mta.reload().await {
            Ok(output) if output.success => {
                tracing::info!("postfix configuration reloaded");
                true
            }
            Ok(output) => {
                tracing::error!(stderr = %output.stderr.trim(), "postfix reload failed");
                false
            }
            Err(error) => {
                tracing::error!(%error, "postfix reload failed");
                false
            }
        }
    }

    /// Run the reconciler until a shutdown signal is received.
    ///
    /// An initial reconciliation runs immediately; afterwards the update
    /// and metric intervals tick independently, with the update check
    /// taking priority when both are due. No tick error terminates the
    /// loop.
    pub async fn serve(mut self, mut shutdown: tokio::sync::broadcast::Receiver<Signal>) {
        tracing::info!(
            feed_url = %self.config.feed_url,
            whitelist = %self.whitelist.path().display(),
            update_interval_secs = self.config.update_interval_secs,
            metric_interval_secs = self.config.metric_interval_secs,
            "whitelist reconciler starting"
        );

        if self.monitor.is_enabled() {
            self.monitor
                .emit_event(Severity::Info, EVENT_TITLE, "whitelist reconciler started")
                .await;
        }

        self.run_cycle().await;

        let mut update_timer =
            tokio::time::interval(Duration::from_secs(self.config.update_interval_secs.max(1)));
        let mut metric_timer =
            tokio::time::interval(Duration::from_secs(self.config.metric_interval_secs.max(1)));

        // Skip the immediate first tick of each timer; the initial
        // reconciliation above already covered it.
        update_timer.tick().await;
        metric_timer.tick().await;

        loop {
            tokio::select! {
                biased;

                signal = shutdown.recv() => {
                    match signal {
                        Ok(Signal::Shutdown) => {
                            tracing::info!("reconciler received shutdown signal");
                        }
                        Err(error) => {
                            tracing::error!(%error, "reconciler shutdown channel error");
                        }
                    }
                    break;
                }
                _ = update_timer.tick() => {
                    self.run_cycle().await;
                }
                _ = metric_timer.tick() => {
                    self.periodic_metric_emit().await;
                }
            }
        }

        tracing::info!("reconciler stopped");
    }

    async fn run_cycle(&mut self) {
        match self.reconcile_once().await {
            Ok(ReconcileOutcome::Unchanged) => {}
            Ok(ReconcileOutcome::Updated {
                ip_count,
                reload_ok,
            }) => {
                tracing::info!(ip_count, reload_ok, "whitelist reconciled");
            }
            Err(error) => {
                tracing::error!(operation = "reconcile", %error, "reconciliation cycle failed");
            }
        }
    }
}
