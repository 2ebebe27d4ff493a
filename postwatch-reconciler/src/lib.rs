//! IP-range whitelist reconciler for a Postfix mail relay.
//!
//! A long-running loop that keeps a Postfix client-whitelist file in sync
//! with a third-party JSON feed of IP ranges:
//!
//! 1. fetch the feed and hash the raw body for change detection
//! 2. on change, extract the ranges tagged for outbound mail
//! 3. rewrite the whitelist file (backing up the previous version)
//! 4. reload Postfix
//! 5. persist the new hash and count
//! 6. emit a notification and gauge metrics to the monitoring backend
//!
//! A second, independent interval re-emits the gauges between
//! reconciliations so dashboards have continuous data points. No error in a
//! cycle is fatal; a failed cycle waits for the next scheduled tick.
//!
//! Exactly one reconciler instance is assumed to run against a given
//! whitelist and state file; nothing enforces this with locks, so
//! deployments must not run two.

mod config;
mod error;
mod feed;
mod monitor;
mod service;
mod state;
mod whitelist;

pub use config::ReconcilerConfig;
pub use error::{FetchError, ReconcileError};
pub use feed::{FeedClient, FeedDocument, FeedOutcome, IpRangeRecord, extract_ip_ranges};
pub use monitor::{MonitorClient, Severity};
pub use service::{ReconcileOutcome, Reconciler};
pub use state::ReconcileState;
pub use whitelist::WhitelistFile;
