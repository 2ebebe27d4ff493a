//! Reconciler error taxonomy.
//!
//! Every variant here is recoverable: the loop logs the failure and waits
//! for its next tick. A failed Postfix reload is deliberately not an error
//! (the whitelist on disk is already correct), and a failed notification is
//! swallowed inside the monitoring client.

use thiserror::Error;

/// Errors while fetching or decoding the remote feed.
///
/// All of these mean "no update this cycle"; none of them mutate local
/// state.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or timeout.
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The feed answered with a non-success status.
    #[error("feed returned status {0}")]
    Status(reqwest::StatusCode),

    /// The body was not the expected JSON document (including a missing
    /// top-level `items` list).
    #[error("malformed feed document: {0}")]
    MalformedFeed(#[from] serde_json::Error),
}

/// Errors aborting one reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The feed could not be fetched or decoded.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The feed changed but contained no ranges matching the filter. The
    /// whitelist is left untouched; an empty whitelist would block all
    /// clients.
    #[error("feed contained no matching IP ranges")]
    NoMatchingRanges,

    /// The whitelist file could not be written. No reload is attempted.
    #[error("failed to write whitelist: {0}")]
    Write(#[source] std::io::Error),
}
