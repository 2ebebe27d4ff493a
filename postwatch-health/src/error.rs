//! Health reporter error types.

use thiserror::Error;

/// Errors that can occur while running the health reporter.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Failed to bind to the specified address. This aborts startup; it is
    /// the one condition the reporter does not recover from.
    #[error("failed to bind health server to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The server encountered a runtime error.
    #[error("health server error: {0}")]
    Server(String),

    /// The environment configuration could not be parsed.
    #[error(transparent)]
    Config(#[from] postwatch_common::env::EnvVarError),
}
