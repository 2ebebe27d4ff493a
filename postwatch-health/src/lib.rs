//! HTTP health reporter for a Postfix mail relay.
//!
//! Exposes the relay's health over HTTP for external monitors. Each request
//! shells out to the Postfix control utilities, aggregates three boolean
//! checks into an overall health verdict, and serialises the result as JSON.
//!
//! # Endpoints
//!
//! - **`/`** - Service descriptor listing the available endpoints
//! - **`/postfix`** - Binary health: 200 when all checks pass, 503 otherwise
//! - **`/status`** - Verbose status: raw command output and file metadata,
//!   always 200
//!
//! The server never fails a request because a control utility is missing or
//! erroring; the affected check simply reports unhealthy. The only
//! unrecoverable condition is failing to bind the listening port.

mod checker;
mod config;
mod error;
mod report;
mod server;

pub use checker::{HealthChecker, HealthSnapshot};
pub use config::HealthConfig;
pub use error::HealthError;
pub use report::{ConfigFileInfo, FilesPresent, PostfixReport, ProcessInfo, QueueStats, StatusReport};
pub use server::HealthServer;
