//! Shared foundation for the postwatch sidecars.
//!
//! Both daemons in this workspace (the health reporter and the whitelist
//! reconciler) drive the same external Postfix installation through its
//! control utilities. This crate holds what they share: the subprocess seam
//! ([`mta`]), the queue-listing parser ([`queue`]), environment-variable
//! helpers ([`env`]), logging initialisation ([`logging`]), and process
//! shutdown signalling ([`shutdown`]).

pub mod env;
pub mod logging;
pub mod mta;
pub mod queue;
pub mod shutdown;

/// Broadcast payload used to fan shutdown out to long-running tasks.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
}
