//! Process shutdown signalling.

use tokio::sync::broadcast;

use crate::Signal;

/// Wait for SIGINT or SIGTERM, then broadcast [`Signal::Shutdown`].
///
/// Intended to be spawned once per daemon; every long-running task holds a
/// subscriber and winds down when the signal arrives.
///
/// # Errors
/// Returns an error if the terminate signal handler cannot be installed.
pub async fn notify_on_signal(sender: broadcast::Sender<Signal>) -> std::io::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
        _ = terminate.recv() => {
            tracing::info!("terminate signal received, shutting down");
        }
    }

    let _ = sender.send(Signal::Shutdown);
    Ok(())
}
