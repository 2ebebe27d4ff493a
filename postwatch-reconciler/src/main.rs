use std::{sync::Arc, time::Duration};

use postwatch_common::mta::{MtaControl, PostfixCli};
use postwatch_reconciler::{Reconciler, ReconcilerConfig};
use tokio::sync::broadcast;

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    postwatch_common::logging::init();

    let config = ReconcilerConfig::from_env()?;
    let mta: Arc<dyn MtaControl> =
        Arc::new(PostfixCli::new(Duration::from_secs(config.command_timeout_secs)));
    let reconciler = Reconciler::new(config, mta)?;

    let (shutdown, receiver) = broadcast::channel(16);
    tokio::spawn(async move {
        if let Err(error) = postwatch_common::shutdown::notify_on_signal(shutdown).await {
            tracing::error!(%error, "failed to install signal handlers");
        }
    });

    reconciler.serve(receiver).await;
    Ok(())
}
