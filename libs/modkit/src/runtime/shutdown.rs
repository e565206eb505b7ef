use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Resolves on SIGTERM or Ctrl+C.
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?; // Ctrl+C
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(())
    }
}

/// Cancels `root` once a shutdown signal arrives. Returns immediately; the
/// returned handle ends when the token is cancelled either way.
pub fn cancel_on_shutdown(root: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_shutdown() => {
                match res {
                    Ok(()) => tracing::info!("shutdown signal received"),
                    Err(e) => tracing::warn!(error = %e, "signal handler failed; shutting down"),
                }
                root.cancel();
            }
            _ = root.cancelled() => {}
        }
    })
}
