//! Translation of process signals into loop cancellation, and teardown of
//! the telemetry pipeline once the loop has stopped.

use opentelemetry_configuration::OtelGuard;
use tokio_util::sync::CancellationToken;

/// Flushes and shuts down the telemetry providers.
///
/// Export failures at this point are logged and swallowed so a stop never
/// fails because the collector is unreachable. Returns `true` when every
/// provider shut down cleanly.
pub fn shutdown_telemetry(guard: OtelGuard) -> bool {
    match guard.shutdown() {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(
                target: "otel_lifecycle",
                error = %error,
                "Telemetry did not shut down cleanly"
            );
            false
        }
    }
}

/// Installs handlers for SIGINT and SIGTERM that cancel `token` on the first
/// signal received.
///
/// Handlers are registered before this returns, so a signal arriving
/// immediately afterwards is not missed.
///
/// # Errors
///
/// Returns an error if a handler cannot be registered.
#[cfg(unix)]
pub fn spawn_signal_handlers(token: CancellationToken) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down"),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
            _ = token.cancelled() => return,
        }
        token.cancel();
    });

    Ok(())
}

/// Installs a Ctrl-C handler that cancels `token`.
///
/// # Errors
///
/// Never fails on this platform; the signature matches the Unix variant.
#[cfg(not(unix))]
pub fn spawn_signal_handlers(token: CancellationToken) -> std::io::Result<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    tracing::warn!(%error, "Failed to listen for Ctrl-C");
                    return;
                }
                tracing::info!("Received Ctrl-C, shutting down");
            }
            _ = token.cancelled() => return,
        }
        token.cancel();
    });

    Ok(())
}


#[cfg(all(test, unix))]
mod signal_tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_handler_task_exits_on_external_cancel() {
        let token = CancellationToken::new();
        spawn_signal_handlers(token.clone()).unwrap();

        token.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(token.is_cancelled());
    }
}
