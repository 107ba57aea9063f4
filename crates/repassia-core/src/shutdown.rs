use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix;

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
///
/// Pass to `axum::serve(..).with_graceful_shutdown(..)`.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        } else {
            tracing::info!("received SIGINT, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
}
