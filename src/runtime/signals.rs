use std::{future::Future, io};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Ждёт сигнала завершения процесса (Ctrl-C, SIGTERM).
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = sigterm.recv() => Ok(()),
    }
}

/// Ждёт сигнала завершения процесса (Ctrl-C).
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Отменяет `token`, когда `signal` сообщает о сигнале завершения.
///
/// Если обработчик сигнала установить не удалось, токен не трогается:
/// ретранслятор продолжает работу, остановить его можно только извне.
pub async fn cancel_on_signal<F>(
    signal: F,
    token: CancellationToken,
) where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("shutdown signal received");
            token.cancel();
        }
        Err(e) => warn!(error = %e, "unable to listen for shutdown signal"),
    }
}
