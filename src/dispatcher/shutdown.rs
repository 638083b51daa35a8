//! Installs SIGINT/SIGTERM handlers that cancel the dispatcher's shutdown
//! token, so `Dispatcher::run` drains in-flight workers instead of exiting
//! mid-message.

use std::thread;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{EngineError, Result};

/// Runs before `init_logging` on some startup paths, ahead of the
/// `tracing` subscriber.
fn note_handler_installed() {
    log::debug!("SIGINT/SIGTERM handler installed");
}

/// Spawn a background thread watching SIGINT/SIGTERM and cancel `token` on
/// either. Returns once the handler is installed; the watcher thread runs
/// for the lifetime of the process.
pub fn install_shutdown_handler(token: CancellationToken) -> Result<()> {
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])
    .map_err(|err| EngineError::other(format!("failed to install signal handler: {err}")))?;

    thread::spawn(move || {
        if signals.forever().next().is_some() {
            info!("shutdown signal received, cancelling dispatcher");
            token.cancel();
        }
    });

    note_handler_installed();
    Ok(())
}
