//! A single, process-wide cancellation token, owned by the Supervisor
//! and cloned into every loop that needs to observe it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Sleeps for `duration`, waking early if the token is set in the
    /// meantime. Mirrors `threading.Event.wait(timeout)`.
    pub async fn wait(&self, duration: Duration) {
        if self.is_set() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.until_set() => {}
        }
    }

    async fn until_set(&self) {
        loop {
            if self.is_set() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    /// Spawns the task that raises the flag on SIGINT (all platforms)
    /// and SIGTERM (Unix).
    pub fn install_signal_handlers(&self) {
        let token = self.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            token.set();
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler, watching SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down gracefully");
        }
        _ = terminate.recv() => {
            tracing::info!("received SIGTERM, shutting down gracefully");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received Ctrl+C, shutting down gracefully");
}
