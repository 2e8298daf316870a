use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct Readiness {
    accepting: AtomicBool,
}

impl Readiness {
    pub fn new() -> Self {
        Self {
            accepting: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.accepting.load(Ordering::Relaxed)
    }

    pub fn set_ready(&self, ready: bool) {
        self.accepting.store(ready, Ordering::Relaxed);
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once SIGTERM or Ctrl-C arrives, after flipping readiness off and
/// letting load balancers observe it for `drain`.
pub async fn shutdown_signal(ready: Arc<Readiness>, drain: Duration) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    ready.set_ready(false);
    tracing::info!(drain_ms = drain.as_millis() as u64, "shutdown requested, draining");
    tokio::time::sleep(drain).await;
}
