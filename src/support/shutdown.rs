//! Graceful shutdown of the OCHP node
//!
//! A single stop flag, shared by the SOAP listener, the sweep task and the
//! event log. The flag is a `watch` channel, so tasks that start waiting
//! after the stop was requested still return at once.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Cloneable stop flag.
#[derive(Clone)]
pub struct ShutdownSignal {
    stop: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self { stop: Arc::new(stop) }
    }

    pub fn is_triggered(&self) -> bool {
        *self.stop.borrow()
    }

    /// Request the stop. Repeated calls are no-ops.
    pub fn trigger(&self) {
        if !self.stop.send_replace(true) {
            info!("🛑 OCHP node stop requested");
        }
    }

    pub async fn wait(&self) {
        self.notified().wait().await;
    }

    /// Take a receiver now and await it later, e.g. inside a spawned task.
    pub fn notified(&self) -> ShutdownNotified {
        ShutdownNotified {
            stop: self.stop.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ShutdownNotified {
    stop: watch::Receiver<bool>,
}

impl ShutdownNotified {
    pub async fn wait(mut self) {
        // Err: every signal clone was dropped.
        let _ = self.stop.wait_for(|stopped| *stopped).await;
    }
}

/// Trigger `shutdown` on SIGTERM or SIGINT (Ctrl+C elsewhere).
pub async fn listen_for_shutdown_signals(shutdown: ShutdownSignal) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = %e, "Cannot listen for stop signals");
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("📡 SIGTERM received"),
            _ = sigint.recv() => info!("📡 SIGINT received"),
        }
        shutdown.trigger();
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl+C");
            return;
        }
        info!("📡 Ctrl+C received");
        shutdown.trigger();
    }
}

/// Owns the stop flag and the drain deadline for background tasks.
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    drain_timeout: Duration,
}

impl ShutdownCoordinator {
    /// `drain_secs` bounds how long in-flight SOAP exchanges and the
    /// background tasks get after the stop.
    pub fn new(drain_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            drain_timeout: Duration::from_secs(drain_secs),
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn start_signal_listener(&self) {
        tokio::spawn(listen_for_shutdown_signals(self.signal.clone()));
    }

    /// Wait for the stop, then run `drain` until it finishes or the drain
    /// timeout passes. Returns `false` when tasks were left running.
    pub async fn shutdown_with_cleanup<Fut>(&self, drain: Fut) -> bool
    where
        Fut: Future<Output = ()>,
    {
        self.signal.wait().await;
        info!(timeout_secs = self.drain_timeout.as_secs(), "⏳ Draining OCHP node");

        match tokio::time::timeout(self.drain_timeout, drain).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    timeout_secs = self.drain_timeout.as_secs(),
                    "⚠️ Drain timed out, abandoning remaining tasks"
                );
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(30)
    }
}
