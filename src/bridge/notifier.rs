//! Receive notifier: polls the bus and dispatches frames to listeners.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::frame::CanMessage;
use crate::core::traits::{CanBus, FrameListener};

use super::stats::BridgeStats;

/// Pause after a receive error before polling again.
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Background task invoking listeners once per received frame.
///
/// The task runs on the tokio runtime, concurrently with the main loop.
/// Stopping it drops whatever is still queued on the bus.
pub struct Notifier {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Notifier {
    /// Spawn the receive task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<B>(
        bus: Arc<B>,
        listeners: Vec<Arc<dyn FrameListener>>,
        rx_poll_interval: Duration,
        stats: Arc<BridgeStats>,
    ) -> Self
    where
        B: CanBus + ?Sized + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let is_running = Arc::clone(&running);
        let period = rx_poll_interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            #[cfg(feature = "tracing-support")]
            tracing::info!(
                "Notifier started on {} ({} listeners, rx_poll_interval={:?})",
                bus.name(),
                listeners.len(),
                period
            );

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            'poll: loop {
                interval.tick().await;

                // Drain everything queued since the last tick.
                loop {
                    if !is_running.load(Ordering::SeqCst) {
                        break 'poll;
                    }

                    match bus.try_recv() {
                        Ok(Some(frame)) => {
                            stats.record_received();
                            dispatch(&listeners, &frame, &stats);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            #[cfg(feature = "tracing-support")]
                            tracing::error!("CAN receive error on {}: {}", bus.name(), e);

                            stats.record_error(&e);
                            tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                            break;
                        }
                    }
                }
            }

            #[cfg(feature = "tracing-support")]
            tracing::info!("Notifier stopped on {}", bus.name());
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Whether the receive task is still alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the receive task and wait for it to finish.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn dispatch(listeners: &[Arc<dyn FrameListener>], frame: &CanMessage, stats: &BridgeStats) {
    for listener in listeners {
        if let Err(e) = listener.on_frame(frame) {
            #[cfg(feature = "tracing-support")]
            tracing::warn!("Frame listener failed: {}", e);

            stats.record_error(&e);
        }
    }
}
