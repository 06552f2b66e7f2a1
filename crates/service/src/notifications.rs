//! Background poller for pending appointments.
//!
//! Ticks at a fixed interval, asks the marketplace for the session user's
//! pending appointments, and publishes the count on a `watch` channel.
//! Failures are logged and the next tick tries again; there is no backoff.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use models::appointment::AppointmentStatus;

use crate::marketplace::Marketplace;

pub struct NotificationPoller {
    pending: watch::Receiver<usize>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl NotificationPoller {
    /// Spawn the polling task. The first poll runs immediately. The task holds
    /// only a weak reference and exits once the marketplace is gone.
    pub fn start(market: Weak<Marketplace>, every: Duration) -> Self {
        let (tx, rx) = watch::channel(0usize);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let Some(market) = market.upgrade() else { break };
                        match market.get_appointments(Some(AppointmentStatus::Pending)).await {
                            Ok(pending) => {
                                debug!(pending = pending.len(), "pending appointments polled");
                                tx.send_replace(pending.len());
                            }
                            Err(e) => warn!(error = %e, "notification poll failed"),
                        }
                    }
                }
            }
            debug!("notification poller exited");
        });

        Self { pending: rx, shutdown: Some(stop_tx), handle: Some(handle) }
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.pending.clone()
    }

    /// Last published pending count.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Signal the task and wait for it to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "notification poller did not stop cleanly");
            }
        }
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
