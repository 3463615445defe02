//! Interval poller publishing the active tab's pagination
//!
//! One background task per [`Subscription`]. The probe is awaited inline, so at
//! most one is in flight; ticks that come due while it is pending are skipped
//! rather than queued, which keeps out-of-order completions from overwriting a
//! newer value.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::probe::probe_active_tab;
use super::strategy::LayoutStrategies;
use super::Pagination;
use crate::host::PageHost;

#[derive(Clone)]
pub struct PagePoller {
    host: Arc<dyn PageHost>,
    strategies: Arc<LayoutStrategies>,
}

impl PagePoller {
    pub fn new(host: Arc<dyn PageHost>, strategies: LayoutStrategies) -> Self {
        Self {
            host,
            strategies: Arc::new(strategies),
        }
    }

    /// Start polling every `interval`; the first probe runs immediately
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self, interval: Duration) -> Subscription {
        let interval = interval.max(Duration::from_millis(1));
        let (sender, receiver) = watch::channel(Pagination::DEFAULT);
        let gate = Arc::new(PublishGate {
            stopped: Mutex::new(false),
            sender,
        });
        let cancel = CancellationToken::new();

        let task = tokio::spawn(poll_loop(
            self.host.clone(),
            self.strategies.clone(),
            gate.clone(),
            interval,
            cancel.clone(),
        ));
        info!(interval_ms = interval.as_millis() as u64, "page poller started");

        Subscription {
            receiver,
            gate,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Serializes publishing against `stop()`
///
/// `stop()` flips `stopped` under the same lock `publish()` checks it under, so
/// once `stop()` returns nothing more reaches subscribers.
struct PublishGate {
    stopped: Mutex<bool>,
    sender: watch::Sender<Pagination>,
}

impl PublishGate {
    /// Returns `false` once the subscription is stopped
    fn publish(&self, pagination: Pagination) -> bool {
        let stopped = self.stopped.lock();
        if *stopped {
            return false;
        }
        self.sender.send_if_modified(|current| {
            if *current == pagination {
                false
            } else {
                *current = pagination;
                true
            }
        });
        true
    }

    fn close(&self) -> bool {
        let mut stopped = self.stopped.lock();
        !std::mem::replace(&mut *stopped, true)
    }
}

/// Handle to a running poller
///
/// Dropping it stops the poller.
pub struct Subscription {
    receiver: watch::Receiver<Pagination>,
    gate: Arc<PublishGate>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    /// A receiver for published pagination
    pub fn subscribe(&self) -> watch::Receiver<Pagination> {
        self.receiver.clone()
    }

    /// Last published value
    pub fn current(&self) -> Pagination {
        *self.receiver.borrow()
    }

    /// Stop the timer; no publish happens after this returns
    ///
    /// A probe already in flight is left to finish and its result discarded.
    pub fn stop(&self) {
        if self.gate.close() {
            self.cancel.cancel();
            info!("page poller stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.gate.stopped.lock()
    }

    /// Stop and wait for the background task to exit
    ///
    /// Waits for an in-flight probe to settle; a hung probe hangs this too.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!("page poller task failed: {}", e);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    host: Arc<dyn PageHost>,
    strategies: Arc<LayoutStrategies>,
    gate: Arc<PublishGate>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let pagination = match probe_active_tab(host.as_ref(), &strategies).await {
            Ok(Some(measurement)) => Pagination::from_measurement(&measurement),
            Ok(None) => continue,
            Err(e) => {
                warn!("page probe failed, publishing default: {}", e);
                Pagination::DEFAULT
            }
        };

        if !gate.publish(pagination) {
            debug!(%pagination, "discarding probe that settled after stop");
            break;
        }
    }

    debug!("page poller loop exited");
}
