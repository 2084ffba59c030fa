//! Out-of-band notification dispatch.
//!
//! Runs in a dedicated thread using `edge-executor` with
//! `async-io-mini` timers for the retry backoff, so a slow or failing
//! sink never touches the control loop's timeline.
//!
//! Retry backoff doubles from `initial` up to `cap`; a notification is
//! abandoned after `max_attempts` deliveries.  On shutdown the queue is
//! drained once before the thread exits.

use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};

use super::{Notification, NotificationQueue};
use crate::app::ports::NotificationSink;
use crate::error::NotifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial: Duration::from_secs(2),
            cap: Duration::from_secs(60),
        }
    }
}

/// Exponential backoff (2 s → 4 s → 8 s … capped).
#[derive(Debug, Clone)]
pub struct Backoff {
    delay: Duration,
    cap: Duration,
    retries_left: u32,
}

impl Backoff {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            delay: policy.initial,
            cap: policy.cap,
            retries_left: policy.max_attempts.saturating_sub(1),
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.retries_left == 0 {
            return None;
        }
        self.retries_left -= 1;
        let d = self.delay;
        self.delay = (self.delay * 2).min(self.cap);
        Some(d)
    }
}

/// Totals reported when the dispatcher stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    pub delivered: u32,
    pub failed: u32,
}

impl DispatchStats {
    fn record(&mut self, result: Result<(), NotifyError>) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(_) => self.failed += 1,
        }
    }
}

type Shutdown = Signal<CriticalSectionRawMutex, ()>;

/// Deliver one notification, retrying transient failures with backoff.
pub async fn deliver_with_retry<S: NotificationSink>(
    sink: &mut S,
    notification: &Notification,
    policy: &RetryPolicy,
) -> Result<(), NotifyError> {
    let mut backoff = Backoff::new(policy);
    loop {
        match sink.deliver(notification) {
            Ok(()) => return Ok(()),
            Err(NotifyError::NoEndpoint) => return Err(NotifyError::NoEndpoint),
            Err(e) => {
                let Some(delay) = backoff.next() else {
                    warn!("notify: giving up on {}: {e}", notification.summary());
                    return Err(NotifyError::RetriesExhausted);
                };
                warn!(
                    "notify: {} failed ({e}), retry in {}ms",
                    notification.summary(),
                    delay.as_millis()
                );
                if !delay.is_zero() {
                    async_io_mini::Timer::after(delay).await;
                }
            }
        }
    }
}

async fn dispatch_loop<S: NotificationSink>(
    queue: NotificationQueue,
    mut sink: S,
    policy: RetryPolicy,
    shutdown: Arc<Shutdown>,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    loop {
        let next = futures_lite::future::or(async { Some(queue.receive().await) }, async {
            shutdown.wait().await;
            None
        })
        .await;
        let Some(n) = next else { break };
        let r = deliver_with_retry(&mut sink, &n, &policy).await;
        stats.record(r);
    }

    while let Some(n) = queue.try_receive() {
        let r = deliver_with_retry(&mut sink, &n, &policy).await;
        stats.record(r);
    }
    info!(
        "notify: dispatcher stopped ({} delivered, {} failed)",
        stats.delivered, stats.failed
    );
    stats
}

/// Running dispatcher thread.
pub struct Dispatcher {
    shutdown: Arc<Shutdown>,
    join: JoinHandle<DispatchStats>,
}

impl Dispatcher {
    /// Spawn the dispatch thread draining `queue` into `sink`.
    pub fn spawn<S>(queue: NotificationQueue, sink: S, policy: RetryPolicy) -> anyhow::Result<Self>
    where
        S: NotificationSink + Send + 'static,
    {
        let shutdown = Arc::new(Shutdown::new());
        let signal = shutdown.clone();
        let join = std::thread::Builder::new()
            .name("notify-dispatch".into())
            .spawn(move || {
                let executor: edge_executor::LocalExecutor<'_, 2> =
                    edge_executor::LocalExecutor::new();
                futures_lite::future::block_on(
                    executor.run(dispatch_loop(queue, sink, policy, signal)),
                )
            })?;
        info!("notify: dispatcher started");
        Ok(Self { shutdown, join })
    }

    /// Flush what is queued and stop the thread.
    pub fn stop(self) -> DispatchStats {
        self.shutdown.signal(());
        self.join.join().unwrap_or_else(|_| {
            warn!("notify: dispatcher thread panicked");
            DispatchStats::default()
        })
    }
}
