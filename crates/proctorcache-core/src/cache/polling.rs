//! Fixed-interval re-fetching as an explicit, cancellable subscription.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::query::{QueryCache, QueryKey};
use crate::api::ApiError;

/// Shortest period a subscription will poll at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to a running polling loop.
///
/// Dropping the handle does not stop the loop; call [`Subscription::cancel`].
pub struct Subscription {
    key: QueryKey,
    interval: Duration,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop scheduling ticks. A load already started by the current tick
    /// still delivers its result. Calling this more than once is a no-op.
    pub fn cancel(&self) {
        if !self.cancel_tx.send_replace(true) {
            debug!(key = %self.key, "Polling cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Cancel and wait for the loop to finish.
    pub async fn shutdown(self) {
        self.cancel();
        if let Err(e) = self.task.await {
            warn!(key = %self.key, error = %e, "Polling task ended abnormally");
        }
    }
}

/// Run `loader` every `interval` and hand every successful result to
/// `callback`, changed or not. The first tick fires one interval after
/// subscribing. Load failures are logged and skipped. Intervals below
/// [`MIN_POLL_INTERVAL`] are raised to it.
///
/// Must be called from within a tokio runtime.
pub fn subscribe<T, L, Fut, C>(
    key: QueryKey,
    interval: Duration,
    mut loader: L,
    mut callback: C,
) -> Subscription
where
    T: Send + 'static,
    L: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    C: FnMut(T) + Send + 'static,
{
    let interval = if interval < MIN_POLL_INTERVAL {
        warn!(%key, requested_ms = interval.as_millis() as u64, "Polling interval too short, clamping");
        MIN_POLL_INTERVAL
    } else {
        interval
    };
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    let task_key = key.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Cleared when the handle is dropped; the loop keeps running
        let mut watching = true;

        loop {
            tokio::select! {
                biased;
                changed = cancel_rx.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                    }
                    if *cancel_rx.borrow_and_update() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            match loader().await {
                Ok(data) => callback(data),
                Err(e) => warn!(key = %task_key, error = %e, "Polling load failed"),
            }
        }
        debug!(key = %task_key, "Polling loop stopped");
    });

    debug!(%key, interval_ms = interval.as_millis() as u64, "Polling subscribed");
    Subscription {
        key,
        interval,
        cancel_tx,
        task,
    }
}

/// Poll `loader` and write every snapshot into `cache` under `key`, so
/// regular reads see the latest data.
pub fn poll_into_cache<T, L, Fut>(
    cache: Arc<QueryCache>,
    key: QueryKey,
    interval: Duration,
    loader: L,
) -> Subscription
where
    T: Send + Sync + 'static,
    L: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let cache_key = key.clone();
    subscribe(key, interval, loader, move |data: T| {
        if let Err(e) = cache.set_data(&cache_key, data) {
            warn!(key = %cache_key, error = %e, "Dropping polled snapshot");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(5);

    fn counter_subscription(count: &Arc<AtomicUsize>) -> Subscription {
        let count = Arc::clone(count);
        subscribe(
            QueryKey::new("submissions").with("a1"),
            INTERVAL,
            || async { Ok(()) },
            move |()| {
                count.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_once_per_tick_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let sub = counter_subscription(&count);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        sub.cancel();
        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(sub.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let count = Arc::new(AtomicUsize::new(0));
        let sub = counter_subscription(&count);
        sub.cancel();
        sub.cancel();
        sub.shutdown().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_load_still_delivers_after_cancel() {
        let count = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::clone(&count);
        let sub = subscribe(
            QueryKey::new("slow"),
            INTERVAL,
            || async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(1u8)
            },
            move |_| {
                delivered.fetch_add(1, Ordering::SeqCst);
            },
        );

        // First tick at 5s, load finishes at 7s
        tokio::time::sleep(Duration::from_secs(6)).await;
        sub.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_loads_are_skipped() {
        let count = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::clone(&count);
        let mut calls = 0u32;
        let sub = subscribe(
            QueryKey::new("flaky"),
            INTERVAL,
            move || {
                calls += 1;
                let fail = calls == 2;
                async move {
                    if fail {
                        Err(ApiError::transport("timeout"))
                    } else {
                        Ok(())
                    }
                }
            },
            move |()| {
                delivered.fetch_add(1, Ordering::SeqCst);
            },
        );
        tokio::time::sleep(INTERVAL * 3 + Duration::from_millis(100)).await;
        sub.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let count = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::clone(&count);
        let sub = subscribe(
            QueryKey::new("k"),
            Duration::ZERO,
            || async { Ok(()) },
            move |()| {
                delivered.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert_eq!(sub.interval(), MIN_POLL_INTERVAL);

        tokio::time::sleep(MIN_POLL_INTERVAL * 2 + Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        sub.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_into_cache_refreshes_entry() {
        let cache = Arc::new(QueryCache::new());
        let key = QueryKey::new("submissions").with("a1");
        let mut tick = 0u32;
        let sub = poll_into_cache(Arc::clone(&cache), key.clone(), INTERVAL, move || {
            tick += 1;
            let snapshot = vec![tick];
            async move { Ok(snapshot) }
        });

        tokio::time::sleep(INTERVAL * 2 + Duration::from_millis(100)).await;
        sub.cancel();
        assert_eq!(cache.read::<Vec<u32>>(&key), Some(vec![2]));
    }
}
