//! Keyed in-memory query cache with stale-time tracking and in-flight
//! fetch deduplication.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::utils::format_age;

/// Stale time used by `set_data` for keys that were never fetched.
/// Five minutes matches the typed queries; see `queries::STALE_TIME`.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// Keys
// ============================================================================

/// One primitive component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Str(s) => write!(f, "{:?}", s),
            KeyPart::Int(n) => write!(f, "{}", n),
            KeyPart::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Tuple of primitives identifying a cached query, e.g.
/// `("submissions", "a1")`. Keys are equal iff structurally equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new(name: &str) -> Self {
        Self(vec![KeyPart::from(name)])
    }

    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// True when `prefix` matches the leading parts of this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", part)?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// State exposed to readers
// ============================================================================

/// Snapshot of one key: last-known-good data plus loading and error flags.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    /// A fetch is running and there is no data to show yet.
    pub is_loading: bool,
    /// A fetch is running, with or without data.
    pub is_fetching: bool,
    pub is_stale: bool,
    /// Error from the most recent fetch, kept alongside older data.
    pub error: Option<ApiError>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_fetching: false,
            is_stale: true,
            error: None,
            updated_at: None,
        }
    }
}

impl<T> QueryState<T> {
    /// "just now", "5m ago", ... since the data was last written.
    pub fn age_display(&self) -> Option<String> {
        self.updated_at
            .map(|at| format_age((Utc::now() - at).num_minutes()))
    }
}

// ============================================================================
// Cache
// ============================================================================

type Payload = Arc<dyn Any + Send + Sync>;
type SharedLoad = Shared<BoxFuture<'static, Result<Payload, ApiError>>>;

struct InFlight {
    id: u64,
    load: SharedLoad,
}

struct Entry {
    data: Option<Payload>,
    /// Monotonic time of the last write; `None` once invalidated.
    fetched_at: Option<Instant>,
    /// Monotonic time of the last write, kept across invalidation.
    written_at: Option<Instant>,
    updated_at: Option<DateTime<Utc>>,
    stale_time: Duration,
    error: Option<ApiError>,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn new(stale_time: Duration) -> Self {
        Self {
            data: None,
            fetched_at: None,
            written_at: None,
            updated_at: None,
            stale_time,
            error: None,
            in_flight: None,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        match self.fetched_at {
            Some(at) => self.data.is_some() && now.duration_since(at) < self.stale_time,
            None => false,
        }
    }

    fn store(&mut self, data: Payload) {
        let now = Instant::now();
        self.data = Some(data);
        self.fetched_at = Some(now);
        self.written_at = Some(now);
        self.updated_at = Some(Utc::now());
        self.error = None;
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    disposed: bool,
}

/// Shared store of fetched query results.
///
/// Construct one per application and hand out `Arc<QueryCache>`; there is no
/// global instance. Reads never block on a fetch. The internal lock is
/// never held across an await or while a loader runs.
#[derive(Default)]
pub struct QueryCache {
    inner: Mutex<Inner>,
    next_fetch_id: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave an entry half-written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return fresh cached data for `key`, join a fetch already in flight,
    /// or run `loader` and store its result.
    ///
    /// Concurrent callers for the same key share one underlying load. A
    /// failed load keeps any previous data and records the error. `loader`
    /// is first called once the cache lock is released, so it may read the
    /// cache itself.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        loader: F,
    ) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (fetch_id, load) = {
            let mut inner = self.lock();
            if inner.disposed {
                return Err(ApiError::Disposed);
            }
            let entry = inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(stale_time));
            entry.stale_time = stale_time;

            if entry.is_fresh(Instant::now()) {
                if let Some(data) = &entry.data {
                    debug!(%key, "Cache hit");
                    return downcast(key, data);
                }
            }

            let joined = entry
                .in_flight
                .as_ref()
                .map(|in_flight| (in_flight.id, in_flight.load.clone()));
            match joined {
                Some(joined) => {
                    debug!(%key, "Joining in-flight fetch");
                    joined
                }
                None => {
                    debug!(%key, "Cache miss, fetching");
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let load = async move { loader().await.map(|data| Arc::new(data) as Payload) }
                        .boxed()
                        .shared();
                    entry.in_flight = Some(InFlight {
                        id,
                        load: load.clone(),
                    });
                    (id, load)
                }
            }
        };

        let result = load.await;
        self.settle(key, fetch_id, &result);
        result.and_then(|data| downcast(key, &data))
    }

    /// Record the outcome of fetch `fetch_id`. Only the first waiter of the
    /// matching fetch writes; later waiters find the slot already cleared.
    fn settle(&self, key: &QueryKey, fetch_id: u64, result: &Result<Payload, ApiError>) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        let Some(entry) = inner.entries.get_mut(key) else {
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.id) != Some(fetch_id) {
            return;
        }
        entry.in_flight = None;
        match result {
            Ok(data) => entry.store(Arc::clone(data)),
            Err(e) => {
                warn!(%key, error = %e, "Fetch failed");
                entry.error = Some(e.clone());
            }
        }
    }

    /// Cached data for `key`, fresh or stale.
    pub fn read<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let inner = self.lock();
        let data = inner.entries.get(key)?.data.as_ref()?;
        match data.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                warn!(%key, "Cached data has a different type than requested");
                None
            }
        }
    }

    /// Full reader-facing state for `key`. Unknown keys yield the default
    /// (empty, not loading) state.
    pub fn state<T: Clone + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let inner = self.lock();
        let Some(entry) = inner.entries.get(key) else {
            return QueryState::default();
        };
        let data = entry
            .data
            .as_ref()
            .and_then(|d| d.downcast_ref::<T>())
            .cloned();
        let is_fetching = entry.in_flight.is_some();
        QueryState {
            is_loading: is_fetching && data.is_none(),
            is_fetching,
            is_stale: !entry.is_fresh(Instant::now()),
            error: entry.error.clone(),
            updated_at: entry.updated_at,
            data,
        }
    }

    /// Write `data` under `key` as if freshly fetched.
    pub fn set_data<T>(&self, key: &QueryKey, data: T) -> Result<(), ApiError>
    where
        T: Send + Sync + 'static,
    {
        let mut inner = self.lock();
        if inner.disposed {
            return Err(ApiError::Disposed);
        }
        inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(DEFAULT_STALE_TIME))
            .store(Arc::new(data));
        debug!(%key, "Cache data set");
        Ok(())
    }

    /// Modify the cached value for `key` in place. Returns false when the key
    /// holds no data of type `T`; no entry is ever created.
    pub fn update<T, F>(&self, key: &QueryKey, f: F) -> bool
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&mut T),
    {
        let mut inner = self.lock();
        if inner.disposed {
            return false;
        }
        let Some(entry) = inner.entries.get_mut(key) else {
            return false;
        };
        let Some(current) = entry.data.as_ref().and_then(|d| d.downcast_ref::<T>()) else {
            return false;
        };
        let mut next = current.clone();
        f(&mut next);
        entry.store(Arc::new(next));
        true
    }

    /// Every cached key that starts with `prefix`.
    pub fn keys_matching(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        let inner = self.lock();
        let mut keys: Vec<QueryKey> = inner
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Mark `key` stale so the next fetch reloads. Data stays readable.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut inner = self.lock();
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.fetched_at = None;
                debug!(%key, "Cache entry invalidated");
                true
            }
            None => false,
        }
    }

    /// Drop entries not written within `max_age`. Entries with a fetch in
    /// flight are kept. Returns the number removed.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| {
            entry.in_flight.is_some()
                || entry
                    .written_at
                    .is_some_and(|at| now.duration_since(at) < max_age)
        });
        let evicted = before - inner.entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted old cache entries");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and refuse further fetches and writes. Loads still
    /// in flight complete for their current waiters but are not stored.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        inner.disposed = true;
        inner.entries.clear();
        debug!("Query cache disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

fn downcast<T: Clone + 'static>(key: &QueryKey, data: &Payload) -> Result<T, ApiError> {
    data.downcast_ref::<T>().cloned().ok_or_else(|| {
        ApiError::validation(format!("cached data for {} has a different type", key))
    })
}
