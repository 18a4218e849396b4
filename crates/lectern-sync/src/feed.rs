//! The change-feed cache layer shared by every listener.
//!
//! [`subscribe`] wires a store query to a callback: a fresh cached snapshot
//! is delivered synchronously, then a background task refetches whenever the
//! store announces a matching change, spaced out by a debounce gate so a
//! burst of writes coalesces into one delivery carrying only the final
//! state. Intermediate states are deliberately discarded — callers must not
//! assume every value is observed.

use std::{
  collections::HashMap,
  future::Future,
  sync::Arc,
  time::{Duration, Instant},
};

use lectern_core::store::{ChangeNotice, Collection};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use tokio::{
  sync::broadcast,
  task::JoinHandle,
};

// ─── Snapshot cache ──────────────────────────────────────────────────────────

struct CacheEntry {
  snapshot:  serde_json::Value,
  stored_at: Instant,
}

/// Process-wide cache of the last snapshot delivered per query key.
///
/// Stored as JSON so heterogeneous query results share one map. Constructed
/// once per [`Classroom`](crate::Classroom) and passed by reference into
/// every service — never a global.
pub struct SnapshotCache {
  ttl:     Duration,
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SnapshotCache {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      entries: Mutex::new(HashMap::new()),
    }
  }

  /// The cached snapshot for `key`, if present and within the TTL.
  pub fn get_fresh<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let entries = self.entries.lock();
    let entry = entries.get(key)?;
    if entry.stored_at.elapsed() > self.ttl {
      return None;
    }
    match serde_json::from_value(entry.snapshot.clone()) {
      Ok(value) => Some(value),
      Err(err) => {
        tracing::warn!(key, %err, "discarding undecodable cache snapshot");
        None
      }
    }
  }

  /// Store `value` under `key`, refreshing the entry's timestamp.
  pub fn put<T: Serialize>(&self, key: &str, value: &T) {
    match serde_json::to_value(value) {
      Ok(snapshot) => {
        self.entries.lock().insert(key.to_owned(), CacheEntry {
          snapshot,
          stored_at: Instant::now(),
        });
      }
      Err(err) => tracing::warn!(key, %err, "failed to encode cache snapshot"),
    }
  }

  /// Drop the entry for `key`. Writers call this so the next read after a
  /// local write is never served a stale snapshot.
  pub fn invalidate(&self, key: &str) { self.entries.lock().remove(key); }
}

// ─── Options and filter ──────────────────────────────────────────────────────

/// Per-subscription tuning.
#[derive(Debug, Clone)]
pub struct FeedOptions {
  /// Minimum spacing between deliveries; bursts inside the window coalesce.
  pub max_wait:  Duration,
  /// Serve a fresh cached snapshot synchronously on subscribe.
  pub use_cache: bool,
}

impl Default for FeedOptions {
  fn default() -> Self {
    Self {
      max_wait:  Duration::from_secs(2),
      use_cache: true,
    }
  }
}

/// Which change notices concern a subscription.
#[derive(Debug, Clone)]
pub struct FeedFilter {
  collections: Vec<Collection>,
  scope:       Option<String>,
}

impl FeedFilter {
  pub fn new(collections: impl Into<Vec<Collection>>, scope: Option<String>) -> Self {
    Self {
      collections: collections.into(),
      scope,
    }
  }

  pub fn one(collection: Collection, scope: Option<String>) -> Self {
    Self::new(vec![collection], scope)
  }

  fn matches(&self, notice: &ChangeNotice) -> bool {
    self
      .collections
      .iter()
      .any(|c| notice.matches(*c, self.scope.as_deref()))
  }
}

// ─── Debounce gate ───────────────────────────────────────────────────────────

/// Minimum-spacing gate between deliveries.
///
/// Idle until the first delivery; on a later notice, delivers immediately if
/// the window has elapsed, otherwise sleeps out the remainder. The one
/// timer/state-machine shared by every listener.
struct Debounce {
  max_wait: Duration,
  last:     Option<Instant>,
}

impl Debounce {
  fn new(max_wait: Duration) -> Self {
    Self { max_wait, last: None }
  }

  /// Wait until the next delivery is allowed.
  async fn gate(&mut self) {
    if let Some(last) = self.last {
      let elapsed = last.elapsed();
      if elapsed < self.max_wait {
        tokio::time::sleep(self.max_wait - elapsed).await;
      }
    }
  }

  fn mark_delivered(&mut self) { self.last = Some(Instant::now()); }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// Cancellation handle for a live subscription.
///
/// [`unsubscribe`](Self::unsubscribe) stops the background task, cancelling
/// any pending debounce timer; calling it twice (or after drop) is harmless.
pub struct FeedHandle {
  task: JoinHandle<()>,
}

impl FeedHandle {
  pub fn unsubscribe(&self) { self.task.abort(); }
}

impl Drop for FeedHandle {
  fn drop(&mut self) { self.task.abort(); }
}

/// Subscribe `on_update` to the query behind `fetch`.
///
/// Delivery rules:
/// - if `opts.use_cache` and a fresh snapshot exists, it is delivered
///   synchronously before this function returns;
/// - the query is fetched once immediately, then refetched after every
///   matching change notice, gated by `opts.max_wait`;
/// - a failed fetch (or a closed feed) delivers `T::default()` and logs a
///   warning rather than leaving the caller hanging; the subscription is not
///   retried automatically.
///
/// Every successful delivery refreshes the cache entry for `key`.
pub fn subscribe<T, E, F, Fut, U>(
  cache: Arc<SnapshotCache>,
  changes: broadcast::Receiver<ChangeNotice>,
  key: String,
  filter: FeedFilter,
  fetch: F,
  on_update: U,
  opts: FeedOptions,
) -> FeedHandle
where
  T: Serialize + DeserializeOwned + Default + Send + 'static,
  E: std::fmt::Display + Send + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, E>> + Send + 'static,
  U: Fn(T) + Send + Sync + 'static,
{
  if opts.use_cache
    && let Some(snapshot) = cache.get_fresh::<T>(&key)
  {
    tracing::debug!(%key, "serving cached snapshot");
    on_update(snapshot);
  }

  let task = tokio::spawn(run_subscription(
    cache,
    changes,
    key,
    filter,
    fetch,
    on_update,
    opts.max_wait,
  ));
  FeedHandle { task }
}

async fn run_subscription<T, E, F, Fut, U>(
  cache: Arc<SnapshotCache>,
  mut changes: broadcast::Receiver<ChangeNotice>,
  key: String,
  filter: FeedFilter,
  fetch: F,
  on_update: U,
  max_wait: Duration,
) where
  T: Serialize + DeserializeOwned + Default + Send + 'static,
  E: std::fmt::Display + Send + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, E>> + Send + 'static,
  U: Fn(T) + Send + Sync + 'static,
{
  let mut debounce = Debounce::new(max_wait);
  deliver(&cache, &key, &fetch, &on_update, &mut debounce).await;

  loop {
    match changes.recv().await {
      Ok(notice) if filter.matches(&notice) => {}
      Ok(_) => continue,
      Err(broadcast::error::RecvError::Lagged(skipped)) => {
        // Notices carry no payload, so a refetch recovers everything.
        tracing::debug!(%key, skipped, "change feed lagged; refetching");
      }
      Err(broadcast::error::RecvError::Closed) => {
        tracing::warn!(%key, "change feed closed; delivering empty result");
        on_update(T::default());
        return;
      }
    }

    debounce.gate().await;
    drain(&mut changes);
    deliver(&cache, &key, &fetch, &on_update, &mut debounce).await;
  }
}

/// Fetch, cache, and deliver one snapshot; degrade to `T::default()` on
/// failure.
async fn deliver<T, E, F, Fut, U>(
  cache: &SnapshotCache,
  key: &str,
  fetch: &F,
  on_update: &U,
  debounce: &mut Debounce,
) where
  T: Serialize + DeserializeOwned + Default,
  E: std::fmt::Display,
  F: Fn() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  U: Fn(T),
{
  match fetch().await {
    Ok(value) => {
      cache.put(key, &value);
      debounce.mark_delivered();
      on_update(value);
    }
    Err(err) => {
      tracing::warn!(key, %err, "feed query failed; delivering empty result");
      debounce.mark_delivered();
      on_update(T::default());
    }
  }
}

/// Discard any backlog so a burst inside the debounce window coalesces into
/// the single refetch that follows.
fn drain(rx: &mut broadcast::Receiver<ChangeNotice>) {
  loop {
    match rx.try_recv() {
      Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
      Err(broadcast::error::TryRecvError::Empty)
      | Err(broadcast::error::TryRecvError::Closed) => break,
    }
  }
}
