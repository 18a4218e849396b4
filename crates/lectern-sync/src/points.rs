//! The points ledger: per-student non-negative running totals.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use lectern_core::{
  Error, Result,
  points::PointsRecord,
  store::{ClassStore, Collection},
};
use parking_lot::Mutex;

use crate::feed::{FeedFilter, FeedHandle, FeedOptions, SnapshotCache, subscribe};

pub(crate) fn feed_key(student_id: &str) -> String { format!("points/{student_id}") }

pub struct PointsLedger<S> {
  store:     Arc<S>,
  cache:     Arc<SnapshotCache>,
  /// Last total delivered per student, used to suppress duplicate callback
  /// invocations. Ledger-scoped, not a global.
  last_seen: Arc<Mutex<HashMap<String, i64>>>,
}

impl<S: ClassStore + 'static> PointsLedger<S> {
  pub fn new(store: Arc<S>, cache: Arc<SnapshotCache>) -> Self {
    Self {
      store,
      cache,
      last_seen: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Apply a signed delta to a student's total, flooring at zero.
  ///
  /// Read-modify-write, not a server-side atomic increment; concurrent
  /// adjustments for one student can race. Acceptable — awards are
  /// moderator-paced and rare per student per question.
  pub async fn adjust_points(&self, student_id: &str, delta: i64) -> Result<PointsRecord> {
    if student_id.trim().is_empty() {
      return Err(Error::InvalidArgument("student id must not be empty".into()));
    }

    let now = Utc::now();
    let mut record = self
      .store
      .get_points(student_id)
      .await
      .map_err(Error::store)?
      .unwrap_or_else(|| PointsRecord::zero(student_id, now));

    record.apply_delta(delta, now);
    self
      .store
      .put_points(record.clone())
      .await
      .map_err(Error::store)?;
    self.cache.invalidate(&feed_key(student_id));

    Ok(record)
  }

  /// The student's current total; zero when no record exists.
  pub async fn total(&self, student_id: &str) -> Result<i64> {
    Ok(
      self
        .store
        .get_points(student_id)
        .await
        .map_err(Error::store)?
        .map_or(0, |rec| rec.total),
    )
  }

  /// Live view of one student's record.
  ///
  /// Deliveries whose total matches the last one this ledger delivered for
  /// the student are suppressed, so a no-op write does not flicker the UI.
  /// Suppression is deliberately origin-blind: the store is the single
  /// authority on totals, so an identical total carries no new information
  /// whether the triggering write was ours or another process's.
  pub fn listen_points(
    &self,
    student_id: &str,
    on_update: impl Fn(Option<PointsRecord>) + Send + Sync + 'static,
    opts: FeedOptions,
  ) -> FeedHandle {
    let store = Arc::clone(&self.store);
    let last_seen = Arc::clone(&self.last_seen);
    let student = student_id.to_owned();
    let fetch_student = student.clone();
    let dedup_student = student.clone();

    let deduped = move |record: Option<PointsRecord>| {
      let mut seen = last_seen.lock();
      match &record {
        Some(rec) => {
          if seen.get(&rec.student_id) == Some(&rec.total) {
            tracing::debug!(student = %rec.student_id, "suppressing duplicate points delivery");
            return;
          }
          seen.insert(rec.student_id.clone(), rec.total);
        }
        None => {
          seen.remove(&dedup_student);
        }
      }
      drop(seen);
      on_update(record);
    };

    subscribe(
      Arc::clone(&self.cache),
      self.store.changes(),
      feed_key(&student),
      FeedFilter::one(Collection::Points, Some(student.clone())),
      move || {
        let store = Arc::clone(&store);
        let student = fetch_student.clone();
        async move { store.get_points(&student).await }
      },
      deduped,
      opts,
    )
  }
}
