//! The maintenance sweeper: rate-limited periodic reconciliation.
//!
//! Closes idle sessions, reaps answers whose active question no longer
//! exists, and purges all data for sessions dead beyond the retention
//! window. Idempotent — a second pass finding nothing to do is a success —
//! and serialized by the minimum-interval guard rather than a lock, which is
//! sufficient because sweeps come from a single external scheduler.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lectern_core::{
  session::SessionStatus,
  store::ClassStore,
};
use parking_lot::Mutex;

use crate::config::SyncConfig;

/// What one sweep did. A `skipped` report carries zero counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub sessions_closed:        usize,
  pub orphan_answers_deleted: usize,
  pub sessions_purged:        usize,
  pub skipped:                bool,
}

impl SweepReport {
  fn skipped() -> Self {
    Self { skipped: true, ..Self::default() }
  }
}

pub struct Sweeper<S> {
  store:                Arc<S>,
  inactivity_threshold: Duration,
  min_interval:         Duration,
  retention:            Duration,
  last_run:             Mutex<Option<DateTime<Utc>>>,
}

impl<S: ClassStore> Sweeper<S> {
  pub fn new(store: Arc<S>, config: &SyncConfig) -> Self {
    Self {
      store,
      inactivity_threshold: config.inactivity_threshold(),
      min_interval: config.sweep_min_interval(),
      retention: config.retention(),
      last_run: Mutex::new(None),
    }
  }

  /// Run one sweep as of `now`.
  ///
  /// Refuses (returning a zero-count skipped report) if the previous run was
  /// less than the minimum interval before `now`. Each category failure is
  /// logged and the sweep continues with the next one.
  pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
    {
      let mut last = self.last_run.lock();
      if let Some(prev) = *last
        && now - prev < self.min_interval
      {
        tracing::debug!("sweep skipped; previous run too recent");
        return SweepReport::skipped();
      }
      *last = Some(now);
    }

    let mut report = SweepReport::default();

    match self.close_idle_sessions(now).await {
      Ok(n) => report.sessions_closed = n,
      Err(err) => tracing::warn!(%err, "failed to close idle sessions"),
    }

    match self.store.delete_orphaned_answers().await {
      Ok(n) => report.orphan_answers_deleted = n,
      Err(err) => tracing::warn!(%err, "failed to delete orphaned answers"),
    }

    match self.purge_expired_sessions(now).await {
      Ok(n) => report.sessions_purged = n,
      Err(err) => tracing::warn!(%err, "failed to purge expired sessions"),
    }

    tracing::info!(
      closed = report.sessions_closed,
      orphans = report.orphan_answers_deleted,
      purged = report.sessions_purged,
      "sweep complete"
    );
    report
  }

  /// Close `Active` sessions idle beyond the inactivity threshold.
  async fn close_idle_sessions(&self, now: DateTime<Utc>) -> Result<usize, S::Error> {
    let idle = self
      .store
      .idle_sessions(SessionStatus::Active, now - self.inactivity_threshold)
      .await?;

    let mut closed = 0;
    for session in idle {
      if self
        .store
        .set_session_status(session.session_id, SessionStatus::Closed, now)
        .await?
      {
        tracing::info!(code = %session.session_code, "closed idle session");
        closed += 1;
      }
    }
    Ok(closed)
  }

  /// Delete every trace of sessions closed/archived beyond the retention
  /// window: questions, links, active questions, answers, memberships, and
  /// finally the session row itself.
  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, S::Error> {
    let cutoff = now - self.retention;
    let mut expired = self.store.idle_sessions(SessionStatus::Closed, cutoff).await?;
    expired.extend(
      self
        .store
        .idle_sessions(SessionStatus::Archived, cutoff)
        .await?,
    );

    let mut purged = 0;
    for session in expired {
      let code = &session.session_code;
      self.store.delete_questions_for_session(code).await?;
      self.store.delete_question_links_for_session(code).await?;
      self.store.delete_active_for_session(code).await?;
      self.store.delete_answers_for_session(code).await?;
      self.store.delete_joined_links_for_session(code).await?;
      self.store.delete_session(session.session_id).await?;
      tracing::info!(code = %code, "purged expired session");
      purged += 1;
    }
    Ok(purged)
  }
}
