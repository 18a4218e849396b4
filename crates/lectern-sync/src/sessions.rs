//! The session directory: creating, finding, and transitioning class
//! sessions, plus the per-student joined-class link.

use std::sync::Arc;

use chrono::Utc;
use lectern_core::{
  Error, Result,
  session::{ClassSession, JoinedClassLink, SessionCode, SessionStatus},
  store::{ClassStore, Collection},
};
use uuid::Uuid;

use crate::feed::{FeedFilter, FeedHandle, FeedOptions, SnapshotCache, subscribe};

pub(crate) fn feed_key(code: &SessionCode) -> String { format!("session/{code}") }

pub struct SessionDirectory<S> {
  store: Arc<S>,
  cache: Arc<SnapshotCache>,
}

impl<S: ClassStore + 'static> SessionDirectory<S> {
  pub fn new(store: Arc<S>, cache: Arc<SnapshotCache>) -> Self {
    Self { store, cache }
  }

  /// Open a new session with a generated join code.
  ///
  /// Codes are best-effort random; collisions are not checked.
  pub async fn create_session(
    &self,
    class_name: &str,
    moderator_id: &str,
  ) -> Result<ClassSession> {
    if class_name.trim().is_empty() {
      return Err(Error::InvalidArgument("class name must not be empty".into()));
    }
    if moderator_id.trim().is_empty() {
      return Err(Error::InvalidArgument("moderator id must not be empty".into()));
    }

    let session = ClassSession::new(class_name.trim(), moderator_id);
    self
      .store
      .put_session(session.clone())
      .await
      .map_err(Error::store)?;
    self.cache.invalidate(&feed_key(&session.session_code));

    tracing::info!(
      code = %session.session_code,
      class = %session.class_name,
      "created session"
    );
    Ok(session)
  }

  /// Look up an `Active` session by join code. Closed and archived sessions
  /// are not joinable and resolve to `None`.
  pub async fn get_by_code(&self, code: &SessionCode) -> Result<Option<ClassSession>> {
    self
      .store
      .session_by_code(code, SessionStatus::Active)
      .await
      .map_err(Error::store)
  }

  /// Bump `last_active_at`; call on any moderator action.
  pub async fn touch_activity(&self, session_id: Uuid) -> Result<()> {
    let session = self
      .store
      .get_session(session_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

    self
      .store
      .touch_session(session_id, Utc::now())
      .await
      .map_err(Error::store)?;
    self.cache.invalidate(&feed_key(&session.session_code));
    Ok(())
  }

  /// Close a session. Ending one that is already closed or archived is a
  /// no-op success.
  pub async fn end_session(&self, session_id: Uuid) -> Result<()> {
    self.transition(session_id, SessionStatus::Closed).await
  }

  /// Archive a session. Idempotent like `end_session`.
  pub async fn archive_session(&self, session_id: Uuid) -> Result<()> {
    self.transition(session_id, SessionStatus::Archived).await
  }

  async fn transition(&self, session_id: Uuid, to: SessionStatus) -> Result<()> {
    let session = self
      .store
      .get_session(session_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

    // Only Active sessions transition; re-ending a dead one is a no-op.
    if session.status != SessionStatus::Active {
      return Ok(());
    }

    self
      .store
      .set_session_status(session_id, to, Utc::now())
      .await
      .map_err(Error::store)?;
    self.cache.invalidate(&feed_key(&session.session_code));

    tracing::info!(code = %session.session_code, status = ?to, "session transitioned");
    Ok(())
  }

  // ── Joined-class links ────────────────────────────────────────────────

  /// Join a student to the session behind `code`, overwriting any previous
  /// membership (one current link per student).
  pub async fn join_session(
    &self,
    student_id: &str,
    code: &SessionCode,
  ) -> Result<ClassSession> {
    if student_id.trim().is_empty() {
      return Err(Error::InvalidArgument("student id must not be empty".into()));
    }

    let session = self
      .get_by_code(code)
      .await?
      .ok_or_else(|| Error::SessionNotFound(code.to_string()))?;

    self
      .store
      .put_joined_link(JoinedClassLink {
        student_id:   student_id.to_owned(),
        session_code: session.session_code.clone(),
        class_name:   session.class_name.clone(),
        joined_at:    Utc::now(),
      })
      .await
      .map_err(Error::store)?;

    Ok(session)
  }

  /// Remove the student's membership link. Leaving twice is harmless.
  pub async fn leave_session(&self, student_id: &str) -> Result<()> {
    self
      .store
      .delete_joined_link(student_id)
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  /// The student's current membership, if any.
  pub async fn joined_class(&self, student_id: &str) -> Result<Option<JoinedClassLink>> {
    self.store.joined_link(student_id).await.map_err(Error::store)
  }

  /// Live view of the session row behind `code` (any status); delivers
  /// `None` once the session is deleted.
  pub fn listen_session(
    &self,
    code: &SessionCode,
    on_update: impl Fn(Option<ClassSession>) + Send + Sync + 'static,
    opts: FeedOptions,
  ) -> FeedHandle {
    let store = Arc::clone(&self.store);
    let code = code.clone();
    let fetch_code = code.clone();
    subscribe(
      Arc::clone(&self.cache),
      self.store.changes(),
      feed_key(&code),
      FeedFilter::one(Collection::Sessions, Some(code.to_string())),
      move || {
        let store = Arc::clone(&store);
        let code = fetch_code.clone();
        async move {
          // Status-agnostic read: try each status in turn so listeners see
          // close/archive transitions rather than a sudden None.
          for status in [
            SessionStatus::Active,
            SessionStatus::Closed,
            SessionStatus::Archived,
          ] {
            if let Some(session) = store.session_by_code(&code, status).await? {
              return Ok::<_, S::Error>(Some(session));
            }
          }
          Ok(None)
        }
      },
      on_update,
      opts,
    )
  }
}
