//! The active-question controller.
//!
//! State machine per session: `NoActive → Active` on post, `Active →
//! Active'` when a new question supersedes the old one, `Active → NoActive`
//! on explicit end. The one-live-question invariant is enforced here: every
//! transition clears all active-question rows and all answers for the
//! session before a new row becomes visible.

use std::sync::Arc;

use lectern_core::{
  Error, Result,
  question::ActiveQuestion,
  session::SessionCode,
  store::{ClassStore, Collection},
};

use crate::feed::{FeedFilter, FeedHandle, FeedOptions, SnapshotCache, subscribe};

pub(crate) fn feed_key(code: &SessionCode) -> String { format!("active/{code}") }

pub struct ActiveQuestionController<S> {
  store: Arc<S>,
  cache: Arc<SnapshotCache>,
}

impl<S: ClassStore + 'static> ActiveQuestionController<S> {
  pub fn new(store: Arc<S>, cache: Arc<SnapshotCache>) -> Self {
    Self { store, cache }
  }

  /// Pose a new question to the whole session, superseding any previous one.
  ///
  /// Ordering is load-bearing: old rows and answers are cleared *before* the
  /// new row is inserted, so students can never submit against a stale
  /// question id that overlaps with the new one.
  pub async fn post_question(
    &self,
    code: &SessionCode,
    text: &str,
  ) -> Result<ActiveQuestion> {
    if text.trim().is_empty() {
      return Err(Error::InvalidArgument("question text must not be empty".into()));
    }

    self
      .store
      .delete_active_for_session(code)
      .await
      .map_err(Error::store)?;
    self
      .store
      .delete_answers_for_session(code)
      .await
      .map_err(Error::store)?;

    let question = ActiveQuestion::new(code.clone(), text.trim());
    self
      .store
      .put_active_question(question.clone())
      .await
      .map_err(Error::store)?;

    self.cache.invalidate(&feed_key(code));
    self.cache.invalidate(&crate::answers::feed_key(code));

    tracing::info!(code = %code, "posted active question");
    Ok(question)
  }

  /// Take down the live question and clear its answers. Ending when nothing
  /// is live is a no-op success.
  pub async fn end_question(&self, code: &SessionCode) -> Result<()> {
    let Some(mut current) = self
      .store
      .active_for_session(code)
      .await
      .map_err(Error::store)?
    else {
      return Ok(());
    };

    current.active = false;
    self
      .store
      .put_active_question(current)
      .await
      .map_err(Error::store)?;
    self
      .store
      .delete_answers_for_session(code)
      .await
      .map_err(Error::store)?;

    self.cache.invalidate(&feed_key(code));
    self.cache.invalidate(&crate::answers::feed_key(code));

    tracing::info!(code = %code, "ended active question");
    Ok(())
  }

  /// The live question right now, if any.
  pub async fn current(&self, code: &SessionCode) -> Result<Option<ActiveQuestion>> {
    self
      .store
      .active_for_session(code)
      .await
      .map_err(Error::store)
  }

  /// Live view of the session's active question; delivers `None` whenever
  /// no row is live.
  pub fn listen_active(
    &self,
    code: &SessionCode,
    on_update: impl Fn(Option<ActiveQuestion>) + Send + Sync + 'static,
    opts: FeedOptions,
  ) -> FeedHandle {
    let store = Arc::clone(&self.store);
    let code = code.clone();
    let fetch_code = code.clone();
    subscribe(
      Arc::clone(&self.cache),
      self.store.changes(),
      feed_key(&code),
      FeedFilter::one(Collection::ActiveQuestions, Some(code.to_string())),
      move || {
        let store = Arc::clone(&store);
        let code = fetch_code.clone();
        async move { store.active_for_session(&code).await }
      },
      on_update,
      opts,
    )
  }
}
