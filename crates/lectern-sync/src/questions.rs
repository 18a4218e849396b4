//! The question ledger: student-authored questions scoped to a session.
//!
//! Every question has a primary row and an author-indexed link record with
//! denormalized `text`/`status`; all mutations touch both so per-author
//! queries never read stale copies.

use std::{sync::Arc, time::Duration};

use lectern_core::{
  Error, Result,
  question::{Question, QuestionLink, QuestionStatus},
  session::SessionCode,
  store::{ClassStore, Collection},
};
use uuid::Uuid;

use crate::feed::{FeedFilter, FeedHandle, FeedOptions, SnapshotCache, subscribe};

/// Backoff schedule for text updates that lose a concurrent write.
const UPDATE_BACKOFF: [Duration; 3] = [
  Duration::from_millis(500),
  Duration::from_secs(1),
  Duration::from_secs(2),
];

pub(crate) fn feed_key(code: &SessionCode) -> String { format!("questions/{code}") }

fn author_key(author_id: &str, code: &SessionCode) -> String {
  format!("questions/{code}/{author_id}")
}

pub struct QuestionLedger<S> {
  store: Arc<S>,
  cache: Arc<SnapshotCache>,
}

impl<S: ClassStore + 'static> QuestionLedger<S> {
  pub fn new(store: Arc<S>, cache: Arc<SnapshotCache>) -> Self {
    Self { store, cache }
  }

  /// Submit a new question to the session's ledger.
  pub async fn add_question(
    &self,
    text: &str,
    author_id: &str,
    code: &SessionCode,
  ) -> Result<Question> {
    if text.trim().is_empty() {
      return Err(Error::InvalidArgument("question text must not be empty".into()));
    }
    if author_id.trim().is_empty() {
      return Err(Error::InvalidArgument("author id must not be empty".into()));
    }

    let question = Question::new(code.clone(), author_id, text.trim());
    self
      .store
      .put_question(question.clone())
      .await
      .map_err(Error::store)?;
    self
      .store
      .put_question_link(question.link())
      .await
      .map_err(Error::store)?;

    self.invalidate(code, author_id);
    Ok(question)
  }

  /// Update a question's text. Only the author may do this.
  ///
  /// The write is verified by reading back; a mismatch (another writer won)
  /// is retried with backoff before surfacing [`Error::StaleWrite`].
  pub async fn update_question(
    &self,
    question_id: Uuid,
    text: &str,
    author_id: &str,
  ) -> Result<Question> {
    if text.trim().is_empty() {
      return Err(Error::InvalidArgument("question text must not be empty".into()));
    }

    let current = self
      .store
      .get_question(question_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::QuestionNotFound(question_id))?;

    if current.author_id != author_id {
      return Err(Error::NotQuestionAuthor {
        question_id,
        author_id: author_id.to_owned(),
      });
    }

    let mut updated = current;
    updated.text = text.trim().to_owned();

    let mut attempt = 0;
    loop {
      self
        .store
        .put_question(updated.clone())
        .await
        .map_err(Error::store)?;
      self
        .store
        .put_question_link(updated.link())
        .await
        .map_err(Error::store)?;

      let check = self
        .store
        .get_question(question_id)
        .await
        .map_err(Error::store)?
        .ok_or(Error::QuestionNotFound(question_id))?;

      if check.text == updated.text {
        self.invalidate(&updated.session_code, &updated.author_id);
        return Ok(check);
      }

      if attempt >= UPDATE_BACKOFF.len() {
        return Err(Error::StaleWrite(question_id));
      }
      tracing::warn!(
        question = %question_id,
        attempt,
        "text update lost a concurrent write; retrying"
      );
      tokio::time::sleep(UPDATE_BACKOFF[attempt]).await;
      attempt += 1;
    }
  }

  /// Delete a question and its link record.
  pub async fn delete_question(&self, question_id: Uuid) -> Result<()> {
    let question = self
      .store
      .get_question(question_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::QuestionNotFound(question_id))?;

    self
      .store
      .delete_question(question_id)
      .await
      .map_err(Error::store)?;
    self
      .store
      .delete_question_link(question_id)
      .await
      .map_err(Error::store)?;

    self.invalidate(&question.session_code, &question.author_id);
    Ok(())
  }

  /// Flip the answered/unanswered flag (moderator action).
  pub async fn update_status(
    &self,
    question_id: Uuid,
    status: QuestionStatus,
  ) -> Result<Question> {
    let mut question = self
      .store
      .get_question(question_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::QuestionNotFound(question_id))?;

    question.status = status;
    self
      .store
      .put_question(question.clone())
      .await
      .map_err(Error::store)?;
    self
      .store
      .put_question_link(question.link())
      .await
      .map_err(Error::store)?;

    self.invalidate(&question.session_code, &question.author_id);
    Ok(question)
  }

  /// All questions for a session, newest first.
  pub async fn list_for_session(&self, code: &SessionCode) -> Result<Vec<Question>> {
    self
      .store
      .questions_for_session(code)
      .await
      .map_err(Error::store)
  }

  /// One author's questions in a session, served from the link index.
  pub async fn list_for_author(
    &self,
    author_id: &str,
    code: &SessionCode,
  ) -> Result<Vec<QuestionLink>> {
    self
      .store
      .links_for_author(author_id, code)
      .await
      .map_err(Error::store)
  }

  /// Live list of the session's questions, newest first.
  pub fn listen_questions(
    &self,
    code: &SessionCode,
    on_update: impl Fn(Vec<Question>) + Send + Sync + 'static,
    opts: FeedOptions,
  ) -> FeedHandle {
    let store = Arc::clone(&self.store);
    let code = code.clone();
    let fetch_code = code.clone();
    subscribe(
      Arc::clone(&self.cache),
      self.store.changes(),
      feed_key(&code),
      FeedFilter::one(Collection::Questions, Some(code.to_string())),
      move || {
        let store = Arc::clone(&store);
        let code = fetch_code.clone();
        async move { store.questions_for_session(&code).await }
      },
      on_update,
      opts,
    )
  }

  fn invalidate(&self, code: &SessionCode, author_id: &str) {
    self.cache.invalidate(&feed_key(code));
    self.cache.invalidate(&author_key(author_id, code));
  }
}
