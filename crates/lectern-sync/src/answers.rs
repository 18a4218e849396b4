//! The answer collector: one answer per student per active question.

use std::{sync::Arc, time::Duration};

use lectern_core::{
  Error, Result,
  answer::{Answer, AnswerFeed},
  session::SessionCode,
  store::{ClassStore, Collection},
};
use uuid::Uuid;

use crate::feed::{FeedFilter, FeedHandle, FeedOptions, SnapshotCache, subscribe};

pub(crate) fn feed_key(code: &SessionCode) -> String { format!("answers/{code}") }

pub struct AnswerCollector<S> {
  store:     Arc<S>,
  cache:     Arc<SnapshotCache>,
  /// Fixed debounce window for the answer feed.
  feed_wait: Duration,
}

impl<S: ClassStore + 'static> AnswerCollector<S> {
  pub fn new(store: Arc<S>, cache: Arc<SnapshotCache>, feed_wait: Duration) -> Self {
    Self { store, cache, feed_wait }
  }

  /// Record a student's answer, replacing any earlier one for the same
  /// active question.
  ///
  /// This is a read-then-write upsert, not an atomic operation: two
  /// near-simultaneous submissions from one student can both probe "not
  /// found" and both insert. The window is accepted — the store offers no
  /// multi-document transaction, and last-write-wins keeps the result
  /// usable.
  pub async fn submit_answer(
    &self,
    active_question_id: Uuid,
    student_id: &str,
    code: &SessionCode,
    text: &str,
  ) -> Result<Answer> {
    if text.trim().is_empty() {
      return Err(Error::InvalidArgument("answer text must not be empty".into()));
    }
    if student_id.trim().is_empty() {
      return Err(Error::InvalidArgument("student id must not be empty".into()));
    }

    let answer = match self
      .store
      .answer_for_student(active_question_id, student_id)
      .await
      .map_err(Error::store)?
    {
      Some(mut existing) => {
        existing.text = text.trim().to_owned();
        existing.updated = true;
        existing
      }
      None => Answer::new(active_question_id, code.clone(), student_id, text.trim()),
    };

    self
      .store
      .put_answer(answer.clone())
      .await
      .map_err(Error::store)?;
    self.cache.invalidate(&feed_key(code));

    Ok(answer)
  }

  /// All answers to an active question, oldest first.
  pub async fn answers(&self, active_question_id: Uuid) -> Result<Vec<Answer>> {
    self
      .store
      .answers_for_question(active_question_id)
      .await
      .map_err(Error::store)
  }

  /// Live answer feed for a session, joined with the active question's text.
  ///
  /// Debounced at the collector's fixed window (1s by default) — tighter
  /// than other listeners, since answers are the primary live-feedback
  /// signal. Delivers an empty feed when no question is live.
  pub fn listen_answers(
    &self,
    code: &SessionCode,
    on_update: impl Fn(AnswerFeed) + Send + Sync + 'static,
  ) -> FeedHandle {
    let store = Arc::clone(&self.store);
    let code = code.clone();
    let fetch_code = code.clone();
    subscribe(
      Arc::clone(&self.cache),
      self.store.changes(),
      feed_key(&code),
      // Answers change on submission; the joined question text changes on
      // post/end transitions. Either should refresh the feed.
      FeedFilter::new(
        vec![Collection::Answers, Collection::ActiveQuestions],
        Some(code.to_string()),
      ),
      move || {
        let store = Arc::clone(&store);
        let code = fetch_code.clone();
        async move {
          let Some(question) = store.active_for_session(&code).await? else {
            return Ok::<_, S::Error>(AnswerFeed::default());
          };
          let answers = store.answers_for_question(question.question_id).await?;
          Ok(AnswerFeed {
            question_text: Some(question.text),
            answers,
          })
        }
      },
      on_update,
      FeedOptions {
        max_wait:  self.feed_wait,
        use_cache: true,
      },
    )
  }
}
