//! Error types for `lectern-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("session not found: {0}")]
  SessionNotFound(String),

  #[error("question not found: {0}")]
  QuestionNotFound(Uuid),

  #[error("author {author_id} may not modify question {question_id}")]
  NotQuestionAuthor {
    question_id: Uuid,
    author_id:   String,
  },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// An optimistic text update lost to concurrent writes on every retry.
  #[error("stale write on question {0}")]
  StaleWrite(Uuid),

  #[error("store unavailable: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend failure as a store-unavailability error.
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
