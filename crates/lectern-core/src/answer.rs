//! Answers to the active question, and the joined feed view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionCode;

/// One student's answer to one active question.
///
/// Uniqueness per `(active_question_id, student_id)` is enforced by the
/// collector's upsert, not by a store-level constraint. `updated` marks an
/// answer the student revised after first submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
  pub answer_id:          Uuid,
  pub active_question_id: Uuid,
  pub session_code:       SessionCode,
  pub student_id:         String,
  pub text:               String,
  pub created_at:         DateTime<Utc>,
  pub updated:            bool,
}

impl Answer {
  pub fn new(
    active_question_id: Uuid,
    session_code: SessionCode,
    student_id: impl Into<String>,
    text: impl Into<String>,
  ) -> Self {
    Self {
      answer_id: Uuid::new_v4(),
      active_question_id,
      session_code,
      student_id: student_id.into(),
      text: text.into(),
      created_at: Utc::now(),
      updated: false,
    }
  }
}

/// The computed read model the answer listener delivers — never stored,
/// always derived: the session's answers joined with the live question's
/// text for display context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerFeed {
  /// Text of the current active question, if one is live.
  pub question_text: Option<String>,
  /// Answers in submission order (oldest first).
  pub answers:       Vec<Answer>,
}
