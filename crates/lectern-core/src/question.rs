//! Student-authored questions and the moderator's single active question.
//!
//! The two are deliberately distinct types, not one structure with optional
//! fields: a [`Question`] lives in the session-scoped ledger and is owned by
//! its author, while an [`ActiveQuestion`] is the one prompt the moderator is
//! currently posing to the whole class.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionCode;

// ─── Ledger questions ────────────────────────────────────────────────────────

/// Whether the moderator has dealt with a ledger question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
  #[default]
  Unanswered,
  Answered,
}

/// A question a student submitted to the session's ledger.
///
/// Text is mutable only by the author; status only by a moderator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
  pub question_id:  Uuid,
  pub session_code: SessionCode,
  pub author_id:    String,
  pub text:         String,
  pub created_at:   DateTime<Utc>,
  pub status:       QuestionStatus,
}

impl Question {
  pub fn new(
    session_code: SessionCode,
    author_id: impl Into<String>,
    text: impl Into<String>,
  ) -> Self {
    Self {
      question_id: Uuid::new_v4(),
      session_code,
      author_id: author_id.into(),
      text: text.into(),
      created_at: Utc::now(),
      status: QuestionStatus::Unanswered,
    }
  }

  /// The author-indexed secondary record for this question.
  ///
  /// `text` and `status` are denormalized; every mutation of the primary row
  /// must refresh the link as well.
  pub fn link(&self) -> QuestionLink {
    QuestionLink {
      question_id:  self.question_id,
      author_id:    self.author_id.clone(),
      session_code: self.session_code.clone(),
      text:         self.text.clone(),
      status:       self.status,
    }
  }
}

/// Secondary index record for efficient per-author queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionLink {
  pub question_id:  Uuid,
  pub author_id:    String,
  pub session_code: SessionCode,
  pub text:         String,
  pub status:       QuestionStatus,
}

// ─── Active question ─────────────────────────────────────────────────────────

/// The single live prompt for a session.
///
/// Invariant: at most one row with `active = true` per session code. Posting
/// a new one clears the old rows and every answer for the session first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveQuestion {
  pub question_id:  Uuid,
  pub session_code: SessionCode,
  pub text:         String,
  pub created_at:   DateTime<Utc>,
  pub active:       bool,
}

impl ActiveQuestion {
  pub fn new(session_code: SessionCode, text: impl Into<String>) -> Self {
    Self {
      question_id:  Uuid::new_v4(),
      session_code,
      text:         text.into(),
      created_at:   Utc::now(),
      active:       true,
    }
  }
}
