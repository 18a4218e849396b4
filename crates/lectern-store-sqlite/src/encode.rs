//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings, timestamps as 64-bit
//! epoch milliseconds, statuses as lowercase text, booleans as 0/1 integers.

use chrono::{DateTime, TimeZone as _, Utc};
use lectern_core::{
  answer::Answer,
  points::PointsRecord,
  question::{ActiveQuestion, Question, QuestionLink, QuestionStatus},
  session::{ClassSession, JoinedClassLink, SessionCode, SessionStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_ts(dt: DateTime<Utc>) -> i64 { dt.timestamp_millis() }

pub fn decode_ts(ms: i64) -> Result<DateTime<Utc>> {
  Utc
    .timestamp_millis_opt(ms)
    .single()
    .ok_or(Error::Timestamp(ms))
}

pub fn decode_code(s: String) -> Result<SessionCode> {
  SessionCode::parse(&s).map_err(|_| Error::Decode {
    field: "session_code",
    value: s,
  })
}

// ─── Statuses ────────────────────────────────────────────────────────────────

pub fn encode_session_status(s: SessionStatus) -> &'static str {
  match s {
    SessionStatus::Active => "active",
    SessionStatus::Closed => "closed",
    SessionStatus::Archived => "archived",
  }
}

pub fn decode_session_status(s: &str) -> Result<SessionStatus> {
  match s {
    "active" => Ok(SessionStatus::Active),
    "closed" => Ok(SessionStatus::Closed),
    "archived" => Ok(SessionStatus::Archived),
    other => Err(Error::Decode {
      field: "session status",
      value: other.to_owned(),
    }),
  }
}

pub fn encode_question_status(s: QuestionStatus) -> &'static str {
  match s {
    QuestionStatus::Unanswered => "unanswered",
    QuestionStatus::Answered => "answered",
  }
}

pub fn decode_question_status(s: &str) -> Result<QuestionStatus> {
  match s {
    "unanswered" => Ok(QuestionStatus::Unanswered),
    "answered" => Ok(QuestionStatus::Answered),
    other => Err(Error::Decode {
      field: "question status",
      value: other.to_owned(),
    }),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `sessions` row as it comes off the wire, before decoding.
pub struct RawSession {
  pub session_id:     String,
  pub session_code:   String,
  pub class_name:     String,
  pub moderator_id:   String,
  pub status:         String,
  pub created_at:     i64,
  pub last_active_at: i64,
}

impl RawSession {
  pub fn into_session(self) -> Result<ClassSession> {
    Ok(ClassSession {
      session_id:     decode_uuid(&self.session_id)?,
      session_code:   decode_code(self.session_code)?,
      class_name:     self.class_name,
      moderator_id:   self.moderator_id,
      status:         decode_session_status(&self.status)?,
      created_at:     decode_ts(self.created_at)?,
      last_active_at: decode_ts(self.last_active_at)?,
    })
  }
}

pub struct RawQuestion {
  pub question_id:  String,
  pub session_code: String,
  pub author_id:    String,
  pub text:         String,
  pub created_at:   i64,
  pub status:       String,
}

impl RawQuestion {
  pub fn into_question(self) -> Result<Question> {
    Ok(Question {
      question_id:  decode_uuid(&self.question_id)?,
      session_code: decode_code(self.session_code)?,
      author_id:    self.author_id,
      text:         self.text,
      created_at:   decode_ts(self.created_at)?,
      status:       decode_question_status(&self.status)?,
    })
  }
}

pub struct RawQuestionLink {
  pub question_id:  String,
  pub author_id:    String,
  pub session_code: String,
  pub text:         String,
  pub status:       String,
}

impl RawQuestionLink {
  pub fn into_link(self) -> Result<QuestionLink> {
    Ok(QuestionLink {
      question_id:  decode_uuid(&self.question_id)?,
      author_id:    self.author_id,
      session_code: decode_code(self.session_code)?,
      text:         self.text,
      status:       decode_question_status(&self.status)?,
    })
  }
}

pub struct RawActiveQuestion {
  pub question_id:  String,
  pub session_code: String,
  pub text:         String,
  pub created_at:   i64,
  pub active:       bool,
}

impl RawActiveQuestion {
  pub fn into_active(self) -> Result<ActiveQuestion> {
    Ok(ActiveQuestion {
      question_id:  decode_uuid(&self.question_id)?,
      session_code: decode_code(self.session_code)?,
      text:         self.text,
      created_at:   decode_ts(self.created_at)?,
      active:       self.active,
    })
  }
}

pub struct RawAnswer {
  pub answer_id:          String,
  pub active_question_id: String,
  pub session_code:       String,
  pub student_id:         String,
  pub text:               String,
  pub created_at:         i64,
  pub updated:            bool,
}

impl RawAnswer {
  pub fn into_answer(self) -> Result<Answer> {
    Ok(Answer {
      answer_id:          decode_uuid(&self.answer_id)?,
      active_question_id: decode_uuid(&self.active_question_id)?,
      session_code:       decode_code(self.session_code)?,
      student_id:         self.student_id,
      text:               self.text,
      created_at:         decode_ts(self.created_at)?,
      updated:            self.updated,
    })
  }
}

pub struct RawPoints {
  pub student_id:   String,
  pub total:        i64,
  pub last_updated: i64,
}

impl RawPoints {
  pub fn into_points(self) -> Result<PointsRecord> {
    Ok(PointsRecord {
      student_id:   self.student_id,
      total:        self.total,
      last_updated: decode_ts(self.last_updated)?,
    })
  }
}

pub struct RawJoinedLink {
  pub student_id:   String,
  pub session_code: String,
  pub class_name:   String,
  pub joined_at:    i64,
}

impl RawJoinedLink {
  pub fn into_link(self) -> Result<JoinedClassLink> {
    Ok(JoinedClassLink {
      student_id:   self.student_id,
      session_code: decode_code(self.session_code)?,
      class_name:   self.class_name,
      joined_at:    decode_ts(self.joined_at)?,
    })
  }
}
