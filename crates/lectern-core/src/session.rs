//! Class sessions and the codes students use to join them.
//!
//! A session is the envelope for one live class: a moderator opens it, hands
//! the generated code to students, and everything else (questions, answers,
//! points awards) hangs off the code.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Session code ────────────────────────────────────────────────────────────

const CODE_LEN: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The 6-character `[A-Z0-9]` public identifier students type to join.
///
/// Generation is best-effort random; collisions are accepted by design and
/// not checked against the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
  /// Generate a fresh random code.
  pub fn generate() -> Self {
    let mut rng = rand::thread_rng();
    let code = (0..CODE_LEN)
      .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
      .collect();
    Self(code)
  }

  /// Parse user input: trimmed, upper-cased, and validated against the
  /// 6-character `[A-Z0-9]` shape.
  pub fn parse(raw: &str) -> Result<Self> {
    let code = raw.trim().to_ascii_uppercase();
    let well_formed = code.len() == CODE_LEN
      && code
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if !well_formed {
      return Err(Error::InvalidArgument(format!(
        "malformed session code: {raw:?}"
      )));
    }
    Ok(Self(code))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SessionCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Lifecycle status of a class session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
  /// Accepting joins, questions, and answers.
  Active,
  /// Ended by the moderator or closed by the sweeper for inactivity.
  Closed,
  /// Manually archived by the moderator.
  Archived,
}

/// One live class. `last_active_at` is bumped by any moderator action and
/// drives the sweeper's inactivity and retention checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSession {
  pub session_id:     Uuid,
  pub session_code:   SessionCode,
  pub class_name:     String,
  pub moderator_id:   String,
  pub status:         SessionStatus,
  pub created_at:     DateTime<Utc>,
  pub last_active_at: DateTime<Utc>,
}

impl ClassSession {
  /// Build a fresh `Active` session with a generated id and code.
  pub fn new(class_name: impl Into<String>, moderator_id: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      session_id:     Uuid::new_v4(),
      session_code:   SessionCode::generate(),
      class_name:     class_name.into(),
      moderator_id:   moderator_id.into(),
      status:         SessionStatus::Active,
      created_at:     now,
      last_active_at: now,
    }
  }
}

// ─── Joined-class link ───────────────────────────────────────────────────────

/// A student's current class membership. One per student — re-joining
/// overwrites, leaving removes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedClassLink {
  pub student_id:   String,
  pub session_code: SessionCode,
  pub class_name:   String,
  pub joined_at:    DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_codes_are_well_formed() {
    for _ in 0..100 {
      let code = SessionCode::generate();
      assert_eq!(code.as_str().len(), 6);
      assert!(
        code
          .as_str()
          .bytes()
          .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
      );
    }
  }

  #[test]
  fn parse_normalises_case_and_whitespace() {
    let code = SessionCode::parse("  ab12cd ").unwrap();
    assert_eq!(code.as_str(), "AB12CD");
  }

  #[test]
  fn parse_rejects_bad_shapes() {
    assert!(SessionCode::parse("").is_err());
    assert!(SessionCode::parse("ABC").is_err());
    assert!(SessionCode::parse("ABC12!").is_err());
    assert!(SessionCode::parse("TOOLONG1").is_err());
  }
}
