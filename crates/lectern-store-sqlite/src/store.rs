//! [`SqliteStore`] — the SQLite implementation of [`ClassStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;

use lectern_core::{
  answer::Answer,
  points::PointsRecord,
  question::{ActiveQuestion, Question, QuestionLink},
  session::{ClassSession, JoinedClassLink, SessionCode, SessionStatus},
  store::{ChangeNotice, ClassStore, Collection},
};

use crate::{
  encode::{
    encode_question_status, encode_session_status, encode_ts, encode_uuid,
    RawActiveQuestion, RawAnswer, RawJoinedLink, RawPoints, RawQuestion,
    RawQuestionLink, RawSession,
  },
  schema::SCHEMA,
  Error, Result,
};

/// Buffered notices per subscriber; a lagged receiver just refetches, so a
/// small buffer is enough.
const CHANGE_FEED_CAPACITY: usize = 256;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lectern class store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection and the change-feed sender are
/// both reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:      tokio_rusqlite::Connection,
  change_tx: broadcast::Sender<ChangeNotice>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_conn(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_conn(conn).await
  }

  async fn with_conn(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (change_tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
    let store = Self { conn, change_tx };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema applied");
    Ok(())
  }

  /// Publish a change notice. No subscribers is fine — the feed is
  /// best-effort by design.
  fn notify(&self, collection: Collection, scope: Option<&str>) {
    tracing::trace!(?collection, scope, "publishing change notice");
    let _ = self.change_tx.send(ChangeNotice {
      collection,
      scope: scope.map(str::to_owned),
    });
  }
}

// ─── ClassStore impl ─────────────────────────────────────────────────────────

impl ClassStore for SqliteStore {
  type Error = Error;

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn put_session(&self, session: ClassSession) -> Result<()> {
    let id_str    = encode_uuid(session.session_id);
    let code_str  = session.session_code.as_str().to_owned();
    let name      = session.class_name;
    let moderator = session.moderator_id;
    let status    = encode_session_status(session.status).to_owned();
    let created   = encode_ts(session.created_at);
    let active_at = encode_ts(session.last_active_at);

    let scope = code_str.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO sessions (
             session_id, session_code, class_name, moderator_id,
             status, created_at, last_active_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, code_str, name, moderator, status, created, active_at
          ],
        )?;
        Ok(())
      })
      .await?;

    self.notify(Collection::Sessions, Some(&scope));
    Ok(())
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<ClassSession>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT session_id, session_code, class_name, moderator_id,
                    status, created_at, last_active_at
             FROM sessions WHERE session_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawSession {
                session_id:     row.get(0)?,
                session_code:   row.get(1)?,
                class_name:     row.get(2)?,
                moderator_id:   row.get(3)?,
                status:         row.get(4)?,
                created_at:     row.get(5)?,
                last_active_at: row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn session_by_code(
    &self,
    code: &SessionCode,
    status: SessionStatus,
  ) -> Result<Option<ClassSession>> {
    let code_str   = code.as_str().to_owned();
    let status_str = encode_session_status(status).to_owned();

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT session_id, session_code, class_name, moderator_id,
                    status, created_at, last_active_at
             FROM sessions WHERE session_code = ?1 AND status = ?2",
            rusqlite::params![code_str, status_str],
            |row| {
              Ok(RawSession {
                session_id:     row.get(0)?,
                session_code:   row.get(1)?,
                class_name:     row.get(2)?,
                moderator_id:   row.get(3)?,
                status:         row.get(4)?,
                created_at:     row.get(5)?,
                last_active_at: row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn set_session_status(
    &self,
    id: Uuid,
    status: SessionStatus,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str     = encode_uuid(id);
    let status_str = encode_session_status(status).to_owned();
    let at_ms      = encode_ts(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions SET status = ?2, last_active_at = ?3
           WHERE session_id = ?1",
          rusqlite::params![id_str, status_str, at_ms],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::Sessions, None);
    }
    Ok(changed > 0)
  }

  async fn touch_session(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_ms  = encode_ts(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions SET last_active_at = ?2 WHERE session_id = ?1",
          rusqlite::params![id_str, at_ms],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::Sessions, None);
    }
    Ok(changed > 0)
  }

  async fn idle_sessions(
    &self,
    status: SessionStatus,
    cutoff: DateTime<Utc>,
  ) -> Result<Vec<ClassSession>> {
    let status_str = encode_session_status(status).to_owned();
    let cutoff_ms  = encode_ts(cutoff);

    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT session_id, session_code, class_name, moderator_id,
                  status, created_at, last_active_at
           FROM sessions WHERE status = ?1 AND last_active_at < ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![status_str, cutoff_ms], |row| {
            Ok(RawSession {
              session_id:     row.get(0)?,
              session_code:   row.get(1)?,
              class_name:     row.get(2)?,
              moderator_id:   row.get(3)?,
              status:         row.get(4)?,
              created_at:     row.get(5)?,
              last_active_at: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::into_session).collect()
  }

  async fn delete_session(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE session_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::Sessions, None);
    }
    Ok(changed > 0)
  }

  // ── Questions ─────────────────────────────────────────────────────────────

  async fn put_question(&self, question: Question) -> Result<()> {
    let id_str   = encode_uuid(question.question_id);
    let code_str = question.session_code.as_str().to_owned();
    let author   = question.author_id;
    let text     = question.text;
    let created  = encode_ts(question.created_at);
    let status   = encode_question_status(question.status).to_owned();

    let scope = code_str.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO questions (
             question_id, session_code, author_id, text, created_at, status
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, code_str, author, text, created, status],
        )?;
        Ok(())
      })
      .await?;

    self.notify(Collection::Questions, Some(&scope));
    Ok(())
  }

  async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawQuestion> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT question_id, session_code, author_id, text, created_at, status
             FROM questions WHERE question_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawQuestion {
                question_id:  row.get(0)?,
                session_code: row.get(1)?,
                author_id:    row.get(2)?,
                text:         row.get(3)?,
                created_at:   row.get(4)?,
                status:       row.get(5)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawQuestion::into_question).transpose()
  }

  async fn questions_for_session(&self, code: &SessionCode) -> Result<Vec<Question>> {
    let code_str = code.as_str().to_owned();

    let raws: Vec<RawQuestion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT question_id, session_code, author_id, text, created_at, status
           FROM questions WHERE session_code = ?1
           ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![code_str], |row| {
            Ok(RawQuestion {
              question_id:  row.get(0)?,
              session_code: row.get(1)?,
              author_id:    row.get(2)?,
              text:         row.get(3)?,
              created_at:   row.get(4)?,
              status:       row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  async fn delete_question(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM questions WHERE question_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::Questions, None);
    }
    Ok(changed > 0)
  }

  async fn delete_questions_for_session(&self, code: &SessionCode) -> Result<usize> {
    let code_str = code.as_str().to_owned();

    let scope = code_str.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM questions WHERE session_code = ?1",
          rusqlite::params![code_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::Questions, Some(&scope));
    }
    Ok(changed)
  }

  // ── Question links ────────────────────────────────────────────────────────

  async fn put_question_link(&self, link: QuestionLink) -> Result<()> {
    let id_str   = encode_uuid(link.question_id);
    let author   = link.author_id;
    let code_str = link.session_code.as_str().to_owned();
    let text     = link.text;
    let status   = encode_question_status(link.status).to_owned();

    let scope = code_str.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO question_links (
             question_id, author_id, session_code, text, status
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, author, code_str, text, status],
        )?;
        Ok(())
      })
      .await?;

    self.notify(Collection::QuestionLinks, Some(&scope));
    Ok(())
  }

  async fn links_for_author(
    &self,
    author_id: &str,
    code: &SessionCode,
  ) -> Result<Vec<QuestionLink>> {
    let author   = author_id.to_owned();
    let code_str = code.as_str().to_owned();

    let raws: Vec<RawQuestionLink> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT question_id, author_id, session_code, text, status
           FROM question_links WHERE author_id = ?1 AND session_code = ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![author, code_str], |row| {
            Ok(RawQuestionLink {
              question_id:  row.get(0)?,
              author_id:    row.get(1)?,
              session_code: row.get(2)?,
              text:         row.get(3)?,
              status:       row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestionLink::into_link).collect()
  }

  async fn delete_question_link(&self, question_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(question_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM question_links WHERE question_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::QuestionLinks, None);
    }
    Ok(changed > 0)
  }

  async fn delete_question_links_for_session(&self, code: &SessionCode) -> Result<usize> {
    let code_str = code.as_str().to_owned();

    let scope = code_str.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM question_links WHERE session_code = ?1",
          rusqlite::params![code_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::QuestionLinks, Some(&scope));
    }
    Ok(changed)
  }

  // ── Active questions ──────────────────────────────────────────────────────

  async fn put_active_question(&self, question: ActiveQuestion) -> Result<()> {
    let id_str   = encode_uuid(question.question_id);
    let code_str = question.session_code.as_str().to_owned();
    let text     = question.text;
    let created  = encode_ts(question.created_at);
    let active   = question.active;

    let scope = code_str.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO active_questions (
             question_id, session_code, text, created_at, active
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, code_str, text, created, active],
        )?;
        Ok(())
      })
      .await?;

    self.notify(Collection::ActiveQuestions, Some(&scope));
    Ok(())
  }

  async fn get_active_question(&self, id: Uuid) -> Result<Option<ActiveQuestion>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawActiveQuestion> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT question_id, session_code, text, created_at, active
             FROM active_questions WHERE question_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawActiveQuestion {
                question_id:  row.get(0)?,
                session_code: row.get(1)?,
                text:         row.get(2)?,
                created_at:   row.get(3)?,
                active:       row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawActiveQuestion::into_active).transpose()
  }

  async fn active_for_session(&self, code: &SessionCode) -> Result<Option<ActiveQuestion>> {
    let code_str = code.as_str().to_owned();

    let raw: Option<RawActiveQuestion> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT question_id, session_code, text, created_at, active
             FROM active_questions
             WHERE session_code = ?1 AND active = 1
             ORDER BY created_at DESC LIMIT 1",
            rusqlite::params![code_str],
            |row| {
              Ok(RawActiveQuestion {
                question_id:  row.get(0)?,
                session_code: row.get(1)?,
                text:         row.get(2)?,
                created_at:   row.get(3)?,
                active:       row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawActiveQuestion::into_active).transpose()
  }

  async fn delete_active_for_session(&self, code: &SessionCode) -> Result<usize> {
    let code_str = code.as_str().to_owned();

    let scope = code_str.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM active_questions WHERE session_code = ?1",
          rusqlite::params![code_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::ActiveQuestions, Some(&scope));
    }
    Ok(changed)
  }

  // ── Answers ───────────────────────────────────────────────────────────────

  async fn put_answer(&self, answer: Answer) -> Result<()> {
    let id_str   = encode_uuid(answer.answer_id);
    let aq_str   = encode_uuid(answer.active_question_id);
    let code_str = answer.session_code.as_str().to_owned();
    let student  = answer.student_id;
    let text     = answer.text;
    let created  = encode_ts(answer.created_at);
    let updated  = answer.updated;

    let scope = code_str.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO answers (
             answer_id, active_question_id, session_code, student_id,
             text, created_at, updated
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, aq_str, code_str, student, text, created, updated
          ],
        )?;
        Ok(())
      })
      .await?;

    self.notify(Collection::Answers, Some(&scope));
    Ok(())
  }

  async fn answer_for_student(
    &self,
    active_question_id: Uuid,
    student_id: &str,
  ) -> Result<Option<Answer>> {
    let aq_str  = encode_uuid(active_question_id);
    let student = student_id.to_owned();

    let raw: Option<RawAnswer> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT answer_id, active_question_id, session_code, student_id,
                    text, created_at, updated
             FROM answers
             WHERE active_question_id = ?1 AND student_id = ?2",
            rusqlite::params![aq_str, student],
            |row| {
              Ok(RawAnswer {
                answer_id:          row.get(0)?,
                active_question_id: row.get(1)?,
                session_code:       row.get(2)?,
                student_id:         row.get(3)?,
                text:               row.get(4)?,
                created_at:         row.get(5)?,
                updated:            row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAnswer::into_answer).transpose()
  }

  async fn answers_for_question(&self, active_question_id: Uuid) -> Result<Vec<Answer>> {
    let aq_str = encode_uuid(active_question_id);

    let raws: Vec<RawAnswer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT answer_id, active_question_id, session_code, student_id,
                  text, created_at, updated
           FROM answers WHERE active_question_id = ?1
           ORDER BY created_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![aq_str], |row| {
            Ok(RawAnswer {
              answer_id:          row.get(0)?,
              active_question_id: row.get(1)?,
              session_code:       row.get(2)?,
              student_id:         row.get(3)?,
              text:               row.get(4)?,
              created_at:         row.get(5)?,
              updated:            row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAnswer::into_answer).collect()
  }

  async fn answers_for_session(&self, code: &SessionCode) -> Result<Vec<Answer>> {
    let code_str = code.as_str().to_owned();

    let raws: Vec<RawAnswer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT answer_id, active_question_id, session_code, student_id,
                  text, created_at, updated
           FROM answers WHERE session_code = ?1
           ORDER BY created_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![code_str], |row| {
            Ok(RawAnswer {
              answer_id:          row.get(0)?,
              active_question_id: row.get(1)?,
              session_code:       row.get(2)?,
              student_id:         row.get(3)?,
              text:               row.get(4)?,
              created_at:         row.get(5)?,
              updated:            row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAnswer::into_answer).collect()
  }

  async fn delete_answers_for_session(&self, code: &SessionCode) -> Result<usize> {
    let code_str = code.as_str().to_owned();

    let scope = code_str.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM answers WHERE session_code = ?1",
          rusqlite::params![code_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::Answers, Some(&scope));
    }
    Ok(changed)
  }

  async fn delete_orphaned_answers(&self) -> Result<usize> {
    let changed = self
      .conn
      .call(|conn| {
        Ok(conn.execute(
          "DELETE FROM answers WHERE active_question_id NOT IN
             (SELECT question_id FROM active_questions)",
          [],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::Answers, None);
    }
    Ok(changed)
  }

  // ── Points ────────────────────────────────────────────────────────────────

  async fn get_points(&self, student_id: &str) -> Result<Option<PointsRecord>> {
    let student = student_id.to_owned();

    let raw: Option<RawPoints> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT student_id, total, last_updated FROM points
             WHERE student_id = ?1",
            rusqlite::params![student],
            |row| {
              Ok(RawPoints {
                student_id:   row.get(0)?,
                total:        row.get(1)?,
                last_updated: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPoints::into_points).transpose()
  }

  async fn put_points(&self, record: PointsRecord) -> Result<()> {
    let student = record.student_id;
    let total   = record.total;
    let at_ms   = encode_ts(record.last_updated);

    let scope = student.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO points (student_id, total, last_updated)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![student, total, at_ms],
        )?;
        Ok(())
      })
      .await?;

    self.notify(Collection::Points, Some(&scope));
    Ok(())
  }

  // ── Joined-class links ────────────────────────────────────────────────────

  async fn put_joined_link(&self, link: JoinedClassLink) -> Result<()> {
    let student  = link.student_id;
    let code_str = link.session_code.as_str().to_owned();
    let name     = link.class_name;
    let at_ms    = encode_ts(link.joined_at);

    let scope = student.clone();
    self
      .conn
      .call(move |conn| {
        // PRIMARY KEY on student_id makes this the overwrite-on-rejoin.
        conn.execute(
          "INSERT OR REPLACE INTO joined_class_links (
             student_id, session_code, class_name, joined_at
           ) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![student, code_str, name, at_ms],
        )?;
        Ok(())
      })
      .await?;

    self.notify(Collection::JoinedClassLinks, Some(&scope));
    Ok(())
  }

  async fn joined_link(&self, student_id: &str) -> Result<Option<JoinedClassLink>> {
    let student = student_id.to_owned();

    let raw: Option<RawJoinedLink> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT student_id, session_code, class_name, joined_at
             FROM joined_class_links WHERE student_id = ?1",
            rusqlite::params![student],
            |row| {
              Ok(RawJoinedLink {
                student_id:   row.get(0)?,
                session_code: row.get(1)?,
                class_name:   row.get(2)?,
                joined_at:    row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawJoinedLink::into_link).transpose()
  }

  async fn delete_joined_link(&self, student_id: &str) -> Result<bool> {
    let student = student_id.to_owned();

    let scope = student.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM joined_class_links WHERE student_id = ?1",
          rusqlite::params![student],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::JoinedClassLinks, Some(&scope));
    }
    Ok(changed > 0)
  }

  async fn delete_joined_links_for_session(&self, code: &SessionCode) -> Result<usize> {
    let code_str = code.as_str().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM joined_class_links WHERE session_code = ?1",
          rusqlite::params![code_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.notify(Collection::JoinedClassLinks, None);
    }
    Ok(changed)
  }

  // ── Change feed ───────────────────────────────────────────────────────────

  fn changes(&self) -> broadcast::Receiver<ChangeNotice> {
    self.change_tx.subscribe()
  }
}
