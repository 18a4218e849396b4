//! The `ClassStore` trait and change-feed types.
//!
//! The trait abstracts a push-based document store: typed put/get/query
//! methods per collection, upsert semantics on every `put_*`, and a
//! broadcast change feed that announces which collection a write touched.
//! It is implemented by storage backends (e.g. `lectern-store-sqlite`);
//! the sync layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  answer::Answer,
  points::PointsRecord,
  question::{ActiveQuestion, Question, QuestionLink},
  session::{ClassSession, JoinedClassLink, SessionCode, SessionStatus},
};

// ─── Change feed ─────────────────────────────────────────────────────────────

/// The logical collections a backend persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
  Sessions,
  Questions,
  QuestionLinks,
  ActiveQuestions,
  Answers,
  Points,
  JoinedClassLinks,
}

/// Announcement that a write touched a collection.
///
/// Carries no payload — subscribers re-run their own query, so a dropped or
/// lagged notice costs only a refetch, never lost data.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
  pub collection: Collection,
  /// Session code or student id the write was scoped to, when known.
  pub scope:      Option<String>,
}

impl ChangeNotice {
  /// Does this notice concern `collection`, optionally narrowed to `scope`?
  pub fn matches(&self, collection: Collection, scope: Option<&str>) -> bool {
    self.collection == collection
      && match (scope, self.scope.as_deref()) {
        (Some(want), Some(got)) => want == got,
        // Either side unscoped: assume it concerns us.
        _ => true,
      }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Lectern storage backend.
///
/// Writes are upserts keyed on the record's id field; queries mirror the
/// indexed shapes the sync layer needs. All methods return `Send` futures so
/// the trait can be used from multi-threaded async runtimes.
pub trait ClassStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn put_session(
    &self,
    session: ClassSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ClassSession>, Self::Error>> + Send + '_;

  /// Look up a session by join code, restricted to the given status.
  fn session_by_code<'a>(
    &'a self,
    code: &'a SessionCode,
    status: SessionStatus,
  ) -> impl Future<Output = Result<Option<ClassSession>, Self::Error>> + Send + 'a;

  /// Set the status and bump `last_active_at`. Returns `false` if the
  /// session does not exist.
  fn set_session_status(
    &self,
    id: Uuid,
    status: SessionStatus,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Bump `last_active_at` only. Returns `false` if the session is missing.
  fn touch_session(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Sessions in `status` whose `last_active_at` is strictly before `cutoff`.
  fn idle_sessions(
    &self,
    status: SessionStatus,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<ClassSession>, Self::Error>> + Send + '_;

  fn delete_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Questions ─────────────────────────────────────────────────────────

  fn put_question(
    &self,
    question: Question,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_question(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  /// All questions for a session, newest first.
  fn questions_for_session<'a>(
    &'a self,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + 'a;

  fn delete_question(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn delete_questions_for_session<'a>(
    &'a self,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Question links (author index) ─────────────────────────────────────

  fn put_question_link(
    &self,
    link: QuestionLink,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn links_for_author<'a>(
    &'a self,
    author_id: &'a str,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<Vec<QuestionLink>, Self::Error>> + Send + 'a;

  fn delete_question_link(
    &self,
    question_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn delete_question_links_for_session<'a>(
    &'a self,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Active questions ──────────────────────────────────────────────────

  fn put_active_question(
    &self,
    question: ActiveQuestion,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_active_question(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ActiveQuestion>, Self::Error>> + Send + '_;

  /// The live question for a session: `active = true`, newest first, limit 1.
  fn active_for_session<'a>(
    &'a self,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<Option<ActiveQuestion>, Self::Error>> + Send + 'a;

  /// Remove every active-question row for a session (live or superseded).
  fn delete_active_for_session<'a>(
    &'a self,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Answers ───────────────────────────────────────────────────────────

  fn put_answer(
    &self,
    answer: Answer,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The upsert probe: one student's answer to one active question.
  fn answer_for_student<'a>(
    &'a self,
    active_question_id: Uuid,
    student_id: &'a str,
  ) -> impl Future<Output = Result<Option<Answer>, Self::Error>> + Send + 'a;

  /// All answers to an active question, oldest first.
  fn answers_for_question(
    &self,
    active_question_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Answer>, Self::Error>> + Send + '_;

  fn answers_for_session<'a>(
    &'a self,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<Vec<Answer>, Self::Error>> + Send + 'a;

  fn delete_answers_for_session<'a>(
    &'a self,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Delete answers whose `active_question_id` no longer resolves.
  fn delete_orphaned_answers(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Points ────────────────────────────────────────────────────────────

  fn get_points<'a>(
    &'a self,
    student_id: &'a str,
  ) -> impl Future<Output = Result<Option<PointsRecord>, Self::Error>> + Send + 'a;

  fn put_points(
    &self,
    record: PointsRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Joined-class links ────────────────────────────────────────────────

  /// Upsert keyed on `student_id` — re-joining overwrites the old link.
  fn put_joined_link(
    &self,
    link: JoinedClassLink,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn joined_link<'a>(
    &'a self,
    student_id: &'a str,
  ) -> impl Future<Output = Result<Option<JoinedClassLink>, Self::Error>> + Send + 'a;

  fn delete_joined_link<'a>(
    &'a self,
    student_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn delete_joined_links_for_session<'a>(
    &'a self,
    code: &'a SessionCode,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Change feed ───────────────────────────────────────────────────────

  /// Open a receiver on the store's change feed. Every successful write
  /// publishes one [`ChangeNotice`] after it is durable.
  fn changes(&self) -> broadcast::Receiver<ChangeNotice>;
}
