//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use lectern_core::{
  answer::Answer,
  points::PointsRecord,
  question::{ActiveQuestion, Question, QuestionStatus},
  session::{ClassSession, JoinedClassLink, SessionCode, SessionStatus},
  store::{ClassStore, Collection},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn session() -> ClassSession { ClassSession::new("Algorithms 101", "prof") }

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn put_and_get_session() {
  let s = store().await;
  let sess = session();

  s.put_session(sess.clone()).await.unwrap();

  let fetched = s.get_session(sess.session_id).await.unwrap().unwrap();
  assert_eq!(fetched.session_code, sess.session_code);
  assert_eq!(fetched.class_name, "Algorithms 101");
  assert_eq!(fetched.status, SessionStatus::Active);
}

#[tokio::test]
async fn get_session_missing_returns_none() {
  let s = store().await;
  assert!(s.get_session(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn session_by_code_respects_status() {
  let s = store().await;
  let sess = session();
  s.put_session(sess.clone()).await.unwrap();

  let found = s
    .session_by_code(&sess.session_code, SessionStatus::Active)
    .await
    .unwrap();
  assert!(found.is_some());

  s.set_session_status(sess.session_id, SessionStatus::Closed, Utc::now())
    .await
    .unwrap();

  let gone = s
    .session_by_code(&sess.session_code, SessionStatus::Active)
    .await
    .unwrap();
  assert!(gone.is_none());

  let closed = s
    .session_by_code(&sess.session_code, SessionStatus::Closed)
    .await
    .unwrap();
  assert!(closed.is_some());
}

#[tokio::test]
async fn touch_session_bumps_last_active() {
  let s = store().await;
  let sess = session();
  s.put_session(sess.clone()).await.unwrap();

  let later = sess.last_active_at + Duration::minutes(30);
  assert!(s.touch_session(sess.session_id, later).await.unwrap());

  let fetched = s.get_session(sess.session_id).await.unwrap().unwrap();
  assert_eq!(fetched.last_active_at.timestamp_millis(), later.timestamp_millis());
}

#[tokio::test]
async fn touch_missing_session_returns_false() {
  let s = store().await;
  assert!(!s.touch_session(Uuid::new_v4(), Utc::now()).await.unwrap());
}

#[tokio::test]
async fn idle_sessions_filters_by_status_and_cutoff() {
  let s = store().await;
  let now = Utc::now();

  let mut stale = session();
  stale.last_active_at = now - Duration::hours(4);
  let mut fresh = session();
  fresh.last_active_at = now - Duration::minutes(5);

  s.put_session(stale.clone()).await.unwrap();
  s.put_session(fresh.clone()).await.unwrap();

  let idle = s
    .idle_sessions(SessionStatus::Active, now - Duration::hours(3))
    .await
    .unwrap();
  assert_eq!(idle.len(), 1);
  assert_eq!(idle[0].session_id, stale.session_id);
}

// ─── Questions and links ─────────────────────────────────────────────────────

#[tokio::test]
async fn questions_listed_newest_first() {
  let s = store().await;
  let code = SessionCode::generate();
  let now = Utc::now();

  let mut q1 = Question::new(code.clone(), "alice", "first");
  q1.created_at = now - Duration::minutes(2);
  let mut q2 = Question::new(code.clone(), "bob", "second");
  q2.created_at = now - Duration::minutes(1);

  s.put_question(q1.clone()).await.unwrap();
  s.put_question(q2.clone()).await.unwrap();

  let listed = s.questions_for_session(&code).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].question_id, q2.question_id);
  assert_eq!(listed[1].question_id, q1.question_id);
}

#[tokio::test]
async fn put_question_is_an_upsert() {
  let s = store().await;
  let code = SessionCode::generate();

  let mut q = Question::new(code.clone(), "alice", "draft");
  s.put_question(q.clone()).await.unwrap();

  q.text = "final".into();
  q.status = QuestionStatus::Answered;
  s.put_question(q.clone()).await.unwrap();

  let listed = s.questions_for_session(&code).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].text, "final");
  assert_eq!(listed[0].status, QuestionStatus::Answered);
}

#[tokio::test]
async fn links_scoped_to_author_and_session() {
  let s = store().await;
  let code = SessionCode::generate();
  let other = SessionCode::generate();

  let q1 = Question::new(code.clone(), "alice", "mine");
  let q2 = Question::new(code.clone(), "bob", "theirs");
  let q3 = Question::new(other.clone(), "alice", "elsewhere");

  for q in [&q1, &q2, &q3] {
    s.put_question_link(q.link()).await.unwrap();
  }

  let links = s.links_for_author("alice", &code).await.unwrap();
  assert_eq!(links.len(), 1);
  assert_eq!(links[0].question_id, q1.question_id);
}

#[tokio::test]
async fn delete_question_and_link() {
  let s = store().await;
  let code = SessionCode::generate();
  let q = Question::new(code.clone(), "alice", "gone soon");

  s.put_question(q.clone()).await.unwrap();
  s.put_question_link(q.link()).await.unwrap();

  assert!(s.delete_question(q.question_id).await.unwrap());
  assert!(s.delete_question_link(q.question_id).await.unwrap());

  assert!(s.get_question(q.question_id).await.unwrap().is_none());
  assert!(s.links_for_author("alice", &code).await.unwrap().is_empty());
}

// ─── Active questions ────────────────────────────────────────────────────────

#[tokio::test]
async fn active_for_session_picks_latest_live_row() {
  let s = store().await;
  let code = SessionCode::generate();
  let now = Utc::now();

  let mut old = ActiveQuestion::new(code.clone(), "old");
  old.created_at = now - Duration::minutes(5);
  old.active = false;
  let mut live = ActiveQuestion::new(code.clone(), "live");
  live.created_at = now;

  s.put_active_question(old).await.unwrap();
  s.put_active_question(live.clone()).await.unwrap();

  let found = s.active_for_session(&code).await.unwrap().unwrap();
  assert_eq!(found.question_id, live.question_id);
  assert!(found.active);

  let by_id = s.get_active_question(live.question_id).await.unwrap().unwrap();
  assert_eq!(by_id.text, "live");
}

#[tokio::test]
async fn active_for_session_ignores_deactivated_rows() {
  let s = store().await;
  let code = SessionCode::generate();

  let mut q = ActiveQuestion::new(code.clone(), "ended");
  q.active = false;
  s.put_active_question(q).await.unwrap();

  assert!(s.active_for_session(&code).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_active_for_session_clears_all_rows() {
  let s = store().await;
  let code = SessionCode::generate();

  s.put_active_question(ActiveQuestion::new(code.clone(), "a"))
    .await
    .unwrap();
  s.put_active_question(ActiveQuestion::new(code.clone(), "b"))
    .await
    .unwrap();

  let removed = s.delete_active_for_session(&code).await.unwrap();
  assert_eq!(removed, 2);
  assert!(s.active_for_session(&code).await.unwrap().is_none());
}

// ─── Answers ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn answers_listed_oldest_first() {
  let s = store().await;
  let code = SessionCode::generate();
  let aq = ActiveQuestion::new(code.clone(), "q");
  let now = Utc::now();

  let mut a1 = Answer::new(aq.question_id, code.clone(), "alice", "early");
  a1.created_at = now - Duration::seconds(30);
  let mut a2 = Answer::new(aq.question_id, code.clone(), "bob", "late");
  a2.created_at = now;

  s.put_answer(a2.clone()).await.unwrap();
  s.put_answer(a1.clone()).await.unwrap();

  let listed = s.answers_for_question(aq.question_id).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].answer_id, a1.answer_id);
  assert_eq!(listed[1].answer_id, a2.answer_id);
}

#[tokio::test]
async fn answer_for_student_probe() {
  let s = store().await;
  let code = SessionCode::generate();
  let aq = ActiveQuestion::new(code.clone(), "q");

  let ans = Answer::new(aq.question_id, code.clone(), "alice", "42");
  s.put_answer(ans.clone()).await.unwrap();

  let found = s
    .answer_for_student(aq.question_id, "alice")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.answer_id, ans.answer_id);

  assert!(
    s.answer_for_student(aq.question_id, "bob")
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn delete_orphaned_answers_spares_live_ones() {
  let s = store().await;
  let code = SessionCode::generate();

  let live = ActiveQuestion::new(code.clone(), "live");
  s.put_active_question(live.clone()).await.unwrap();

  let kept = Answer::new(live.question_id, code.clone(), "alice", "keep");
  let orphan = Answer::new(Uuid::new_v4(), code.clone(), "bob", "drop");
  s.put_answer(kept.clone()).await.unwrap();
  s.put_answer(orphan).await.unwrap();

  let removed = s.delete_orphaned_answers().await.unwrap();
  assert_eq!(removed, 1);

  let remaining = s.answers_for_session(&code).await.unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].answer_id, kept.answer_id);

  // Nothing left to reap.
  assert_eq!(s.delete_orphaned_answers().await.unwrap(), 0);
}

// ─── Points ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn points_roundtrip_and_overwrite() {
  let s = store().await;
  let now = Utc::now();

  assert!(s.get_points("alice").await.unwrap().is_none());

  let mut rec = PointsRecord::zero("alice", now);
  rec.apply_delta(5, now);
  s.put_points(rec.clone()).await.unwrap();

  let fetched = s.get_points("alice").await.unwrap().unwrap();
  assert_eq!(fetched.total, 5);

  rec.apply_delta(-2, now);
  s.put_points(rec).await.unwrap();
  assert_eq!(s.get_points("alice").await.unwrap().unwrap().total, 3);
}

// ─── Joined-class links ──────────────────────────────────────────────────────

#[tokio::test]
async fn rejoin_overwrites_the_link() {
  let s = store().await;
  let first = SessionCode::generate();
  let second = SessionCode::generate();
  let now = Utc::now();

  s.put_joined_link(JoinedClassLink {
    student_id:   "alice".into(),
    session_code: first,
    class_name:   "Algorithms".into(),
    joined_at:    now,
  })
  .await
  .unwrap();

  s.put_joined_link(JoinedClassLink {
    student_id:   "alice".into(),
    session_code: second.clone(),
    class_name:   "Compilers".into(),
    joined_at:    now,
  })
  .await
  .unwrap();

  let link = s.joined_link("alice").await.unwrap().unwrap();
  assert_eq!(link.session_code, second);
  assert_eq!(link.class_name, "Compilers");

  assert!(s.delete_joined_link("alice").await.unwrap());
  assert!(s.joined_link("alice").await.unwrap().is_none());
}

// ─── Change feed ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn writes_publish_change_notices() {
  let s = store().await;
  let mut rx = s.changes();

  let sess = session();
  let code = sess.session_code.clone();
  s.put_session(sess).await.unwrap();

  let notice = rx.recv().await.unwrap();
  assert_eq!(notice.collection, Collection::Sessions);
  assert_eq!(notice.scope.as_deref(), Some(code.as_str()));

  s.put_points(PointsRecord::zero("alice", Utc::now()))
    .await
    .unwrap();
  let notice = rx.recv().await.unwrap();
  assert_eq!(notice.collection, Collection::Points);
  assert_eq!(notice.scope.as_deref(), Some("alice"));
}

#[tokio::test]
async fn no_notice_when_nothing_changed() {
  let s = store().await;
  let mut rx = s.changes();

  assert!(!s.delete_session(Uuid::new_v4()).await.unwrap());
  assert_eq!(s.delete_orphaned_answers().await.unwrap(), 0);

  assert!(matches!(
    rx.try_recv(),
    Err(tokio::sync::broadcast::error::TryRecvError::Empty)
  ));
}
