//! The real-time synchronization core of the Lectern classroom tool.
//!
//! Sits between the user-facing views and any [`ClassStore`] backend:
//! services write through the store and invalidate the shared snapshot
//! cache; all live reads go through the change-feed cache layer in
//! [`feed`], which debounces store notifications and serves cached
//! snapshots while authoritative data is on its way.
//!
//! Rendering, routing, auth, and the scheduler that triggers
//! [`sweeper::Sweeper::sweep`] are the caller's responsibility.

pub mod active;
pub mod answers;
pub mod config;
pub mod feed;
pub mod points;
pub mod questions;
pub mod sessions;
pub mod sweeper;

use std::sync::Arc;

use lectern_core::store::ClassStore;
pub use lectern_core::{Error, Result};

pub use crate::{
  config::SyncConfig,
  feed::{FeedHandle, FeedOptions, SnapshotCache},
  sweeper::SweepReport,
};

/// All sync services over one store, sharing one snapshot cache.
///
/// The construction seam for dependency injection: tests build one per
/// in-memory store and get fully isolated cache state.
pub struct Classroom<S> {
  pub sessions:  sessions::SessionDirectory<S>,
  pub questions: questions::QuestionLedger<S>,
  pub active:    active::ActiveQuestionController<S>,
  pub answers:   answers::AnswerCollector<S>,
  pub points:    points::PointsLedger<S>,
  pub sweeper:   sweeper::Sweeper<S>,
}

impl<S: ClassStore + 'static> Classroom<S> {
  pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
    let cache = Arc::new(SnapshotCache::new(config.cache_ttl()));
    Self {
      sessions:  sessions::SessionDirectory::new(Arc::clone(&store), Arc::clone(&cache)),
      questions: questions::QuestionLedger::new(Arc::clone(&store), Arc::clone(&cache)),
      active:    active::ActiveQuestionController::new(
        Arc::clone(&store),
        Arc::clone(&cache),
      ),
      answers:   answers::AnswerCollector::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        config.answer_feed_wait(),
      ),
      points:    points::PointsLedger::new(Arc::clone(&store), Arc::clone(&cache)),
      sweeper:   sweeper::Sweeper::new(store, &config),
    }
  }
}
