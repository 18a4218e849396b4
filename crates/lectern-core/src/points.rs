//! Per-student running point totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One student's running total. Independent of any session; floored at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRecord {
  pub student_id:   String,
  pub total:        i64,
  pub last_updated: DateTime<Utc>,
}

impl PointsRecord {
  /// A fresh zero-total record, used when a student has no row yet.
  pub fn zero(student_id: impl Into<String>, at: DateTime<Utc>) -> Self {
    Self {
      student_id:   student_id.into(),
      total:        0,
      last_updated: at,
    }
  }

  /// Apply a signed delta, flooring the total at zero.
  pub fn apply_delta(&mut self, delta: i64, at: DateTime<Utc>) {
    self.total = (self.total + delta).max(0);
    self.last_updated = at;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn delta_floors_at_zero() {
    let now = Utc::now();
    let mut rec = PointsRecord::zero("s1", now);
    rec.apply_delta(2, now);
    assert_eq!(rec.total, 2);
    rec.apply_delta(-5, now);
    assert_eq!(rec.total, 0);
    rec.apply_delta(3, now);
    assert_eq!(rec.total, 3);
  }
}
