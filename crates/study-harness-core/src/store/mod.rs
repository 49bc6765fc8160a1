//! Storage abstraction for the review scheduler.
//!
//! The [`ScheduleStore`] trait defines every operation the scheduler
//! needs from its storage collaborator, enabling pluggable backends
//! (SQLite in the application crate, in-memory here for tests).
//!
//! Implementations must be `Send + Sync`, and [`apply_review`] must be
//! atomic per `(student_id, topic)` — a read-modify-write as one unit —
//! so concurrent quiz submissions for the same topic never lose updates.
//!
//! [`apply_review`]: ScheduleStore::apply_review

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{QuizResult, ReviewRecord};

/// Per-topic answer accuracy, used to derive weak areas.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicAccuracy {
    pub topic: String,
    pub total: i64,
    pub correct: i64,
}

/// Abstract storage backend for review schedules and quiz results.
///
/// All queries are scoped to a single student; there is no
/// cross-student aggregation.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Fetch the record for one `(student, topic)` pair, if scheduled.
    async fn get_record(&self, student_id: &str, topic: &str) -> Result<Option<ReviewRecord>>;

    /// Atomically apply one graded answer: read the prior record, run
    /// the SM-2 transition, and upsert the result as one unit.
    /// Returns the updated record.
    async fn apply_review(
        &self,
        student_id: &str,
        topic: &str,
        is_correct: bool,
        today: NaiveDate,
    ) -> Result<ReviewRecord>;

    /// Topics with `next_review_date <= today`, ascending by date.
    async fn due(&self, student_id: &str, today: NaiveDate) -> Result<Vec<ReviewRecord>>;

    /// Topics with `next_review_date > today`, ascending, capped at `limit`.
    async fn upcoming(
        &self,
        student_id: &str,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<ReviewRecord>>;

    /// Count of topics whose interval has reached the mastery threshold.
    async fn mastered_count(&self, student_id: &str, min_interval_days: i64) -> Result<i64>;

    /// Persist one graded answer event.
    async fn record_quiz_result(&self, result: &QuizResult) -> Result<()>;

    /// Distinct calendar days with at least one recorded answer on or
    /// after `since`.
    async fn study_days(&self, student_id: &str, since: NaiveDate) -> Result<i64>;

    /// Per-topic answer totals, worst accuracy first.
    async fn topic_accuracy(&self, student_id: &str) -> Result<Vec<TopicAccuracy>>;
}
