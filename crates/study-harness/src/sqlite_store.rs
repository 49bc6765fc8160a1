//! SQLite-backed [`ScheduleStore`] implementation.
//!
//! Maps each store operation onto the `study_schedule` and
//! `quiz_results` tables. [`apply_review`] runs its read-modify-write
//! inside one transaction ending in a single-row upsert, so concurrent
//! submissions for the same `(student, topic)` never lose updates.
//!
//! Dates are stored as ISO `YYYY-MM-DD` text; lexicographic comparison
//! matches chronological order.
//!
//! [`apply_review`]: ScheduleStore::apply_review

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

use study_harness_core::models::{QuizResult, ReviewRecord};
use study_harness_core::schedule;
use study_harness_core::store::{ScheduleStore, TopicAccuracy};

/// SQLite implementation of the [`ScheduleStore`] trait.
pub struct SqliteScheduleStore {
    pool: SqlitePool,
}

impl SqliteScheduleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_date(s: &str) -> NaiveDate {
    s.parse().unwrap_or_default()
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> ReviewRecord {
    ReviewRecord {
        student_id: row.get("student_id"),
        topic: row.get("topic"),
        ease_factor: row.get("ease_factor"),
        interval_days: row.get("interval_days"),
        repetitions: row.get("repetitions"),
        next_review_date: parse_date(&row.get::<String, _>("next_review")),
        last_reviewed_date: parse_date(&row.get::<String, _>("last_reviewed")),
    }
}

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    async fn get_record(&self, student_id: &str, topic: &str) -> Result<Option<ReviewRecord>> {
        let row = sqlx::query(
            "SELECT student_id, topic, ease_factor, interval_days, repetitions, next_review, last_reviewed
             FROM study_schedule WHERE student_id = ? AND topic = ?",
        )
        .bind(student_id)
        .bind(topic)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn apply_review(
        &self,
        student_id: &str,
        topic: &str,
        is_correct: bool,
        today: NaiveDate,
    ) -> Result<ReviewRecord> {
        let mut tx = self.pool.begin().await?;

        let prior = sqlx::query(
            "SELECT student_id, topic, ease_factor, interval_days, repetitions, next_review, last_reviewed
             FROM study_schedule WHERE student_id = ? AND topic = ?",
        )
        .bind(student_id)
        .bind(topic)
        .fetch_optional(&mut *tx)
        .await?
        .as_ref()
        .map(row_to_record);

        let next = schedule::apply_review(prior.as_ref(), student_id, topic, is_correct, today);

        sqlx::query(
            r#"
            INSERT INTO study_schedule
                (student_id, topic, ease_factor, interval_days, repetitions, next_review, last_reviewed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(student_id, topic) DO UPDATE SET
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                next_review = excluded.next_review,
                last_reviewed = excluded.last_reviewed
            "#,
        )
        .bind(&next.student_id)
        .bind(&next.topic)
        .bind(next.ease_factor)
        .bind(next.interval_days)
        .bind(next.repetitions)
        .bind(next.next_review_date.to_string())
        .bind(next.last_reviewed_date.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(next)
    }

    async fn due(&self, student_id: &str, today: NaiveDate) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query(
            "SELECT student_id, topic, ease_factor, interval_days, repetitions, next_review, last_reviewed
             FROM study_schedule
             WHERE student_id = ? AND next_review <= ?
             ORDER BY next_review ASC",
        )
        .bind(student_id)
        .bind(today.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn upcoming(
        &self,
        student_id: &str,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query(
            "SELECT student_id, topic, ease_factor, interval_days, repetitions, next_review, last_reviewed
             FROM study_schedule
             WHERE student_id = ? AND next_review > ?
             ORDER BY next_review ASC LIMIT ?",
        )
        .bind(student_id)
        .bind(today.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn mastered_count(&self, student_id: &str, min_interval_days: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM study_schedule WHERE student_id = ? AND interval_days >= ?",
        )
        .bind(student_id)
        .bind(min_interval_days)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn record_quiz_result(&self, result: &QuizResult) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quiz_results
                (student_id, topic, question, student_answer, correct_answer, is_correct, recorded_on)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.student_id)
        .bind(&result.topic)
        .bind(&result.question)
        .bind(&result.student_answer)
        .bind(&result.correct_answer)
        .bind(result.is_correct)
        .bind(result.recorded_on.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn study_days(&self, student_id: &str, since: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT recorded_on) FROM quiz_results
             WHERE student_id = ? AND recorded_on >= ?",
        )
        .bind(student_id)
        .bind(since.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn topic_accuracy(&self, student_id: &str) -> Result<Vec<TopicAccuracy>> {
        let rows = sqlx::query(
            r#"
            SELECT topic,
                   COUNT(*) AS total,
                   SUM(CASE WHEN is_correct THEN 1 ELSE 0 END) AS correct
            FROM quiz_results
            WHERE student_id = ?
            GROUP BY topic
            ORDER BY (CAST(SUM(CASE WHEN is_correct THEN 1 ELSE 0 END) AS FLOAT) / COUNT(*)), topic
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TopicAccuracy {
                topic: row.get("topic"),
                total: row.get("total"),
                correct: row.get("correct"),
            })
            .collect())
    }
}
