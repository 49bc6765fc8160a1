//! In-memory [`ScheduleStore`] implementation for tests.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. The write lock
//! spans the whole read-modify-write in [`apply_review`], giving the
//! same per-pair atomicity the SQLite backend gets from a transaction.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{QuizResult, ReviewRecord};
use crate::schedule;

use super::{ScheduleStore, TopicAccuracy};

/// In-memory store keyed by `(student_id, topic)`.
pub struct InMemoryScheduleStore {
    records: RwLock<HashMap<(String, String), ReviewRecord>>,
    results: RwLock<Vec<QuizResult>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            results: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryScheduleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn get_record(&self, student_id: &str, topic: &str) -> Result<Option<ReviewRecord>> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&(student_id.to_string(), topic.to_string()))
            .cloned())
    }

    async fn apply_review(
        &self,
        student_id: &str,
        topic: &str,
        is_correct: bool,
        today: NaiveDate,
    ) -> Result<ReviewRecord> {
        let mut records = self.records.write().unwrap();
        let key = (student_id.to_string(), topic.to_string());
        let next = schedule::apply_review(records.get(&key), student_id, topic, is_correct, today);
        records.insert(key, next.clone());
        Ok(next)
    }

    async fn due(&self, student_id: &str, today: NaiveDate) -> Result<Vec<ReviewRecord>> {
        let records = self.records.read().unwrap();
        let mut due: Vec<ReviewRecord> = records
            .values()
            .filter(|r| r.student_id == student_id && r.next_review_date <= today)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.next_review_date.cmp(&b.next_review_date));
        Ok(due)
    }

    async fn upcoming(
        &self,
        student_id: &str,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<ReviewRecord>> {
        let records = self.records.read().unwrap();
        let mut upcoming: Vec<ReviewRecord> = records
            .values()
            .filter(|r| r.student_id == student_id && r.next_review_date > today)
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| a.next_review_date.cmp(&b.next_review_date));
        upcoming.truncate(limit);
        Ok(upcoming)
    }

    async fn mastered_count(&self, student_id: &str, min_interval_days: i64) -> Result<i64> {
        let records = self.records.read().unwrap();
        Ok(records
            .values()
            .filter(|r| r.student_id == student_id && r.interval_days >= min_interval_days)
            .count() as i64)
    }

    async fn record_quiz_result(&self, result: &QuizResult) -> Result<()> {
        self.results.write().unwrap().push(result.clone());
        Ok(())
    }

    async fn study_days(&self, student_id: &str, since: NaiveDate) -> Result<i64> {
        let results = self.results.read().unwrap();
        let days: HashSet<NaiveDate> = results
            .iter()
            .filter(|r| r.student_id == student_id && r.recorded_on >= since)
            .map(|r| r.recorded_on)
            .collect();
        Ok(days.len() as i64)
    }

    async fn topic_accuracy(&self, student_id: &str) -> Result<Vec<TopicAccuracy>> {
        let results = self.results.read().unwrap();
        let mut by_topic: HashMap<String, (i64, i64)> = HashMap::new();
        for r in results.iter().filter(|r| r.student_id == student_id) {
            let entry = by_topic.entry(r.topic.clone()).or_insert((0, 0));
            entry.0 += 1;
            if r.is_correct {
                entry.1 += 1;
            }
        }
        let mut out: Vec<TopicAccuracy> = by_topic
            .into_iter()
            .map(|(topic, (total, correct))| TopicAccuracy {
                topic,
                total,
                correct,
            })
            .collect();
        out.sort_by(|a, b| {
            let ra = a.correct as f64 / a.total as f64;
            let rb = b.correct as f64 / b.total as f64;
            ra.partial_cmp(&rb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.topic.cmp(&b.topic))
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{MASTERY_INTERVAL_DAYS, UPCOMING_LIMIT};
    use chrono::Duration;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn result(student: &str, topic: &str, correct: bool, on: NaiveDate) -> QuizResult {
        QuizResult {
            student_id: student.to_string(),
            topic: topic.to_string(),
            question: "q".to_string(),
            student_answer: "a".to_string(),
            correct_answer: "a".to_string(),
            is_correct: correct,
            recorded_on: on,
        }
    }

    #[tokio::test]
    async fn apply_review_creates_then_updates_one_record() {
        let store = InMemoryScheduleStore::new();
        let today = day("2026-08-07");

        store.apply_review("ada", "optics", true, today).await.unwrap();
        let updated = store.apply_review("ada", "optics", true, today).await.unwrap();
        assert_eq!(updated.repetitions, 2);
        assert_eq!(updated.interval_days, 3);

        // Still exactly one record for the pair.
        let record = store.get_record("ada", "optics").await.unwrap().unwrap();
        assert_eq!(record, updated);
    }

    #[tokio::test]
    async fn students_are_isolated() {
        let store = InMemoryScheduleStore::new();
        let today = day("2026-08-07");
        store.apply_review("ada", "optics", true, today).await.unwrap();
        store.apply_review("ada", "optics", true, today).await.unwrap();
        store.apply_review("bob", "optics", false, today).await.unwrap();

        let ada = store.get_record("ada", "optics").await.unwrap().unwrap();
        let bob = store.get_record("bob", "optics").await.unwrap().unwrap();
        assert_eq!(ada.repetitions, 2);
        assert_eq!(bob.repetitions, 0);
    }

    #[tokio::test]
    async fn due_and_upcoming_partition_the_schedule() {
        let store = InMemoryScheduleStore::new();
        let today = day("2026-08-07");

        // One answer yesterday (due today) and one today (due tomorrow).
        store
            .apply_review("ada", "waves", true, today - Duration::days(1))
            .await
            .unwrap();
        store.apply_review("ada", "optics", true, today).await.unwrap();

        let due = store.due("ada", today).await.unwrap();
        let upcoming = store.upcoming("ada", today, UPCOMING_LIMIT).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].topic, "waves");
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].topic, "optics");
    }

    #[tokio::test]
    async fn mastered_counts_long_intervals() {
        let store = InMemoryScheduleStore::new();
        let today = day("2026-08-07");
        let mut r = store.apply_review("ada", "optics", true, today).await.unwrap();
        while r.interval_days < MASTERY_INTERVAL_DAYS {
            r = store.apply_review("ada", "optics", true, today).await.unwrap();
        }
        assert_eq!(
            store.mastered_count("ada", MASTERY_INTERVAL_DAYS).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn study_days_count_distinct_dates_in_window() {
        let store = InMemoryScheduleStore::new();
        let today = day("2026-08-07");
        let since = today - Duration::days(30);

        store.record_quiz_result(&result("ada", "a", true, today)).await.unwrap();
        store.record_quiz_result(&result("ada", "b", false, today)).await.unwrap();
        store
            .record_quiz_result(&result("ada", "a", true, today - Duration::days(3)))
            .await
            .unwrap();
        store
            .record_quiz_result(&result("ada", "a", true, today - Duration::days(45)))
            .await
            .unwrap();

        assert_eq!(store.study_days("ada", since).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn topic_accuracy_sorts_weakest_first() {
        let store = InMemoryScheduleStore::new();
        let today = day("2026-08-07");
        store.record_quiz_result(&result("ada", "strong", true, today)).await.unwrap();
        store.record_quiz_result(&result("ada", "weak", false, today)).await.unwrap();
        store.record_quiz_result(&result("ada", "weak", true, today)).await.unwrap();

        let acc = store.topic_accuracy("ada").await.unwrap();
        assert_eq!(acc[0].topic, "weak");
        assert_eq!(acc[0].total, 2);
        assert_eq!(acc[0].correct, 1);
    }
}
