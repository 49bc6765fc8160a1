//! Simplified SM-2 spaced-repetition transition.
//!
//! Pure state machine over [`ReviewRecord`]: given the prior record (or
//! none) and a correctness signal, produce the next record. Storage and
//! atomicity live behind [`crate::store::ScheduleStore`]; `today` is
//! always a parameter so tests can pin dates.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::ReviewRecord;

/// Ease factor assigned to a topic on its first graded answer.
pub const INITIAL_EASE: f64 = 2.5;
/// Hard floor for the ease factor in both directions.
pub const MIN_EASE: f64 = 1.3;
/// Ease gained on a correct answer.
pub const EASE_BONUS: f64 = 0.1;
/// Ease lost on an incorrect answer.
pub const EASE_PENALTY: f64 = 0.2;
/// A topic whose interval has grown to this many days counts as mastered.
pub const MASTERY_INTERVAL_DAYS: i64 = 14;
/// Maximum upcoming reviews returned in a study plan.
pub const UPCOMING_LIMIT: usize = 10;
/// Window for the distinct-study-day streak.
pub const STUDY_DAY_WINDOW_DAYS: i64 = 30;

/// Apply one graded answer to a topic's schedule.
///
/// A missing prior record means this is the topic's first occurrence
/// (also the recovery path for lost state): it starts at ease 2.5,
/// interval 1, repetitions 0. Correct answers walk the interval through
/// 1 → 3 → round(interval × ease); incorrect answers reset to a 1-day
/// interval and zero repetitions.
pub fn apply_review(
    prior: Option<&ReviewRecord>,
    student_id: &str,
    topic: &str,
    is_correct: bool,
    today: NaiveDate,
) -> ReviewRecord {
    let (mut ease, mut interval, mut reps) = match prior {
        Some(r) => (r.ease_factor, r.interval_days, r.repetitions),
        None => (INITIAL_EASE, 1, 0),
    };

    if is_correct {
        reps += 1;
        interval = match reps {
            1 => 1,
            2 => 3,
            _ => (interval as f64 * ease).round() as i64,
        };
        ease = (ease + EASE_BONUS).max(MIN_EASE);
    } else {
        reps = 0;
        interval = 1;
        ease = (ease - EASE_PENALTY).max(MIN_EASE);
    }

    ReviewRecord {
        student_id: student_id.to_string(),
        topic: topic.to_string(),
        ease_factor: ease,
        interval_days: interval,
        repetitions: reps,
        next_review_date: today + Duration::days(interval),
        last_reviewed_date: today,
    }
}

/// A student's schedule at a glance: what is due, what comes next, and
/// two coarse progress signals.
#[derive(Debug, Clone, Serialize)]
pub struct StudyPlan {
    pub due_for_review: Vec<ReviewRecord>,
    pub upcoming: Vec<ReviewRecord>,
    pub mastered_count: i64,
    pub study_days_30d: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn first_answer_creates_record_lazily() {
        let r = apply_review(None, "ada", "optics", true, day("2026-08-07"));
        assert_eq!(r.repetitions, 1);
        assert_eq!(r.interval_days, 1);
        assert_eq!(r.next_review_date, day("2026-08-08"));
        assert_eq!(r.last_reviewed_date, day("2026-08-07"));
        assert!((r.ease_factor - (INITIAL_EASE + EASE_BONUS)).abs() < 1e-9);
    }

    #[test]
    fn three_correct_answers_walk_the_interval() {
        let today = day("2026-08-07");
        let r1 = apply_review(None, "ada", "optics", true, today);
        assert_eq!(r1.interval_days, 1);

        let r2 = apply_review(Some(&r1), "ada", "optics", true, today);
        assert_eq!(r2.interval_days, 3);

        let r3 = apply_review(Some(&r2), "ada", "optics", true, today);
        let expected = (3.0 * r2.ease_factor).round() as i64;
        assert_eq!(r3.interval_days, expected);
        assert!(r3.interval_days > 1);
        assert_eq!(r3.repetitions, 3);
    }

    #[test]
    fn incorrect_answer_resets_from_any_state() {
        let today = day("2026-08-07");
        let mut r = apply_review(None, "ada", "optics", true, today);
        for _ in 0..4 {
            r = apply_review(Some(&r), "ada", "optics", true, today);
        }
        assert!(r.interval_days > 3);

        let reset = apply_review(Some(&r), "ada", "optics", false, today);
        assert_eq!(reset.interval_days, 1);
        assert_eq!(reset.repetitions, 0);
        assert!(reset.ease_factor < r.ease_factor);
        assert_eq!(reset.next_review_date, day("2026-08-08"));
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let today = day("2026-08-07");
        let mut r = apply_review(None, "ada", "optics", false, today);
        for _ in 0..20 {
            r = apply_review(Some(&r), "ada", "optics", false, today);
        }
        assert!((r.ease_factor - MIN_EASE).abs() < 1e-9);
    }

    #[test]
    fn missing_record_after_reset_behaves_as_first_occurrence() {
        // Scheduler state corruption is treated as "first occurrence".
        let r = apply_review(None, "ada", "waves", false, day("2026-08-07"));
        assert_eq!(r.interval_days, 1);
        assert_eq!(r.repetitions, 0);
        assert!((r.ease_factor - (INITIAL_EASE - EASE_PENALTY)).abs() < 1e-9);
    }
}
