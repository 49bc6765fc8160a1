//! Quiz grading and schedule updates.
//!
//! Grading is deliberately dumb string comparison — the quiz questions
//! themselves come from the collaborator LLM, which also supplies the
//! expected answer. A graded answer is recorded as a quiz result and
//! drives one atomic SM-2 schedule update.

use anyhow::Result;
use chrono::NaiveDate;

use study_harness_core::models::QuizResult;
use study_harness_core::store::ScheduleStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteScheduleStore;

/// Case- and whitespace-insensitive answer comparison.
pub fn grade_answer(student_answer: &str, expected: &str) -> bool {
    student_answer.trim().to_lowercase() == expected.trim().to_lowercase()
}

#[allow(clippy::too_many_arguments)]
pub async fn run_quiz(
    config: &Config,
    student: &str,
    topic: &str,
    question: &str,
    answer: &str,
    expected: &str,
    today: NaiveDate,
) -> Result<()> {
    let is_correct = grade_answer(answer, expected);

    let pool = db::connect(config).await?;
    let store = SqliteScheduleStore::new(pool);

    store
        .record_quiz_result(&QuizResult {
            student_id: student.to_string(),
            topic: topic.to_string(),
            question: question.to_string(),
            student_answer: answer.to_string(),
            correct_answer: expected.to_string(),
            is_correct,
            recorded_on: today,
        })
        .await?;

    let record = store.apply_review(student, topic, is_correct, today).await?;

    if is_correct {
        println!("correct");
    } else {
        println!("incorrect — expected: {}", expected);
    }
    println!("  topic: {}", record.topic);
    println!("  repetitions: {}", record.repetitions);
    println!(
        "  interval: {} day{}",
        record.interval_days,
        if record.interval_days == 1 { "" } else { "s" }
    );
    println!("  next review: {}", record.next_review_date);

    Ok(())
}
