//! Study plan reporting: what is due, what comes next, and how the
//! student is tracking.

use anyhow::Result;
use chrono::{Duration, NaiveDate};

use study_harness_core::schedule::{
    StudyPlan, MASTERY_INTERVAL_DAYS, STUDY_DAY_WINDOW_DAYS, UPCOMING_LIMIT,
};
use study_harness_core::store::ScheduleStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteScheduleStore;

/// Assemble a study plan from any schedule store.
pub async fn build_plan<S: ScheduleStore>(
    store: &S,
    student: &str,
    today: NaiveDate,
) -> Result<StudyPlan> {
    let due_for_review = store.due(student, today).await?;
    let upcoming = store.upcoming(student, today, UPCOMING_LIMIT).await?;
    let mastered_count = store.mastered_count(student, MASTERY_INTERVAL_DAYS).await?;
    let study_days_30d = store
        .study_days(student, today - Duration::days(STUDY_DAY_WINDOW_DAYS))
        .await?;

    Ok(StudyPlan {
        due_for_review,
        upcoming,
        mastered_count,
        study_days_30d,
    })
}

pub async fn run_plan(config: &Config, student: &str, today: NaiveDate) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteScheduleStore::new(pool);
    let plan = build_plan(&store, student, today).await?;

    println!("Study plan for {}", student);
    println!();

    if plan.due_for_review.is_empty() {
        println!("  Due for review: nothing — all caught up");
    } else {
        println!("  Due for review:");
        for r in &plan.due_for_review {
            println!(
                "    {} (due {}, interval {}d, reps {})",
                r.topic, r.next_review_date, r.interval_days, r.repetitions
            );
        }
    }

    if !plan.upcoming.is_empty() {
        println!("  Upcoming:");
        for r in &plan.upcoming {
            println!("    {} on {}", r.topic, r.next_review_date);
        }
    }

    println!("  Mastered topics: {}", plan.mastered_count);
    println!("  Study days (last 30): {}", plan.study_days_30d);

    Ok(())
}
