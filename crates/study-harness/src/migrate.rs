use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Review schedule: one row per (student, topic)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS study_schedule (
            student_id TEXT NOT NULL,
            topic TEXT NOT NULL,
            ease_factor REAL NOT NULL,
            interval_days INTEGER NOT NULL,
            repetitions INTEGER NOT NULL,
            next_review TEXT NOT NULL,
            last_reviewed TEXT NOT NULL,
            PRIMARY KEY (student_id, topic)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Graded answer events, feeding accuracy and study-day queries
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quiz_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            topic TEXT NOT NULL,
            question TEXT NOT NULL,
            student_answer TEXT NOT NULL,
            correct_answer TEXT NOT NULL,
            is_correct INTEGER NOT NULL,
            recorded_on TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schedule_next_review ON study_schedule(student_id, next_review)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_quiz_results_student_day ON quiz_results(student_id, recorded_on)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
