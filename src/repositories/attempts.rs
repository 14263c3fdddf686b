use sqlx::{FromRow, PgPool};

use crate::db::models::QuizAttempt;
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, student_id, quiz_id, status, started_at, completed_at, time_taken_seconds";

/// In-progress attempt joined with its quiz, for the dashboard.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ActiveAttemptRow {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) started_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Default, FromRow)]
pub(crate) struct AttemptCounts {
    pub(crate) total: i64,
    pub(crate) completed: i64,
    pub(crate) in_progress: i64,
}

pub(crate) async fn find_for_student(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    student_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1 AND student_id = $2"
    ))
    .bind(attempt_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    quiz_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts
         WHERE student_id = $1 AND quiz_id = $2 AND status = $3"
    ))
    .bind(student_id)
    .bind(quiz_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

/// Returns `false` when another in-progress attempt already holds the
/// `(student, quiz)` slot.
pub(crate) async fn insert_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    student_id: &str,
    quiz_id: &str,
    started_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO quiz_attempts (id, student_id, quiz_id, status, started_at)
         VALUES ($1,$2,$3,$4,$5)
         ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(student_id)
    .bind(quiz_id)
    .bind(AttemptStatus::InProgress)
    .bind(started_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves an in-progress attempt to a terminal status. `None` means the
/// attempt was already finished by someone else.
pub(crate) async fn finish(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: AttemptStatus,
    completed_at: time::PrimitiveDateTime,
    time_taken_seconds: i32,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts
         SET status = $1, completed_at = $2, time_taken_seconds = $3
         WHERE id = $4 AND status = $5
         RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(completed_at)
    .bind(time_taken_seconds)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_student_quiz(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts
         WHERE student_id = $1 AND quiz_id = $2
         ORDER BY started_at DESC"
    ))
    .bind(student_id)
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

/// Latest attempt per quiz among `quiz_ids`.
pub(crate) async fn latest_for_quizzes(
    pool: &PgPool,
    student_id: &str,
    quiz_ids: &[String],
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    if quiz_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT DISTINCT ON (quiz_id) {COLUMNS} FROM quiz_attempts
         WHERE student_id = $1 AND quiz_id = ANY($2)
         ORDER BY quiz_id, started_at DESC"
    ))
    .bind(student_id)
    .bind(quiz_ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn counts_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<AttemptCounts, sqlx::Error> {
    sqlx::query_as::<_, AttemptCounts>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress
         FROM quiz_attempts
         WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn current_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Option<ActiveAttemptRow>, sqlx::Error> {
    sqlx::query_as::<_, ActiveAttemptRow>(
        "SELECT a.id, a.quiz_id, q.title AS quiz_title, q.time_limit_minutes, a.started_at
         FROM quiz_attempts a
         JOIN quizzes q ON q.id = a.quiz_id
         WHERE a.student_id = $1 AND a.status = 'in_progress'
         ORDER BY a.started_at DESC
         LIMIT 1",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
