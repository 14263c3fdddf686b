use sqlx::{FromRow, PgPool};

use crate::db::models::QuizResult;
use crate::db::types::AttemptStatus;

const COLUMNS: &str = "\
    id, attempt_id, total_questions, correct_answers, wrong_answers, unanswered, \
    total_score, max_score, percentage, passed, created_at, updated_at";

const QUALIFIED_COLUMNS: &str = "\
    r.id, r.attempt_id, r.total_questions, r.correct_answers, r.wrong_answers, r.unanswered, \
    r.total_score, r.max_score, r.percentage, r.passed, r.created_at, r.updated_at";

/// Result joined with its attempt and quiz title.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ResultWithQuiz {
    #[sqlx(flatten)]
    pub(crate) result: QuizResult,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) time_taken_seconds: Option<i32>,
}

#[derive(Debug, Clone, Default, FromRow)]
pub(crate) struct ResultTotals {
    pub(crate) total: i64,
    pub(crate) passed: i64,
    pub(crate) failed: i64,
    pub(crate) average_percentage: Option<f64>,
}

pub(crate) struct UpsertResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) wrong_answers: i32,
    pub(crate) unanswered: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
    pub(crate) now: time::PrimitiveDateTime,
}

/// Keyed on the attempt; a re-run overwrites every aggregate.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertResult<'_>,
) -> Result<QuizResult, sqlx::Error> {
    sqlx::query_as::<_, QuizResult>(&format!(
        "INSERT INTO quiz_results (
            id, attempt_id, total_questions, correct_answers, wrong_answers, unanswered,
            total_score, max_score, percentage, passed, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
        ON CONFLICT (attempt_id) DO UPDATE SET
            total_questions = EXCLUDED.total_questions,
            correct_answers = EXCLUDED.correct_answers,
            wrong_answers = EXCLUDED.wrong_answers,
            unanswered = EXCLUDED.unanswered,
            total_score = EXCLUDED.total_score,
            max_score = EXCLUDED.max_score,
            percentage = EXCLUDED.percentage,
            passed = EXCLUDED.passed,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.total_questions)
    .bind(params.correct_answers)
    .bind(params.wrong_answers)
    .bind(params.unanswered)
    .bind(params.total_score)
    .bind(params.max_score)
    .bind(params.percentage)
    .bind(params.passed)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Option<QuizResult>, sqlx::Error> {
    sqlx::query_as::<_, QuizResult>(&format!(
        "SELECT {COLUMNS} FROM quiz_results WHERE attempt_id = $1"
    ))
    .bind(attempt_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn best_for_student_quiz(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
) -> Result<Option<QuizResult>, sqlx::Error> {
    sqlx::query_as::<_, QuizResult>(&format!(
        "SELECT {QUALIFIED_COLUMNS} FROM quiz_results r
         JOIN quiz_attempts a ON a.id = r.attempt_id
         WHERE a.student_id = $1 AND a.quiz_id = $2
         ORDER BY r.percentage DESC, r.created_at ASC
         LIMIT 1"
    ))
    .bind(student_id)
    .bind(quiz_id)
    .fetch_optional(pool)
    .await
}

/// Newest first.
pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ResultWithQuiz>, sqlx::Error> {
    sqlx::query_as::<_, ResultWithQuiz>(&format!(
        "SELECT {QUALIFIED_COLUMNS},
                a.quiz_id, q.title AS quiz_title, a.status, a.started_at, a.time_taken_seconds
         FROM quiz_results r
         JOIN quiz_attempts a ON a.id = r.attempt_id
         JOIN quizzes q ON q.id = a.quiz_id
         WHERE a.student_id = $1
         ORDER BY r.created_at DESC
         OFFSET $2 LIMIT $3"
    ))
    .bind(student_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}

/// Oldest first, for score-over-time charts.
pub(crate) async fn timeline_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<ResultWithQuiz>, sqlx::Error> {
    sqlx::query_as::<_, ResultWithQuiz>(&format!(
        "SELECT {QUALIFIED_COLUMNS},
                a.quiz_id, q.title AS quiz_title, a.status, a.started_at, a.time_taken_seconds
         FROM quiz_results r
         JOIN quiz_attempts a ON a.id = r.attempt_id
         JOIN quizzes q ON q.id = a.quiz_id
         WHERE a.student_id = $1
         ORDER BY r.created_at ASC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn totals_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<ResultTotals, sqlx::Error> {
    sqlx::query_as::<_, ResultTotals>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE r.passed) AS passed,
                COUNT(*) FILTER (WHERE NOT r.passed) AS failed,
                AVG(r.percentage) AS average_percentage
         FROM quiz_results r
         JOIN quiz_attempts a ON a.id = r.attempt_id
         WHERE a.student_id = $1",
    )
    .bind(student_id)
    .fetch_one(pool)
    .await
}
