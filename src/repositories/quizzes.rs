use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::db::models::Quiz;

const COLUMNS: &str = "\
    id, title, description, time_limit_minutes, passing_score, is_active, created_by, \
    created_at, updated_at";

const QUALIFIED_COLUMNS: &str = "\
    q.id, q.title, q.description, q.time_limit_minutes, q.passing_score, q.is_active, \
    q.created_by, q.created_at, q.updated_at";

/// Quiz row with aggregates over its questions.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuizWithStats {
    #[sqlx(flatten)]
    pub(crate) quiz: Quiz,
    pub(crate) question_count: i64,
    pub(crate) max_score: i64,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_with_stats(
    pool: &PgPool,
    id: &str,
) -> Result<Option<QuizWithStats>, sqlx::Error> {
    sqlx::query_as::<_, QuizWithStats>(&format!(
        "SELECT {QUALIFIED_COLUMNS},
                COUNT(qs.id) AS question_count,
                COALESCE(SUM(qs.score), 0)::BIGINT AS max_score
         FROM quizzes q
         LEFT JOIN questions qs ON qs.quiz_id = q.id
         WHERE q.id = $1
         GROUP BY q.id"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Newest first. `active_only` restricts to quizzes visible to students.
pub(crate) async fn list_with_stats(
    pool: &PgPool,
    active_only: bool,
    skip: i64,
    limit: i64,
) -> Result<Vec<QuizWithStats>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {QUALIFIED_COLUMNS},
                COUNT(qs.id) AS question_count,
                COALESCE(SUM(qs.score), 0)::BIGINT AS max_score
         FROM quizzes q
         LEFT JOIN questions qs ON qs.quiz_id = q.id"
    ));

    if active_only {
        builder.push(" WHERE q.is_active = TRUE");
    }

    builder.push(" GROUP BY q.id ORDER BY q.created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 100));

    builder.build_query_as::<QuizWithStats>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, active_only: bool) -> Result<i64, sqlx::Error> {
    let sql = if active_only {
        "SELECT COUNT(*) FROM quizzes WHERE is_active = TRUE"
    } else {
        "SELECT COUNT(*) FROM quizzes"
    };
    sqlx::query_scalar(sql).fetch_one(pool).await
}

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) time_limit_minutes: i32,
    pub(crate) passing_score: i32,
    pub(crate) is_active: bool,
    pub(crate) created_by: &'a str,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateQuiz<'_>) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            id, title, description, time_limit_minutes, passing_score, is_active,
            created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.time_limit_minutes)
    .bind(params.passing_score)
    .bind(params.is_active)
    .bind(params.created_by)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateQuiz {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) passing_score: Option<i32>,
    pub(crate) is_active: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuiz,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            time_limit_minutes = COALESCE($3, time_limit_minutes),
            passing_score = COALESCE($4, passing_score),
            is_active = COALESCE($5, is_active),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.time_limit_minutes)
    .bind(params.passing_score)
    .bind(params.is_active)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}
