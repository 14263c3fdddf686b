use crate::db::models::QuestionBatch;

const COLUMNS: &str = "id, quiz_id, raw_text, score, is_processed, created_at, updated_at";

pub(crate) struct NewBatch<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) raw_text: &'a str,
    pub(crate) score: i32,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: NewBatch<'_>,
) -> Result<QuestionBatch, sqlx::Error> {
    sqlx::query_as::<_, QuestionBatch>(&format!(
        "INSERT INTO question_batches (id, quiz_id, raw_text, score, is_processed, created_at, updated_at)
         VALUES ($1,$2,$3,$4,FALSE,$5,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.raw_text)
    .bind(params.score)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<QuestionBatch>, sqlx::Error> {
    sqlx::query_as::<_, QuestionBatch>(&format!(
        "SELECT {COLUMNS} FROM question_batches WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Row-locks the batch for the rest of the transaction so two processors
/// cannot import it twice.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<QuestionBatch>, sqlx::Error> {
    sqlx::query_as::<_, QuestionBatch>(&format!(
        "SELECT {COLUMNS} FROM question_batches WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn mark_processed(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE question_batches SET is_processed = TRUE, updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
