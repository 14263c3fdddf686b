use crate::db::models::UserResponse;

const COLUMNS: &str = "id, attempt_id, question_id, selected_option_id, is_correct, answered_at";

pub(crate) struct SaveResponse<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_option_id: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) answered_at: time::PrimitiveDateTime,
}

/// One row per (attempt, question); re-answering replaces the selection and
/// its correctness snapshot.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: SaveResponse<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_responses (
            id, attempt_id, question_id, selected_option_id, is_correct, answered_at
        ) VALUES ($1,$2,$3,$4,$5,$6)
        ON CONFLICT (attempt_id, question_id) DO UPDATE SET
            selected_option_id = EXCLUDED.selected_option_id,
            is_correct = EXCLUDED.is_correct,
            answered_at = EXCLUDED.answered_at",
    )
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.selected_option_id)
    .bind(params.is_correct)
    .bind(params.answered_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_for_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<UserResponse>, sqlx::Error> {
    sqlx::query_as::<_, UserResponse>(&format!(
        "SELECT {COLUMNS} FROM user_responses WHERE attempt_id = $1"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// Response joined with its question and chosen option, in question order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ResponseReviewRow {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) order_index: i32,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) selected_option_text: Option<String>,
    pub(crate) is_correct: bool,
}

pub(crate) async fn list_review_for_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<ResponseReviewRow>, sqlx::Error> {
    sqlx::query_as::<_, ResponseReviewRow>(
        "SELECT r.question_id, q.question_text, q.order_index, r.selected_option_id,
                o.option_text AS selected_option_text, r.is_correct
         FROM user_responses r
         JOIN questions q ON q.id = r.question_id
         LEFT JOIN question_options o ON o.id = r.selected_option_id
         WHERE r.attempt_id = $1
         ORDER BY q.order_index, q.created_at, q.id",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}
