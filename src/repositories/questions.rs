use crate::db::models::Question;

const COLUMNS: &str = "id, quiz_id, question_text, score, order_index, created_at";

pub(crate) async fn list_for_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions
         WHERE quiz_id = $1
         ORDER BY order_index, created_at, id"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_in_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    question_id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE id = $1 AND quiz_id = $2"
    ))
    .bind(question_id)
    .bind(quiz_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_for_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub(crate) struct NewQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) score: i32,
    pub(crate) order_index: i32,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: NewQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (id, quiz_id, question_text, score, order_index, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.question_text)
    .bind(params.score)
    .bind(params.order_index)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}
