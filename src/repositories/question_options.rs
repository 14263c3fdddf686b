use crate::db::models::QuestionOption;

const COLUMNS: &str = "o.id, o.question_id, o.option_text, o.is_correct, o.position";

pub(crate) async fn list_for_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {COLUMNS} FROM question_options o
         JOIN questions q ON q.id = o.question_id
         WHERE q.quiz_id = $1
         ORDER BY o.question_id, o.position, o.id"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_for_question(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
    option_id: &str,
) -> Result<Option<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {COLUMNS} FROM question_options o WHERE o.id = $1 AND o.question_id = $2"
    ))
    .bind(option_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

pub(crate) struct NewOption<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) option_text: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) position: i32,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: NewOption<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO question_options (id, question_id, option_text, is_correct, position)
         VALUES ($1,$2,$3,$4,$5)",
    )
    .bind(params.id)
    .bind(params.question_id)
    .bind(params.option_text)
    .bind(params.is_correct)
    .bind(params.position)
    .execute(executor)
    .await?;
    Ok(())
}
