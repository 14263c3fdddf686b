use sqlx::PgPool;

use crate::db::models::LoginHistory;

const COLUMNS: &str = "\
    id, student_id, session_id, login_time, logout_time, ip_address, user_agent, \
    device_type, success, failure_reason";

pub(crate) struct NewLoginRecord<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) session_id: Option<&'a str>,
    pub(crate) login_time: time::PrimitiveDateTime,
    pub(crate) ip_address: &'a str,
    pub(crate) user_agent: &'a str,
    pub(crate) device_type: &'a str,
    pub(crate) success: bool,
    pub(crate) failure_reason: &'a str,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: NewLoginRecord<'_>,
) -> Result<LoginHistory, sqlx::Error> {
    sqlx::query_as::<_, LoginHistory>(&format!(
        "INSERT INTO login_history (
            id, student_id, session_id, login_time, ip_address, user_agent,
            device_type, success, failure_reason
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.session_id)
    .bind(params.login_time)
    .bind(params.ip_address)
    .bind(params.user_agent)
    .bind(params.device_type)
    .bind(params.success)
    .bind(params.failure_reason)
    .fetch_one(executor)
    .await
}

pub(crate) async fn close_for_session(
    pool: &PgPool,
    session_id: &str,
    logout_time: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE login_history SET logout_time = $1
         WHERE session_id = $2 AND logout_time IS NULL",
    )
    .bind(logout_time)
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn list_recent_for_student(
    pool: &PgPool,
    student_id: &str,
    limit: i64,
) -> Result<Vec<LoginHistory>, sqlx::Error> {
    sqlx::query_as::<_, LoginHistory>(&format!(
        "SELECT {COLUMNS} FROM login_history
         WHERE student_id = $1
         ORDER BY login_time DESC
         LIMIT $2"
    ))
    .bind(student_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
