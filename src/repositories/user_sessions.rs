use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::UserSession;

const COLUMNS: &str = "\
    id, student_id, session_key, access_token, refresh_token, token_type, expires_at, \
    user_agent, ip_address, device_info, is_active, last_activity, created_at, updated_at";

pub(crate) async fn find_by_key(
    pool: &PgPool,
    session_key: &str,
) -> Result<Option<UserSession>, sqlx::Error> {
    sqlx::query_as::<_, UserSession>(&format!(
        "SELECT {COLUMNS} FROM user_sessions WHERE session_key = $1"
    ))
    .bind(session_key)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_active_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<UserSession>, sqlx::Error> {
    sqlx::query_as::<_, UserSession>(&format!(
        "SELECT {COLUMNS} FROM user_sessions
         WHERE student_id = $1 AND is_active = TRUE
         ORDER BY last_activity DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct UpsertSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) session_key: &'a str,
    pub(crate) access_token: &'a str,
    pub(crate) refresh_token: Option<&'a str>,
    pub(crate) token_type: &'a str,
    pub(crate) expires_at: time::PrimitiveDateTime,
    pub(crate) user_agent: &'a str,
    pub(crate) ip_address: Option<&'a str>,
    pub(crate) device_info: serde_json::Value,
    pub(crate) now: time::PrimitiveDateTime,
}

/// Get-or-create on the session key. A repeated login on the same key
/// replaces tokens and client details and reactivates the row.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertSession<'_>,
) -> Result<UserSession, sqlx::Error> {
    sqlx::query_as::<_, UserSession>(&format!(
        "INSERT INTO user_sessions (
            id, student_id, session_key, access_token, refresh_token, token_type,
            expires_at, user_agent, ip_address, device_info, is_active,
            last_activity, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,TRUE,$11,$11,$11)
        ON CONFLICT (session_key) DO UPDATE SET
            student_id = EXCLUDED.student_id,
            access_token = EXCLUDED.access_token,
            refresh_token = EXCLUDED.refresh_token,
            token_type = EXCLUDED.token_type,
            expires_at = EXCLUDED.expires_at,
            user_agent = EXCLUDED.user_agent,
            ip_address = EXCLUDED.ip_address,
            device_info = EXCLUDED.device_info,
            is_active = TRUE,
            last_activity = EXCLUDED.last_activity,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.session_key)
    .bind(params.access_token)
    .bind(params.refresh_token)
    .bind(params.token_type)
    .bind(params.expires_at)
    .bind(params.user_agent)
    .bind(params.ip_address)
    .bind(Json(params.device_info))
    .bind(params.now)
    .fetch_one(executor)
    .await
}

/// Stores refreshed provider tokens. `refresh_token = None` keeps the
/// current one.
pub(crate) async fn update_tokens(
    pool: &PgPool,
    id: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: time::PrimitiveDateTime,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_sessions
         SET access_token = $1,
             refresh_token = COALESCE($2, refresh_token),
             expires_at = $3,
             updated_at = $4
         WHERE id = $5",
    )
    .bind(access_token)
    .bind(refresh_token)
    .bind(expires_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn touch_activity(
    pool: &PgPool,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE user_sessions SET last_activity = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn deactivate(
    pool: &PgPool,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE user_sessions SET is_active = FALSE, updated_at = $1
         WHERE id = $2 AND is_active = TRUE",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Hard-deletes sessions that expired before `now` or saw no activity since
/// `stale_before`.
pub(crate) async fn delete_expired_or_stale(
    executor: impl sqlx::PgExecutor<'_>,
    now: time::PrimitiveDateTime,
    stale_before: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM user_sessions WHERE expires_at < $1 OR last_activity < $2")
            .bind(now)
            .bind(stale_before)
            .execute(executor)
            .await?;
    Ok(result.rows_affected())
}
