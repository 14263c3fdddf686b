use sqlx::PgPool;

use crate::db::models::AdminUser;

const COLUMNS: &str = "id, username, hashed_password, full_name, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as::<_, AdminUser>(&format!("SELECT {COLUMNS} FROM admin_users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as::<_, AdminUser>(&format!(
        "SELECT {COLUMNS} FROM admin_users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateAdmin<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) full_name: &'a str,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateAdmin<'_>) -> Result<AdminUser, sqlx::Error> {
    sqlx::query_as::<_, AdminUser>(&format!(
        "INSERT INTO admin_users (
            id, username, hashed_password, full_name, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,TRUE,$5,$5)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.hashed_password)
    .bind(params.full_name)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn reset_credentials(
    pool: &PgPool,
    id: &str,
    hashed_password: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE admin_users
         SET hashed_password = $1, is_active = TRUE, updated_at = $2
         WHERE id = $3",
    )
    .bind(hashed_password)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
