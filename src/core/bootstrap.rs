use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;

const SUPERUSER_FULL_NAME: &str = "Super Admin";

/// Creates the configured admin account, or re-activates it and resets the
/// password when the stored hash no longer matches.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = admin.first_superuser_username.trim();
    let now = primitive_now_utc();

    if let Some(existing) = repositories::admins::find_by_username(state.db(), username).await? {
        let verified =
            security::verify_password(&admin.first_superuser_password, &existing.hashed_password)
                .unwrap_or(false);

        if verified && existing.is_active {
            tracing::info!("Default superuser already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            existing.hashed_password.clone()
        } else {
            security::hash_password(&admin.first_superuser_password)?
        };
        repositories::admins::reset_credentials(state.db(), &existing.id, &hashed_password, now)
            .await?;

        tracing::info!("Updated default superuser {username}");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;
    let id = Uuid::new_v4().to_string();
    repositories::admins::create(
        state.db(),
        repositories::admins::CreateAdmin {
            id: &id,
            username,
            hashed_password,
            full_name: SUPERUSER_FULL_NAME,
            now,
        },
    )
    .await?;

    tracing::info!("Created default superuser {username}");
    Ok(())
}
