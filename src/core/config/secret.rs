use std::{fs, path::PathBuf};

use crate::core::security::generate_opaque_token;

const SECRET_KEY_BYTES: usize = 64;

/// Reuses the key persisted next to the manifest, or writes a fresh one so
/// issued session tokens survive restarts in development.
pub(super) fn load_or_create_secret_key() -> String {
    let path = secret_file_path();

    if let Some(existing) = read_existing(&path) {
        return existing;
    }

    let new_key = generate_opaque_token(SECRET_KEY_BYTES);

    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::warn!(
                error = %err,
                path = %parent.display(),
                "Failed to create secret key directory"
            );
        }
    }

    match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(mut file) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;

                if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
                    tracing::warn!(
                        error = %err,
                        path = %path.display(),
                        "Failed to set secret key file permissions"
                    );
                }
            }

            if let Err(err) = std::io::Write::write_all(&mut file, new_key.as_bytes()) {
                tracing::warn!(error = %err, path = %path.display(), "Failed to write secret key file");
            }
            new_key
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            read_existing(&path).unwrap_or(new_key)
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Failed to create secret key file");
            new_key
        }
    }
}

fn read_existing(path: &PathBuf) -> Option<String> {
    let value = fs::read_to_string(path).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn secret_file_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".secret_key")
}
