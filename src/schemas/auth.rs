use serde::{Deserialize, Serialize};

use crate::schemas::student::{SessionResponse, StudentResponse};

/// Query string the identity provider appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CallbackQuery {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) error_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentTokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) student: StudentResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct MeResponse {
    pub(crate) student: StudentResponse,
    pub(crate) session: SessionResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct LogoutResponse {
    pub(crate) detail: String,
}
