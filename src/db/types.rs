use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Completed,
    Expired,
}

impl AttemptStatus {
    pub(crate) fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }
}
