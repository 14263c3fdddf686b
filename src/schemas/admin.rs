use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{AdminUser, Question, QuestionBatch};
use crate::services::question_import::ImportSummary;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AdminLogin {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub(crate) username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl AdminResponse {
    pub(crate) fn from_db(admin: AdminUser) -> Self {
        Self {
            id: admin.id,
            username: admin.username,
            full_name: admin.full_name,
            is_active: admin.is_active,
            created_at: format_primitive(admin.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminTokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) admin: AdminResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default = "default_time_limit")]
    #[serde(alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be at least 1"))]
    pub(crate) time_limit_minutes: i32,
    #[serde(default = "default_passing_score")]
    #[serde(alias = "passingScore")]
    #[validate(range(min = 0, max = 100, message = "passing_score must be between 0 and 100"))]
    pub(crate) passing_score: i32,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct QuizUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be at least 1"))]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default)]
    #[serde(alias = "passingScore")]
    #[validate(range(min = 0, max = 100, message = "passing_score must be between 0 and 100"))]
    pub(crate) passing_score: Option<i32>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct OptionCreate {
    #[serde(alias = "optionText")]
    #[validate(length(min = 1, message = "option_text must not be empty"))]
    pub(crate) option_text: String,
    #[serde(default)]
    #[serde(alias = "isCorrect")]
    pub(crate) is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(default = "default_score")]
    #[validate(range(min = 1, message = "score must be at least 1"))]
    pub(crate) score: i32,
    /// Appended after the last question when absent.
    #[serde(default)]
    #[serde(alias = "orderIndex")]
    #[validate(range(min = 0, message = "order_index must be non-negative"))]
    pub(crate) order_index: Option<i32>,
    #[validate(length(min = 1, message = "at least one option is required"), nested)]
    pub(crate) options: Vec<OptionCreate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionResponse {
    pub(crate) id: String,
    pub(crate) option_text: String,
    pub(crate) is_correct: bool,
    pub(crate) position: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) question_text: String,
    pub(crate) score: i32,
    pub(crate) order_index: i32,
    pub(crate) options: Vec<OptionResponse>,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question, options: Vec<OptionResponse>) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            question_text: question.question_text,
            score: question.score,
            order_index: question.order_index,
            options,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionBatchCreate {
    #[serde(alias = "rawText", alias = "question_text")]
    #[validate(length(min = 1, message = "raw_text must not be empty"))]
    pub(crate) raw_text: String,
    #[serde(default = "default_score")]
    #[validate(range(min = 1, message = "score must be at least 1"))]
    pub(crate) score: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionBatchResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) score: i32,
    pub(crate) is_processed: bool,
    pub(crate) imported: usize,
    pub(crate) skipped: usize,
    pub(crate) created_at: String,
}

impl QuestionBatchResponse {
    pub(crate) fn from_import(batch: QuestionBatch, summary: &ImportSummary) -> Self {
        Self {
            id: batch.id,
            quiz_id: batch.quiz_id,
            score: batch.score,
            is_processed: batch.is_processed,
            imported: summary.imported,
            skipped: summary.skipped,
            created_at: format_primitive(batch.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionCleanupRequest {
    /// Falls back to `SESSION_CLEANUP_DAYS`.
    #[serde(default)]
    #[validate(range(min = 1, max = 36500, message = "days must be between 1 and 36500"))]
    pub(crate) days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionCleanupResponse {
    pub(crate) removed: u64,
    pub(crate) days: i64,
}

fn default_time_limit() -> i32 {
    30
}

fn default_passing_score() -> i32 {
    60
}

fn default_score() -> i32 {
    1
}

fn default_true() -> bool {
    true
}
