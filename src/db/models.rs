use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::AttemptStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AdminUser {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct StudentGroup {
    pub(crate) id: String,
    pub(crate) group_code: String,
    pub(crate) group_name: String,
    pub(crate) faculty: String,
    pub(crate) level: String,
    pub(crate) education_year: String,
    pub(crate) education_form: String,
    pub(crate) education_lang: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) student_id_number: Option<String>,
    pub(crate) hemis_user_id: Option<String>,
    pub(crate) full_name: Option<String>,
    pub(crate) phone_number: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) email: String,
    pub(crate) passport_number: String,
    pub(crate) birth_date: String,
    pub(crate) student_status: String,
    pub(crate) payment_form: String,
    pub(crate) faculty: String,
    pub(crate) level: String,
    pub(crate) avg_gpa: String,
    pub(crate) education_type: String,
    pub(crate) gender: String,
    pub(crate) semester: String,
    pub(crate) group_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct UserSession {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) session_key: String,
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) token_type: String,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) user_agent: String,
    pub(crate) ip_address: Option<String>,
    pub(crate) device_info: Json<serde_json::Value>,
    pub(crate) is_active: bool,
    pub(crate) last_activity: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl UserSession {
    pub(crate) fn is_expired(&self, now: PrimitiveDateTime) -> bool {
        now >= self.expires_at
    }

    pub(crate) fn is_valid(&self, now: PrimitiveDateTime) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct LoginHistory {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) session_id: Option<String>,
    pub(crate) login_time: PrimitiveDateTime,
    pub(crate) logout_time: Option<PrimitiveDateTime>,
    pub(crate) ip_address: String,
    pub(crate) user_agent: String,
    pub(crate) device_type: String,
    pub(crate) success: bool,
    pub(crate) failure_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Quiz {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) passing_score: i32,
    pub(crate) is_active: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) question_text: String,
    pub(crate) score: i32,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionOption {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) option_text: String,
    pub(crate) is_correct: bool,
    pub(crate) position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionBatch {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) raw_text: String,
    pub(crate) score: i32,
    pub(crate) is_processed: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuizAttempt {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) quiz_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) time_taken_seconds: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) answered_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuizResult {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) wrong_answers: i32,
    pub(crate) unanswered: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
