use serde::Serialize;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{LoginHistory, Student, StudentGroup, UserSession};
use crate::repositories::results::ResultWithQuiz;
use crate::schemas::quiz::CurrentAttemptResponse;
use crate::services::scoring;

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) student_id_number: Option<String>,
    pub(crate) full_name: Option<String>,
    pub(crate) email: String,
    pub(crate) phone_number: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) faculty: String,
    pub(crate) level: String,
    pub(crate) semester: String,
    pub(crate) education_type: String,
    pub(crate) payment_form: String,
    pub(crate) student_status: String,
    pub(crate) gender: String,
    pub(crate) avg_gpa: String,
    pub(crate) birth_date: String,
    pub(crate) group_id: Option<String>,
    pub(crate) created_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            student_id_number: student.student_id_number,
            full_name: student.full_name,
            email: student.email,
            phone_number: student.phone_number,
            image_url: student.image_url,
            faculty: student.faculty,
            level: student.level,
            semester: student.semester,
            education_type: student.education_type,
            payment_form: student.payment_form,
            student_status: student.student_status,
            gender: student.gender,
            avg_gpa: student.avg_gpa,
            birth_date: student.birth_date,
            group_id: student.group_id,
            created_at: format_primitive(student.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupResponse {
    pub(crate) id: String,
    pub(crate) group_code: String,
    pub(crate) group_name: String,
    pub(crate) faculty: String,
    pub(crate) level: String,
    pub(crate) education_year: String,
    pub(crate) education_form: String,
    pub(crate) education_lang: String,
}

impl GroupResponse {
    pub(crate) fn from_db(group: StudentGroup) -> Self {
        Self {
            id: group.id,
            group_code: group.group_code,
            group_name: group.group_name,
            faculty: group.faculty,
            level: group.level,
            education_year: group.education_year,
            education_form: group.education_form,
            education_lang: group.education_lang,
        }
    }
}

/// Session as shown to its owner; provider tokens are never exposed.
#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) user_agent: String,
    pub(crate) ip_address: Option<String>,
    pub(crate) device_info: serde_json::Value,
    pub(crate) expires_at: String,
    pub(crate) last_activity: String,
    pub(crate) created_at: String,
}

impl SessionResponse {
    pub(crate) fn from_db(session: UserSession) -> Self {
        Self {
            id: session.id,
            user_agent: session.user_agent,
            ip_address: session.ip_address,
            device_info: session.device_info.0,
            expires_at: format_primitive(session.expires_at),
            last_activity: format_primitive(session.last_activity),
            created_at: format_primitive(session.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginHistoryResponse {
    pub(crate) id: String,
    pub(crate) login_time: String,
    pub(crate) logout_time: Option<String>,
    pub(crate) ip_address: String,
    pub(crate) user_agent: String,
    pub(crate) device_type: String,
    pub(crate) success: bool,
    pub(crate) failure_reason: String,
}

impl LoginHistoryResponse {
    pub(crate) fn from_db(record: LoginHistory) -> Self {
        Self {
            id: record.id,
            login_time: format_primitive(record.login_time),
            logout_time: format_optional(record.logout_time),
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            device_type: record.device_type,
            success: record.success,
            failure_reason: record.failure_reason,
        }
    }
}

/// One row of a student's result history.
#[derive(Debug, Serialize)]
pub(crate) struct ResultHistoryItem {
    pub(crate) result_id: String,
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) status: &'static str,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: f64,
    pub(crate) grade: u8,
    pub(crate) passed: bool,
    pub(crate) time_taken_seconds: Option<i32>,
    pub(crate) created_at: String,
}

impl ResultHistoryItem {
    pub(crate) fn from_row(row: ResultWithQuiz) -> Self {
        let result = row.result;
        Self {
            result_id: result.id,
            attempt_id: result.attempt_id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            status: row.status.as_str(),
            total_questions: result.total_questions,
            correct_answers: result.correct_answers,
            total_score: result.total_score,
            max_score: result.max_score,
            percentage: result.percentage,
            grade: scoring::grade(result.percentage),
            passed: result.passed,
            time_taken_seconds: row.time_taken_seconds,
            created_at: format_primitive(result.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    pub(crate) student: StudentResponse,
    pub(crate) total_quizzes: i64,
    pub(crate) total_attempts: i64,
    pub(crate) completed_attempts: i64,
    pub(crate) current_attempt: Option<CurrentAttemptResponse>,
    pub(crate) total_results: i64,
    pub(crate) passed_results: i64,
    pub(crate) failed_results: i64,
    pub(crate) average_percentage: f64,
    pub(crate) recent_results: Vec<ResultHistoryItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileResponse {
    pub(crate) student: StudentResponse,
    pub(crate) group: Option<GroupResponse>,
    pub(crate) login_history: Vec<LoginHistoryResponse>,
    pub(crate) active_sessions: Vec<SessionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultsHistoryResponse {
    pub(crate) items: Vec<ResultHistoryItem>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
    pub(crate) passed_results: i64,
    pub(crate) failed_results: i64,
    pub(crate) average_percentage: f64,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct ChartData {
    pub(crate) labels: Vec<String>,
    pub(crate) scores: Vec<f64>,
    pub(crate) passed: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatisticsResponse {
    pub(crate) chart: ChartData,
    pub(crate) total_results: i64,
    pub(crate) passed_results: i64,
    pub(crate) failed_results: i64,
    pub(crate) average_percentage: f64,
    pub(crate) highest_percentage: f64,
    pub(crate) lowest_percentage: f64,
}
