use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{Question, QuestionOption, QuizAttempt, QuizResult};
use crate::db::types::AttemptStatus;
use crate::repositories::quizzes::QuizWithStats;
use crate::repositories::responses::ResponseReviewRow;
use crate::services::scoring;

#[derive(Debug, Serialize)]
pub(crate) struct QuizSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) passing_score: i32,
    pub(crate) is_active: bool,
    pub(crate) question_count: i64,
    pub(crate) max_score: i64,
    pub(crate) created_at: String,
}

impl QuizSummaryResponse {
    pub(crate) fn from_db(row: QuizWithStats) -> Self {
        let quiz = row.quiz;
        Self {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            time_limit_minutes: quiz.time_limit_minutes,
            passing_score: quiz.passing_score,
            is_active: quiz.is_active,
            question_count: row.question_count,
            max_score: row.max_score,
            created_at: format_primitive(quiz.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) time_taken_seconds: Option<i32>,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: QuizAttempt) -> Self {
        Self {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            completed_at: format_optional(attempt.completed_at),
            time_taken_seconds: attempt.time_taken_seconds,
        }
    }
}

/// The student's open attempt, with its countdown.
#[derive(Debug, Serialize)]
pub(crate) struct CurrentAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) started_at: String,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) wrong_answers: i32,
    pub(crate) unanswered: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: f64,
    pub(crate) grade: u8,
    pub(crate) passed: bool,
    pub(crate) created_at: String,
}

impl ResultResponse {
    pub(crate) fn from_db(result: QuizResult) -> Self {
        Self {
            id: result.id,
            attempt_id: result.attempt_id,
            total_questions: result.total_questions,
            correct_answers: result.correct_answers,
            wrong_answers: result.wrong_answers,
            unanswered: result.unanswered,
            total_score: result.total_score,
            max_score: result.max_score,
            percentage: result.percentage,
            grade: scoring::grade(result.percentage),
            passed: result.passed,
            created_at: format_primitive(result.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizListItem {
    #[serde(flatten)]
    pub(crate) quiz: QuizSummaryResponse,
    pub(crate) latest_attempt: Option<AttemptResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizDetailResponse {
    pub(crate) quiz: QuizSummaryResponse,
    pub(crate) attempts: Vec<AttemptResponse>,
    pub(crate) total_attempts: usize,
    pub(crate) current_attempt: Option<AttemptResponse>,
    pub(crate) best_result: Option<ResultResponse>,
}

/// Question as shown while taking a quiz; correctness is withheld.
#[derive(Debug, Serialize)]
pub(crate) struct TakeQuestion {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) score: i32,
    pub(crate) order_index: i32,
    pub(crate) options: Vec<TakeOption>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TakeOption {
    pub(crate) id: String,
    pub(crate) option_text: String,
}

impl TakeQuestion {
    /// Pairs each question with its options, keeping `questions` order.
    pub(crate) fn assemble(questions: Vec<Question>, options: Vec<QuestionOption>) -> Vec<Self> {
        let mut by_question: HashMap<String, Vec<TakeOption>> = HashMap::new();
        for option in options {
            by_question
                .entry(option.question_id)
                .or_default()
                .push(TakeOption { id: option.id, option_text: option.option_text });
        }

        questions
            .into_iter()
            .map(|question| Self {
                options: by_question.remove(&question.id).unwrap_or_default(),
                id: question.id,
                question_text: question.question_text,
                score: question.score,
                order_index: question.order_index,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TakeQuizPage {
    pub(crate) quiz: QuizSummaryResponse,
    pub(crate) attempt: AttemptResponse,
    pub(crate) questions: Vec<TakeQuestion>,
    /// `question_id -> selected option id`.
    pub(crate) responses: HashMap<String, String>,
    pub(crate) remaining_seconds: i64,
    pub(crate) total_questions: usize,
    pub(crate) answered_count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseReview {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) order_index: i32,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) selected_option_text: Option<String>,
    pub(crate) is_correct: bool,
}

impl ResponseReview {
    pub(crate) fn from_row(row: ResponseReviewRow) -> Self {
        Self {
            question_id: row.question_id,
            question_text: row.question_text,
            order_index: row.order_index,
            selected_option_id: row.selected_option_id,
            selected_option_text: row.selected_option_text,
            is_correct: row.is_correct,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResultResponse {
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) passing_score: i32,
    pub(crate) attempt: AttemptResponse,
    pub(crate) result: Option<ResultResponse>,
    pub(crate) responses: Vec<ResponseReview>,
    pub(crate) total_questions: i64,
    pub(crate) correct_count: usize,
    pub(crate) wrong_count: usize,
    pub(crate) unanswered_count: i64,
}

/// Either the quiz page for an open attempt or the result of one that
/// has just finished.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub(crate) enum TakeQuizResponse {
    InProgress(TakeQuizPage),
    Finished(AttemptResultResponse),
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitAnswersRequest {
    #[serde(default)]
    pub(crate) answers: HashMap<String, String>,
    #[serde(default)]
    pub(crate) action: SubmitAction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmitAction {
    #[default]
    Save,
    Submit,
}

#[derive(Debug, Serialize)]
pub(crate) struct SavedAnswersResponse {
    pub(crate) attempt_id: String,
    pub(crate) saved: usize,
    pub(crate) answered_count: usize,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub(crate) enum SubmitAnswersResponse {
    Saved(SavedAnswersResponse),
    Finished(AttemptResultResponse),
}
