use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::AuthContext;
use crate::api::pagination::{PageQuery, PaginatedResponse, QUIZ_PAGE_SIZE};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Quiz, QuizAttempt};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::repositories::quizzes::QuizWithStats;
use crate::schemas::quiz::{
    AttemptResponse, AttemptResultResponse, QuizDetailResponse, QuizListItem,
    QuizSummaryResponse, ResponseReview, ResultResponse, SavedAnswersResponse, SubmitAction,
    SubmitAnswersRequest, SubmitAnswersResponse, TakeQuestion, TakeQuizPage, TakeQuizResponse,
};
use crate::services::attempt_timing;
use crate::services::attempts::{self, FinishedAttempt};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/quizzes", get(list_quizzes))
        .route("/quizzes/:quiz_id", get(get_quiz))
        .route("/quizzes/:quiz_id/take", get(take_quiz).post(submit_answers))
        .route("/attempts/:attempt_id/result", get(attempt_result))
}

async fn list_quizzes(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<QuizListItem>>, ApiError> {
    let (skip, limit) = query.window(QUIZ_PAGE_SIZE);

    let quizzes = repositories::quizzes::list_with_stats(state.db(), true, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quizzes"))?;
    let total_count = repositories::quizzes::count(state.db(), true)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count quizzes"))?;

    let quiz_ids: Vec<String> = quizzes.iter().map(|row| row.quiz.id.clone()).collect();
    let mut latest: HashMap<String, QuizAttempt> =
        repositories::attempts::latest_for_quizzes(state.db(), &auth.student.id, &quiz_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch attempts"))?
            .into_iter()
            .map(|attempt| (attempt.quiz_id.clone(), attempt))
            .collect();

    let items = quizzes
        .into_iter()
        .map(|row| QuizListItem {
            latest_attempt: latest.remove(&row.quiz.id).map(AttemptResponse::from_db),
            quiz: QuizSummaryResponse::from_db(row),
        })
        .collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

async fn get_quiz(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(quiz_id): Path<String>,
) -> Result<Json<QuizDetailResponse>, ApiError> {
    let quiz = fetch_active_quiz(&state, &quiz_id).await?;

    let history =
        repositories::attempts::list_for_student_quiz(state.db(), &auth.student.id, &quiz_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch attempts"))?;
    let best_result =
        repositories::results::best_for_student_quiz(state.db(), &auth.student.id, &quiz_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch best result"))?;

    let current_attempt = history
        .iter()
        .find(|attempt| attempt.status == AttemptStatus::InProgress)
        .cloned()
        .map(AttemptResponse::from_db);

    Ok(Json(QuizDetailResponse {
        quiz: QuizSummaryResponse::from_db(quiz),
        total_attempts: history.len(),
        attempts: history.into_iter().map(AttemptResponse::from_db).collect(),
        current_attempt,
        best_result: best_result.map(ResultResponse::from_db),
    }))
}

/// Opens (or resumes) the student's attempt. An attempt that ran out of
/// time is expired here and its result returned instead of the questions.
async fn take_quiz(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(quiz_id): Path<String>,
) -> Result<Json<TakeQuizResponse>, ApiError> {
    let quiz = fetch_active_quiz(&state, &quiz_id).await?;
    if quiz.question_count == 0 {
        return Err(ApiError::BadRequest("This quiz has no questions yet".to_string()));
    }

    let now = primitive_now_utc();
    let attempt = attempts::start_or_resume(state.db(), &auth.student.id, &quiz_id, now)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to start attempt"))?;

    if let Some(finished) = attempts::expire_if_overdue(state.db(), &attempt, &quiz.quiz, now)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to expire attempt"))?
    {
        let result = build_result(&state, &quiz.quiz, finished).await?;
        return Ok(Json(TakeQuizResponse::Finished(result)));
    }

    let questions = repositories::questions::list_for_quiz(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;
    let options = repositories::question_options::list_for_quiz(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch options"))?;
    let responses: HashMap<String, String> =
        repositories::responses::list_for_attempt(state.db(), &attempt.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch responses"))?
            .into_iter()
            .filter_map(|response| {
                response.selected_option_id.map(|option_id| (response.question_id, option_id))
            })
            .collect();

    let questions = TakeQuestion::assemble(questions, options);
    let remaining_seconds = attempt_timing::remaining_seconds(
        attempt.status,
        attempt.started_at,
        quiz.quiz.time_limit_minutes,
        now,
    );

    Ok(Json(TakeQuizResponse::InProgress(TakeQuizPage {
        quiz: QuizSummaryResponse::from_db(quiz),
        attempt: AttemptResponse::from_db(attempt),
        total_questions: questions.len(),
        answered_count: responses.len(),
        questions,
        responses,
        remaining_seconds,
    })))
}

/// Stores answers on the open attempt and, for `action = submit`, finishes
/// it.
async fn submit_answers(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(quiz_id): Path<String>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<Json<SubmitAnswersResponse>, ApiError> {
    let quiz = fetch_active_quiz(&state, &quiz_id).await?.quiz;

    let attempt = repositories::attempts::find_in_progress(state.db(), &auth.student.id, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("No active attempt for this quiz".to_string()))?;

    let now = primitive_now_utc();
    if attempts::expire_if_overdue(state.db(), &attempt, &quiz, now)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to expire attempt"))?
        .is_some()
    {
        return Err(ApiError::BadRequest("Time is up, the attempt has been closed".to_string()));
    }

    let saved = attempts::save_answers(state.db(), &attempt, &payload.answers, now)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to save answers"))?;

    if payload.action == SubmitAction::Submit {
        let finished =
            attempts::finish(state.db(), &attempt, &quiz, AttemptStatus::Completed, now)
                .await
                .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to submit attempt"))?;
        let result = build_result(&state, &quiz, finished).await?;
        return Ok(Json(SubmitAnswersResponse::Finished(result)));
    }

    let answered_count = repositories::responses::list_for_attempt(state.db(), &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch responses"))?
        .len();

    Ok(Json(SubmitAnswersResponse::Saved(SavedAnswersResponse {
        attempt_id: attempt.id,
        saved,
        answered_count,
        remaining_seconds: attempt_timing::remaining_seconds(
            attempt.status,
            attempt.started_at,
            quiz.time_limit_minutes,
            now,
        ),
    })))
}

async fn attempt_result(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    let attempt =
        repositories::attempts::find_for_student(state.db(), &attempt_id, &auth.student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
            .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;
    let quiz = repositories::quizzes::find_by_id(state.db(), &attempt.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let finished = if attempt.status == AttemptStatus::InProgress {
        attempts::expire_if_overdue(state.db(), &attempt, &quiz, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to expire attempt"))?
            .ok_or_else(|| ApiError::BadRequest("Attempt is still in progress".to_string()))?
    } else {
        let result = repositories::results::find_by_attempt(state.db(), &attempt.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?;
        FinishedAttempt { attempt, result }
    };

    Ok(Json(build_result(&state, &quiz, finished).await?))
}

async fn fetch_active_quiz(state: &AppState, quiz_id: &str) -> Result<QuizWithStats, ApiError> {
    repositories::quizzes::find_with_stats(state.db(), quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .filter(|row| row.quiz.is_active)
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))
}

async fn build_result(
    state: &AppState,
    quiz: &Quiz,
    finished: FinishedAttempt,
) -> Result<AttemptResultResponse, ApiError> {
    let reviews = repositories::responses::list_review_for_attempt(state.db(), &finished.attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch responses"))?;
    let total_questions = repositories::questions::count_for_quiz(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    let answered: Vec<_> =
        reviews.iter().filter(|review| review.selected_option_id.is_some()).collect();
    let correct_count = answered.iter().filter(|review| review.is_correct).count();
    let wrong_count = answered.len() - correct_count;
    let unanswered_count = (total_questions - answered.len() as i64).max(0);

    Ok(AttemptResultResponse {
        quiz_id: quiz.id.clone(),
        quiz_title: quiz.title.clone(),
        passing_score: quiz.passing_score,
        attempt: AttemptResponse::from_db(finished.attempt),
        result: finished.result.map(ResultResponse::from_db),
        responses: reviews.into_iter().map(ResponseReview::from_row).collect(),
        total_questions,
        correct_count,
        wrong_count,
        unanswered_count,
    })
}
