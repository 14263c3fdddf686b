use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::{default_limit, PageQuery, PaginatedResponse};
use crate::core::redis::RateLimitPolicy;
use crate::core::security::{self, TokenKind};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::quizzes::QuizWithStats;
use crate::schemas::admin::{
    AdminLogin, AdminResponse, AdminTokenResponse, OptionResponse, QuestionBatchCreate,
    QuestionBatchResponse, QuestionCreate, QuestionResponse, QuizCreate, QuizUpdate,
    SessionCleanupRequest, SessionCleanupResponse,
};
use crate::schemas::quiz::QuizSummaryResponse;
use crate::services::question_import::{self, ImportSummary};
use crate::services::user_sessions;

const ADMIN_LOGIN_RATE_LIMIT: RateLimitPolicy = RateLimitPolicy { limit: 10, window_seconds: 60 };

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/quizzes", get(list_quizzes).post(create_quiz))
        .route("/quizzes/:quiz_id", patch(update_quiz))
        .route("/quizzes/:quiz_id/questions", post(create_question))
        .route("/quizzes/:quiz_id/question-batches", post(create_question_batch))
        .route("/question-batches/:batch_id/process", post(reprocess_question_batch))
        .route("/sessions/cleanup", post(cleanup_sessions))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLogin>,
) -> Result<Json<AdminTokenResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let allowed = state
        .redis()
        .rate_limit("admin_login", &payload.username, ADMIN_LOGIN_RATE_LIMIT)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let admin = repositories::admins::find_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load admin"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(&payload.password, &admin.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }
    if !admin.is_active {
        return Err(ApiError::BadRequest("Inactive admin".to_string()));
    }

    let token = security::create_access_token(
        &admin.id,
        TokenKind::Admin,
        None,
        state.settings(),
        None,
    )
    .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(AdminTokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        admin: AdminResponse::from_db(admin),
    }))
}

async fn list_quizzes(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<QuizSummaryResponse>>, ApiError> {
    let (skip, limit) = query.window(default_limit());

    let quizzes = repositories::quizzes::list_with_stats(state.db(), false, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quizzes"))?;
    let total_count = repositories::quizzes::count(state.db(), false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count quizzes"))?;

    Ok(Json(PaginatedResponse {
        items: quizzes.into_iter().map(QuizSummaryResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn create_quiz(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(payload): Json<QuizCreate>,
) -> Result<(StatusCode, Json<QuizSummaryResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let quiz = repositories::quizzes::create(
        state.db(),
        repositories::quizzes::CreateQuiz {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: &payload.description,
            time_limit_minutes: payload.time_limit_minutes,
            passing_score: payload.passing_score,
            is_active: payload.is_active,
            created_by: &admin.id,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create quiz"))?;

    tracing::info!(quiz_id = %quiz.id, admin_id = %admin.id, "Quiz created");

    let summary = QuizWithStats { quiz, question_count: 0, max_score: 0 };
    Ok((StatusCode::CREATED, Json(QuizSummaryResponse::from_db(summary))))
}

async fn update_quiz(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(quiz_id): Path<String>,
    Json(payload): Json<QuizUpdate>,
) -> Result<Json<QuizSummaryResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    repositories::quizzes::update(
        state.db(),
        &quiz_id,
        repositories::quizzes::UpdateQuiz {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            time_limit_minutes: payload.time_limit_minutes,
            passing_score: payload.passing_score,
            is_active: payload.is_active,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update quiz"))?
    .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let quiz = repositories::quizzes::find_with_stats(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(QuizSummaryResponse::from_db(quiz)))
}

async fn create_question(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(quiz_id): Path<String>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if !payload.options.iter().any(|option| option.is_correct) {
        return Err(ApiError::BadRequest("At least one option must be correct".to_string()));
    }

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::quizzes::find_by_id(&mut *tx, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let order_index = match payload.order_index {
        Some(order_index) => order_index,
        None => {
            let count = repositories::questions::count_for_quiz(&mut *tx, &quiz_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;
            i32::try_from(count).unwrap_or(i32::MAX)
        }
    };

    let question = repositories::questions::create(
        &mut *tx,
        repositories::questions::NewQuestion {
            id: &Uuid::new_v4().to_string(),
            quiz_id: &quiz_id,
            question_text: payload.question_text.trim(),
            score: payload.score,
            order_index,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    let mut options = Vec::with_capacity(payload.options.len());
    for (position, option) in payload.options.iter().enumerate() {
        let option_id = Uuid::new_v4().to_string();
        let position = i32::try_from(position).unwrap_or(i32::MAX);
        repositories::question_options::create(
            &mut *tx,
            repositories::question_options::NewOption {
                id: &option_id,
                question_id: &question.id,
                option_text: option.option_text.trim(),
                is_correct: option.is_correct,
                position,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create option"))?;

        options.push(OptionResponse {
            id: option_id,
            option_text: option.option_text.trim().to_string(),
            is_correct: option.is_correct,
            position,
        });
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit question"))?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question, options))))
}

/// Stores the raw text and imports it right away. A failed import leaves
/// the batch unprocessed so it can be retried.
async fn create_question_batch(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(quiz_id): Path<String>,
    Json(payload): Json<QuestionBatchCreate>,
) -> Result<(StatusCode, Json<QuestionBatchResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let batch = repositories::question_batches::create(
        state.db(),
        repositories::question_batches::NewBatch {
            id: &Uuid::new_v4().to_string(),
            quiz_id: &quiz_id,
            raw_text: &payload.raw_text,
            score: payload.score,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save question batch"))?;

    let summary = question_import::process_batch(state.db(), &batch.id).await?;
    let response = batch_response(&state, &summary).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn reprocess_question_batch(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(batch_id): Path<String>,
) -> Result<Json<QuestionBatchResponse>, ApiError> {
    let summary = question_import::process_batch(state.db(), &batch_id).await?;
    Ok(Json(batch_response(&state, &summary).await?))
}

async fn batch_response(
    state: &AppState,
    summary: &ImportSummary,
) -> Result<QuestionBatchResponse, ApiError> {
    let batch = repositories::question_batches::find_by_id(state.db(), &summary.batch_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reload question batch"))?
        .ok_or_else(|| ApiError::NotFound("Question batch not found".to_string()))?;

    Ok(QuestionBatchResponse::from_import(batch, summary))
}

async fn cleanup_sessions(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(payload): Json<SessionCleanupRequest>,
) -> Result<Json<SessionCleanupResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let days = payload.days.unwrap_or(state.settings().session().cleanup_days);

    let removed = user_sessions::cleanup_expired(state.db(), days, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to clean up sessions"))?;

    tracing::info!(admin_id = %admin.id, removed, days, "Session cleanup requested");

    Ok(Json(SessionCleanupResponse { removed, days }))
}

#[cfg(test)]
mod tests;
