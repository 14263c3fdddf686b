use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::AuthContext;
use crate::api::pagination::{PageQuery, RESULTS_PAGE_SIZE};
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::repositories::results::{ResultTotals, ResultWithQuiz};
use crate::schemas::quiz::CurrentAttemptResponse;
use crate::schemas::student::{
    ChartData, DashboardResponse, GroupResponse, LoginHistoryResponse, ProfileResponse,
    ResultHistoryItem, ResultsHistoryResponse, SessionResponse, StatisticsResponse,
    StudentResponse,
};
use crate::services::{attempt_timing, scoring};

const RECENT_RESULTS: i64 = 5;
const LOGIN_HISTORY_LIMIT: i64 = 10;
const CHART_LABEL_CHARS: usize = 20;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/profile", get(profile))
        .route("/statistics", get(statistics))
        .route("/results", get(results))
}

async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<DashboardResponse>, ApiError> {
    let student_id = auth.student.id.as_str();

    let total_quizzes = repositories::quizzes::count(state.db(), true)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count quizzes"))?;
    let attempts = repositories::attempts::counts_for_student(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;
    let totals = repositories::results::totals_for_student(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to summarize results"))?;
    let recent = repositories::results::list_for_student(state.db(), student_id, 0, RECENT_RESULTS)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch recent results"))?;

    let now = primitive_now_utc();
    let current_attempt = repositories::attempts::current_for_student(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch current attempt"))?
        .map(|row| CurrentAttemptResponse {
            remaining_seconds: attempt_timing::remaining_seconds(
                AttemptStatus::InProgress,
                row.started_at,
                row.time_limit_minutes,
                now,
            ),
            attempt_id: row.id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            started_at: format_primitive(row.started_at),
        });

    Ok(Json(DashboardResponse {
        student: StudentResponse::from_db(auth.student),
        total_quizzes,
        total_attempts: attempts.total,
        completed_attempts: attempts.completed,
        current_attempt,
        total_results: totals.total,
        passed_results: totals.passed,
        failed_results: totals.failed,
        average_percentage: average(&totals),
        recent_results: recent.into_iter().map(ResultHistoryItem::from_row).collect(),
    }))
}

async fn profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ProfileResponse>, ApiError> {
    let group = match auth.student.group_id.as_deref() {
        Some(group_id) => repositories::student_groups::find_by_id(state.db(), group_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch student group"))?,
        None => None,
    };

    let login_history = repositories::login_history::list_recent_for_student(
        state.db(),
        &auth.student.id,
        LOGIN_HISTORY_LIMIT,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch login history"))?;

    let active_sessions =
        repositories::user_sessions::list_active_for_student(state.db(), &auth.student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch sessions"))?;

    Ok(Json(ProfileResponse {
        student: StudentResponse::from_db(auth.student),
        group: group.map(GroupResponse::from_db),
        login_history: login_history.into_iter().map(LoginHistoryResponse::from_db).collect(),
        active_sessions: active_sessions.into_iter().map(SessionResponse::from_db).collect(),
    }))
}

async fn statistics(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let timeline = repositories::results::timeline_for_student(state.db(), &auth.student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch results"))?;
    let totals = repositories::results::totals_for_student(state.db(), &auth.student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to summarize results"))?;

    let percentages = timeline.iter().map(|row| row.result.percentage);
    let highest = percentages.clone().fold(None, |best: Option<f64>, value| {
        Some(best.map_or(value, |best| best.max(value)))
    });
    let lowest = percentages.fold(None, |worst: Option<f64>, value| {
        Some(worst.map_or(value, |worst| worst.min(value)))
    });

    Ok(Json(StatisticsResponse {
        chart: build_chart(&timeline),
        total_results: totals.total,
        passed_results: totals.passed,
        failed_results: totals.failed,
        average_percentage: average(&totals),
        highest_percentage: highest.unwrap_or_default(),
        lowest_percentage: lowest.unwrap_or_default(),
    }))
}

async fn results(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<PageQuery>,
) -> Result<Json<ResultsHistoryResponse>, ApiError> {
    let (skip, limit) = query.window(RESULTS_PAGE_SIZE);

    let items = repositories::results::list_for_student(state.db(), &auth.student.id, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch results"))?;
    let totals = repositories::results::totals_for_student(state.db(), &auth.student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to summarize results"))?;

    Ok(Json(ResultsHistoryResponse {
        items: items.into_iter().map(ResultHistoryItem::from_row).collect(),
        total_count: totals.total,
        skip,
        limit,
        passed_results: totals.passed,
        failed_results: totals.failed,
        average_percentage: average(&totals),
    }))
}

fn average(totals: &ResultTotals) -> f64 {
    totals.average_percentage.map(scoring::round2).unwrap_or_default()
}

fn build_chart(timeline: &[ResultWithQuiz]) -> ChartData {
    let mut chart = ChartData::default();
    for row in timeline {
        chart.labels.push(chart_label(&row.quiz_title));
        chart.scores.push(row.result.percentage);
        chart.passed.push(u8::from(row.result.passed));
    }
    chart
}

fn chart_label(title: &str) -> String {
    if title.chars().count() > CHART_LABEL_CHARS {
        let short: String = title.chars().take(CHART_LABEL_CHARS).collect();
        format!("{short}...")
    } else {
        title.to_string()
    }
}
