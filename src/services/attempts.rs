use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use sqlx::{PgConnection, PgPool};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics::QUIZ_ATTEMPTS_FINISHED_TOTAL;
use crate::db::models::{Quiz, QuizAttempt, QuizResult};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::services::attempt_timing;
use crate::services::scoring::{self, QuestionScore, ResponseMark};

#[derive(Debug)]
pub(crate) struct FinishedAttempt {
    pub(crate) attempt: QuizAttempt,
    pub(crate) result: Option<QuizResult>,
}

/// Returns the student's open attempt for `quiz`, creating one if needed.
/// Concurrent starts race on the partial unique index; the loser reads the
/// winner's row.
pub(crate) async fn start_or_resume(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
    now: PrimitiveDateTime,
) -> Result<QuizAttempt> {
    if let Some(attempt) = repositories::attempts::find_in_progress(pool, student_id, quiz_id)
        .await
        .context("Failed to fetch in-progress attempt")?
    {
        return Ok(attempt);
    }

    let attempt_id = Uuid::new_v4().to_string();
    let inserted =
        repositories::attempts::insert_in_progress(pool, &attempt_id, student_id, quiz_id, now)
            .await
            .context("Failed to create attempt")?;
    if inserted {
        tracing::info!(attempt_id, student_id, quiz_id, "Quiz attempt started");
    }

    repositories::attempts::find_in_progress(pool, student_id, quiz_id)
        .await
        .context("Failed to re-read in-progress attempt")?
        .ok_or_else(|| anyhow!("In-progress attempt vanished after insert"))
}

/// Moves `attempt` into `target` and computes its result in one
/// transaction. Finishing an attempt that is already terminal returns the
/// stored state untouched.
pub(crate) async fn finish(
    pool: &PgPool,
    attempt: &QuizAttempt,
    quiz: &Quiz,
    target: AttemptStatus,
    now: PrimitiveDateTime,
) -> Result<FinishedAttempt> {
    let Some(stamp) = attempt_timing::finish_stamp(
        attempt.status,
        target,
        attempt.started_at,
        quiz.time_limit_minutes,
        now,
    ) else {
        return load_finished(pool, attempt).await;
    };

    let mut tx = pool.begin().await.context("Failed to begin attempt transaction")?;

    let finished = repositories::attempts::finish(
        &mut *tx,
        &attempt.id,
        stamp.status,
        stamp.completed_at,
        stamp.time_taken_seconds,
    )
    .await
    .context("Failed to update attempt status")?;

    let Some(finished) = finished else {
        tx.rollback().await.context("Failed to roll back attempt transaction")?;
        tracing::debug!(attempt_id = %attempt.id, "Attempt already finished concurrently");
        return load_finished(pool, attempt).await;
    };

    let result = calculate_result(&mut *tx, &finished, quiz, now).await?;
    tx.commit().await.context("Failed to commit attempt transaction")?;

    metrics::counter!(QUIZ_ATTEMPTS_FINISHED_TOTAL, "status" => stamp.status.as_str())
        .increment(1);
    tracing::info!(
        attempt_id = %finished.id,
        status = stamp.status.as_str(),
        percentage = result.percentage,
        passed = result.passed,
        "Quiz attempt finished"
    );

    Ok(FinishedAttempt { attempt: finished, result: Some(result) })
}

/// Expires an in-progress attempt whose time limit has passed. `None` when
/// the attempt is still open.
pub(crate) async fn expire_if_overdue(
    pool: &PgPool,
    attempt: &QuizAttempt,
    quiz: &Quiz,
    now: PrimitiveDateTime,
) -> Result<Option<FinishedAttempt>> {
    if attempt.status != AttemptStatus::InProgress
        || !attempt_timing::is_time_expired(attempt.started_at, quiz.time_limit_minutes, now)
    {
        return Ok(None);
    }

    finish(pool, attempt, quiz, AttemptStatus::Expired, now).await.map(Some)
}

/// Recomputes the attempt's result from its stored responses and overwrites
/// any previous row.
pub(crate) async fn calculate_result(
    conn: &mut PgConnection,
    attempt: &QuizAttempt,
    quiz: &Quiz,
    now: PrimitiveDateTime,
) -> Result<QuizResult> {
    let questions = repositories::questions::list_for_quiz(&mut *conn, &quiz.id)
        .await
        .context("Failed to load quiz questions")?;
    let responses = repositories::responses::list_for_attempt(&mut *conn, &attempt.id)
        .await
        .context("Failed to load attempt responses")?;

    let question_scores: Vec<QuestionScore<'_>> = questions
        .iter()
        .map(|question| QuestionScore { question_id: &question.id, score: question.score })
        .collect();
    let marks: Vec<ResponseMark<'_>> = responses
        .iter()
        .map(|response| ResponseMark {
            question_id: &response.question_id,
            has_selection: response.selected_option_id.is_some(),
            is_correct: response.is_correct,
        })
        .collect();

    let summary = scoring::compute(&question_scores, &marks, quiz.passing_score);
    let result_id = Uuid::new_v4().to_string();

    repositories::results::upsert(
        &mut *conn,
        repositories::results::UpsertResult {
            id: &result_id,
            attempt_id: &attempt.id,
            total_questions: summary.total_questions,
            correct_answers: summary.correct_answers,
            wrong_answers: summary.wrong_answers,
            unanswered: summary.unanswered,
            total_score: summary.total_score,
            max_score: summary.max_score,
            percentage: summary.percentage,
            passed: summary.passed,
            now,
        },
    )
    .await
    .context("Failed to store quiz result")
}

/// Saves the submitted `question_id -> option_id` pairs. Pairs naming a
/// question outside the quiz or an option outside the question are skipped.
/// Returns the number of answers stored.
pub(crate) async fn save_answers(
    pool: &PgPool,
    attempt: &QuizAttempt,
    answers: &HashMap<String, String>,
    now: PrimitiveDateTime,
) -> Result<usize> {
    let mut tx = pool.begin().await.context("Failed to begin answer transaction")?;
    let mut saved = 0usize;

    for (question_id, option_id) in answers {
        let question_id = question_id.trim();
        let option_id = option_id.trim();
        if question_id.is_empty() || option_id.is_empty() {
            continue;
        }

        let question =
            repositories::questions::find_in_quiz(&mut *tx, &attempt.quiz_id, question_id)
                .await
                .context("Failed to fetch question")?;
        let Some(question) = question else {
            tracing::debug!(attempt_id = %attempt.id, question_id, "Skipping unknown question");
            continue;
        };

        let option =
            repositories::question_options::find_for_question(&mut *tx, &question.id, option_id)
                .await
                .context("Failed to fetch option")?;
        let Some(option) = option else {
            tracing::debug!(attempt_id = %attempt.id, option_id, "Skipping unknown option");
            continue;
        };

        let response_id = Uuid::new_v4().to_string();
        repositories::responses::upsert(
            &mut *tx,
            repositories::responses::SaveResponse {
                id: &response_id,
                attempt_id: &attempt.id,
                question_id: &question.id,
                selected_option_id: &option.id,
                is_correct: option.is_correct,
                answered_at: now,
            },
        )
        .await
        .context("Failed to save response")?;
        saved += 1;
    }

    tx.commit().await.context("Failed to commit answer transaction")?;
    Ok(saved)
}

async fn load_finished(pool: &PgPool, attempt: &QuizAttempt) -> Result<FinishedAttempt> {
    let current = repositories::attempts::find_for_student(pool, &attempt.id, &attempt.student_id)
        .await
        .context("Failed to re-read attempt")?
        .ok_or_else(|| anyhow!("Attempt {} disappeared", attempt.id))?;
    let result = repositories::results::find_by_attempt(pool, &attempt.id)
        .await
        .context("Failed to fetch quiz result")?;

    Ok(FinishedAttempt { attempt: current, result })
}
