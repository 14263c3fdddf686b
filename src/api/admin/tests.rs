use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::test_support;

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn admin_login_issues_admin_token() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_admin(ctx.state.db(), "registrar").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/login",
            None,
            Some(json!({ "username": "registrar", "password": test_support::TEST_ADMIN_PASSWORD })),
        ))
        .await
        .expect("login");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["admin"]["username"], "registrar");
    assert!(body.get("hashed_password").is_none());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/login",
            None,
            Some(json!({ "username": "registrar", "password": "wrong" })),
        ))
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn admin_manages_quiz_and_questions() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "editor").await;
    let token = test_support::admin_token(&admin, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/quizzes",
            Some(&token),
            Some(json!({ "title": "Finance basics", "time_limit_minutes": 20 })),
        ))
        .await
        .expect("create quiz");
    let status = response.status();
    let quiz = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {quiz}");
    assert_eq!(quiz["passing_score"], 60);
    let quiz_id = quiz["id"].as_str().expect("quiz id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/quizzes/{quiz_id}/questions"),
            Some(&token),
            Some(json!({
                "question_text": "What is a bond?",
                "score": 2,
                "options": [
                    { "option_text": "A debt security", "is_correct": true },
                    { "option_text": "A share" }
                ]
            })),
        ))
        .await
        .expect("create question");
    let status = response.status();
    let question = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {question}");
    assert_eq!(question["order_index"], 0);
    assert_eq!(question["options"].as_array().map(Vec::len), Some(2));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/quizzes/{quiz_id}/questions"),
            Some(&token),
            Some(json!({
                "question_text": "No correct answer",
                "options": [{ "option_text": "Nope" }]
            })),
        ))
        .await
        .expect("invalid question");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/admin/quizzes/{quiz_id}"),
            Some(&token),
            Some(json!({ "is_active": false, "passing_score": 70 })),
        ))
        .await
        .expect("update quiz");
    let updated = test_support::read_json(response).await;
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["passing_score"], 70);
    assert_eq!(updated["question_count"], 1);
    assert_eq!(updated["max_score"], 2);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/quizzes",
            Some(&token),
            None,
        ))
        .await
        .expect("list quizzes");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn question_batch_imports_once() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "importer").await;
    let token = test_support::admin_token(&admin, ctx.state.settings());
    let quiz = test_support::insert_quiz(ctx.state.db(), &admin.id, "Imported").await;
    test_support::insert_question(ctx.state.db(), &quiz.id, 0, &[("a", true)]).await;

    let raw_text = "2 + 2?\n=====\n#4\n=====\n5\n+++++\nNo marker\n=====\nx\n=====\ny\n+++++\nCapital of Uzbekistan?\n=====\nSamarkand\n=====\n# Tashkent";
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/quizzes/{}/question-batches", quiz.id),
            Some(&token),
            Some(json!({ "raw_text": raw_text, "score": 3 })),
        ))
        .await
        .expect("create batch");
    let status = response.status();
    let batch = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {batch}");
    assert_eq!(batch["imported"], 2);
    assert_eq!(batch["skipped"], 1);
    assert_eq!(batch["is_processed"], true);

    let questions = repositories::questions::list_for_quiz(ctx.state.db(), &quiz.id)
        .await
        .expect("questions");
    let order: Vec<i32> = questions.iter().map(|question| question.order_index).collect();
    assert_eq!(order, [0, 1, 2]);
    assert_eq!(questions[2].question_text, "Capital of Uzbekistan?");
    assert_eq!(questions[2].score, 3);

    let batch_id = batch["id"].as_str().expect("batch id");
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/question-batches/{batch_id}/process"),
            Some(&token),
            None,
        ))
        .await
        .expect("reprocess");
    let again = test_support::read_json(response).await;
    assert_eq!(again["imported"], 0);

    let count = repositories::questions::count_for_quiz(ctx.state.db(), &quiz.id)
        .await
        .expect("count");
    assert_eq!(count, 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn session_cleanup_removes_expired_and_stale_only() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let admin = test_support::insert_admin(pool, "janitor").await;
    let token = test_support::admin_token(&admin, ctx.state.settings());
    let student = test_support::insert_student(pool, "392211100321").await;

    let live = test_support::insert_session(pool, &student, Duration::hours(2), None).await;
    let expired = test_support::insert_session(pool, &student, Duration::hours(-1), None).await;
    let stale = test_support::insert_session(pool, &student, Duration::days(30), None).await;
    sqlx::query("UPDATE user_sessions SET last_activity = $1 WHERE id = $2")
        .bind(primitive_now_utc() - Duration::days(8))
        .bind(&stale.id)
        .execute(pool)
        .await
        .expect("age session");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/sessions/cleanup",
            Some(&token),
            Some(json!({ "days": 7 })),
        ))
        .await
        .expect("cleanup");
    let body = test_support::read_json(response).await;
    assert_eq!(body["removed"], 2, "response: {body}");

    let remaining = repositories::user_sessions::list_active_for_student(pool, &student.id)
        .await
        .expect("sessions");
    let ids: Vec<&str> = remaining.iter().map(|session| session.id.as_str()).collect();
    assert_eq!(ids, [live.id.as_str()]);
    assert!(repositories::user_sessions::find_by_key(pool, &expired.session_key)
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn student_tokens_cannot_reach_admin_routes() {
    let ctx = test_support::setup_test_context().await;
    let student = test_support::insert_student(ctx.state.db(), "392211100322").await;
    let session =
        test_support::insert_session(ctx.state.db(), &student, Duration::hours(1), None).await;
    let token = test_support::student_token(&session, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/quizzes",
            Some(&token),
            None,
        ))
        .await
        .expect("list quizzes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
