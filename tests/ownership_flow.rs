mod common;

use actix_web::{http::StatusCode, test, App};
use common::{bearer, TestContext};
use serde_json::json;
use todo_app::models::task::Task;

#[actix_web::test]
async fn test_other_users_task_is_not_found() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let (alice_id, alice_token) = ctx.create_test_user("alice").await;
    let (_, bob_token) = ctx.create_test_user("bob").await;
    let task = ctx.create_test_task(&alice_id, "alice's secret").await;

    // bob's list is empty
    let req = test::TestRequest::get()
        .uri(&ctx.api("/tasks"))
        .insert_header(bearer(&bob_token))
        .to_request();
    let tasks: Vec<Task> = test::call_and_read_body_json(&app, req).await;
    assert!(tasks.is_empty());

    // bob cannot update alice's task, even knowing its id
    let req = test::TestRequest::put()
        .uri(&ctx.api(&format!("/tasks/{}", task.id)))
        .insert_header(bearer(&bob_token))
        .set_json(json!({ "completed": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let update_body: serde_json::Value = test::read_body_json(resp).await;

    // an invalid patch does not reveal that the task exists
    let req = test::TestRequest::put()
        .uri(&ctx.api(&format!("/tasks/{}", task.id)))
        .insert_header(bearer(&bob_token))
        .set_json(json!({ "title": "a" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // ... nor delete it
    let req = test::TestRequest::delete()
        .uri(&ctx.api(&format!("/tasks/{}", task.id)))
        .insert_header(bearer(&bob_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // "not yours" looks exactly like "does not exist"
    let req = test::TestRequest::put()
        .uri(&ctx.api(&format!("/tasks/{}", uuid::Uuid::new_v4())))
        .insert_header(bearer(&bob_token))
        .set_json(json!({ "completed": true }))
        .to_request();
    let missing_body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(update_body, missing_body);

    // alice's task is untouched
    let req = test::TestRequest::get()
        .uri(&ctx.api("/tasks"))
        .insert_header(bearer(&alice_token))
        .to_request();
    let tasks: Vec<Task> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tasks.len(), 1);
    assert!(!tasks[0].completed);
}

#[actix_web::test]
async fn test_protected_routes_reject_bad_credentials() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let (user_id, _) = ctx.create_test_user("eve").await;
    let task = ctx.create_test_task(&user_id, "guarded").await;
    let task_path = ctx.api(&format!("/tasks/{}", task.id));

    let expired = ctx.expired_token(&user_id);
    let forged = todo_app::utils::auth::TokenService::new("some-other-secret", 5)
        .issue(&user_id, "eve@test.com")
        .unwrap();

    let headers: Vec<Option<String>> = vec![
        None,
        Some("Basic ZXZlOnBhc3N3b3Jk".to_string()),
        Some("Bearer not-a-jwt".to_string()),
        Some(format!("Bearer {}", forged)),
        Some(format!("Bearer {}", expired)),
    ];

    for header in headers {
        let requests = vec![
            test::TestRequest::get().uri(&ctx.api("/tasks")),
            test::TestRequest::post()
                .uri(&ctx.api("/tasks"))
                .set_json(json!({ "title": "sneaky" })),
            test::TestRequest::put()
                .uri(&task_path)
                .set_json(json!({ "completed": true })),
            test::TestRequest::delete().uri(&task_path),
        ];

        for req in requests {
            let req = match &header {
                Some(value) => req.insert_header(("Authorization", value.clone())),
                None => req,
            };
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "header {:?}", header);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "UNAUTHORIZED");
        }
    }

    // nothing slipped through
    let tasks = ctx.state.tasks.list(&user_id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(!tasks[0].completed);
}

#[actix_web::test]
async fn test_expired_token_message() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let (user_id, _) = ctx.create_test_user("late").await;

    let req = test::TestRequest::get()
        .uri(&ctx.api("/tasks"))
        .insert_header(bearer(&ctx.expired_token(&user_id)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Token has expired");
}
