mod common;

use actix_web::{App, HttpServer};
use common::TestContext;
use std::net::TcpListener;
use todo_app::client::{FileSessionStore, SessionStore, TaskApiClient, TaskBoard, View};

/// Serves the API on an ephemeral port and returns the base URL including the prefix.
fn spawn_server(ctx: &TestContext) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let state = ctx.state.clone();
    let server = HttpServer::new(move || {
        let state = state.clone();
        App::new().configure(|cfg| state.configure(cfg))
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen")
    .run();
    tokio::spawn(server);

    format!("http://127.0.0.1:{}{}", port, ctx.config.api_prefix)
}

#[tokio::test]
async fn test_board_session_and_task_flow() {
    let ctx = TestContext::new();
    let base_url = spawn_server(&ctx);
    let session_dir = tempfile::tempdir().unwrap();

    let api = TaskApiClient::new(&base_url).unwrap();
    assert_eq!(api.health().await.unwrap().status, "ok");

    let mut board = TaskBoard::new(api.clone(), FileSessionStore::new(session_dir.path()));
    assert_eq!(board.view(), View::Login);

    board
        .register("alice", "alice@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(board.view(), View::Tasks);
    assert_eq!(board.user().unwrap().username, "alice");
    assert!(board.tasks().is_empty());

    // create through the form
    board.open_form(None);
    board.form_mut().unwrap().title = "Buy milk".to_string();
    board.submit_form().await.unwrap();
    assert!(board.form().is_none());
    assert_eq!(board.tasks().len(), 1);
    let task = board.tasks()[0].clone();
    assert!(!task.completed);

    // toggling sends only `completed`
    board.toggle_complete(&task.id).await.unwrap();
    assert!(board.tasks()[0].completed);
    assert_eq!(board.tasks()[0].title, "Buy milk");
    assert!(board.render().contains("[x] Buy milk"));

    // the same form edits
    board.open_form(Some(&task));
    board.form_mut().unwrap().title = "Buy oat milk".to_string();
    board.submit_form().await.unwrap();
    assert_eq!(board.tasks()[0].title, "Buy oat milk");
    assert!(board.tasks()[0].completed);

    // a rejected save keeps the form open
    board.open_form(None);
    board.form_mut().unwrap().title = "no".to_string();
    let err = board.submit_form().await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(board.form().is_some());
    board.close_form();

    // a second board resumes from the persisted token
    let mut resumed = TaskBoard::new(api.clone(), FileSessionStore::new(session_dir.path()));
    assert!(resumed.restore().await.unwrap());
    assert_eq!(resumed.user().unwrap().username, "alice");
    assert_eq!(resumed.tasks().len(), 1);

    board.delete(&task.id).await.unwrap();
    assert!(board.tasks().is_empty());

    board.logout().unwrap();
    assert_eq!(board.view(), View::Login);
    assert!(board.user().is_none());
    assert_eq!(
        FileSessionStore::new(session_dir.path()).load().unwrap(),
        None
    );
}

#[tokio::test]
async fn test_restore_discards_rejected_token() {
    let ctx = TestContext::new();
    let base_url = spawn_server(&ctx);
    let session_dir = tempfile::tempdir().unwrap();

    let (user_id, _) = ctx.create_test_user("stale").await;
    let store = FileSessionStore::new(session_dir.path());
    store.save(&ctx.expired_token(&user_id)).unwrap();

    let api = TaskApiClient::new(&base_url).unwrap();
    let mut board = TaskBoard::new(api, FileSessionStore::new(session_dir.path()));

    assert!(!board.restore().await.unwrap());
    assert_eq!(board.view(), View::Login);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn test_login_with_wrong_password_surfaces_api_error() {
    let ctx = TestContext::new();
    let base_url = spawn_server(&ctx);
    ctx.create_test_user("frank").await;

    let api = TaskApiClient::new(&base_url).unwrap();
    let mut board = TaskBoard::new(api, todo_app::client::MemorySessionStore::default());

    let err = board.login("frank@test.com", "wrong-password").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(board.view(), View::Login);
}
