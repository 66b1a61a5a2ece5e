use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use todo_server::{api::ErrorBody, api::Todo, app};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

const MISSING: &str = "/todos/00000000-0000-0000-0000-000000000000";

// --- list ---

#[tokio::test]
async fn list_todos_empty() {
    let resp = app().oneshot(empty_request("GET", "/todos")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-total-count"], "0");
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.is_empty());
}

#[tokio::test]
async fn list_todos_rejects_a_malformed_filter() {
    let resp = app()
        .oneshot(empty_request("GET", "/todos?completed=maybe"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let text = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(text.starts_with("Invalid value for: ?[completed]: "), "{text}");
}

// --- create ---

#[tokio::test]
async fn create_todo_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/todos", r#"{"title":"Buy milk"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let todo: Todo = body_json(resp).await;
    assert_eq!(todo.title, "Buy milk");
    assert!(!todo.completed);
}

#[tokio::test]
async fn create_todo_with_completed_true() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/todos",
            r#"{"title":"Already done","completed":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let todo: Todo = body_json(resp).await;
    assert!(todo.completed);
}

#[tokio::test]
async fn create_todo_malformed_json_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/todos", r#"{"not_title":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let text = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(text.starts_with("Invalid value for: {body as application/json}"), "{text}");
}

#[tokio::test]
async fn create_todo_blank_title_is_an_api_error() {
    let resp = app()
        .oneshot(json_request("POST", "/todos", r#"{"title":"  "}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = body_json(resp).await;
    assert_eq!(error.message, "title must not be blank");
}

// --- get ---

#[tokio::test]
async fn get_todo_not_found() {
    let resp = app().oneshot(empty_request("GET", MISSING)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let error: ErrorBody = body_json(resp).await;
    assert_eq!(
        error.message,
        "todo 00000000-0000-0000-0000-000000000000 not found"
    );
}

#[tokio::test]
async fn get_todo_bad_uuid_returns_400() {
    let resp = app()
        .oneshot(empty_request("GET", "/todos/not-a-uuid"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- unmatched ---

#[tokio::test]
async fn unknown_paths_return_404_with_empty_body() {
    let resp = app().oneshot(empty_request("GET", "/nope")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn unsupported_methods_are_not_matched() {
    let resp = app().oneshot(empty_request("PATCH", MISSING)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- update ---

#[tokio::test]
async fn update_todo_not_found() {
    let resp = app()
        .oneshot(json_request("PUT", MISSING, r#"{"title":"x"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_todo_not_found() {
    let resp = app().oneshot(empty_request("DELETE", MISSING)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let mut app = app();

    // Create
    let resp = ServiceExt::<Request<axum::body::Body>>::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/todos", r#"{"title":"Lifecycle"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Todo = body_json(resp).await;
    let id = created.id;

    // Read back
    let resp = ServiceExt::<Request<axum::body::Body>>::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/todos/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Todo = body_json(resp).await;
    assert_eq!(fetched, created);

    // Update
    let resp = ServiceExt::<Request<axum::body::Body>>::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/todos/{id}"),
            r#"{"completed":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Todo = body_json(resp).await;
    assert_eq!(updated.title, "Lifecycle");
    assert!(updated.completed);

    // List, filtered
    let resp = ServiceExt::<Request<axum::body::Body>>::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/todos?completed=false"))
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-total-count"], "0");
    let resp = ServiceExt::<Request<axum::body::Body>>::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/todos?completed=true"))
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-total-count"], "1");
    let todos: Vec<Todo> = body_json(resp).await;
    assert_eq!(todos, vec![updated]);

    // Delete
    let resp = ServiceExt::<Request<axum::body::Body>>::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/todos/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // Gone
    let resp = ServiceExt::<Request<axum::body::Body>>::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/todos/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
