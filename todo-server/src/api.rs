//! The todo API, described once and shared by the server and its clients.

use endpoint_core::{endpoint, input, output, Endpoint, Output};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateTodo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// JSON body of every error response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::NotFound(message) | ApiError::BadRequest(message) => message,
        }
    }
}

fn error_body(to_error: fn(String) -> ApiError) -> Output<(ApiError,)> {
    output::body_json::<ErrorBody>().map(
        move |(body,)| to_error(body.message),
        |error: ApiError| {
            (ErrorBody {
                message: error.message().to_string(),
            },)
        },
    )
}

/// `404` for missing todos, `400` for everything else.
pub fn api_error_output() -> Output<(ApiError,)> {
    output::one_of::<ApiError>()
        .variant(404, error_body(ApiError::NotFound), |error| {
            matches!(error, ApiError::NotFound(_))
        })
        .default_variant(Some(400), error_body(ApiError::BadRequest))
        .build()
}

fn todos() -> Endpoint<(), (ApiError,), ()> {
    endpoint()
        .input(input::fixed_path("todos"))
        .error_output(api_error_output())
        .tag("todos")
}

fn todo_by_id() -> Endpoint<(Uuid,), (ApiError,), ()> {
    todos().input(input::path::<Uuid>("id"))
}

/// `GET /todos?completed`, answering with the count in `x-total-count`.
pub fn list_todos() -> Endpoint<(Option<bool>,), (ApiError,), (usize, Vec<Todo>)> {
    todos()
        .get()
        .input(input::query_opt::<bool>("completed"))
        .output(output::header::<usize>("x-total-count"))
        .output(output::body_json::<Vec<Todo>>())
        .name("list-todos")
        .summary("List todos, optionally filtered by completion")
}

pub fn create_todo() -> Endpoint<(CreateTodo,), (ApiError,), (Todo,)> {
    todos()
        .post()
        .input(input::body_json::<CreateTodo>())
        .output(output::fixed_status(201))
        .output(output::body_json::<Todo>())
        .name("create-todo")
}

pub fn get_todo() -> Endpoint<(Uuid,), (ApiError,), (Todo,)> {
    todo_by_id().get().output(output::body_json::<Todo>()).name("get-todo")
}

pub fn update_todo() -> Endpoint<(Uuid, UpdateTodo), (ApiError,), (Todo,)> {
    todo_by_id()
        .put()
        .input(input::body_json::<UpdateTodo>())
        .output(output::body_json::<Todo>())
        .name("update-todo")
}

pub fn delete_todo() -> Endpoint<(Uuid,), (ApiError,), ()> {
    todo_by_id().delete().output(output::fixed_status(204)).name("delete-todo")
}
