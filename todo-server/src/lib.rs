//! A todo service whose routes are endpoint descriptions.
//!
//! The descriptions live in [`api`]; this module attaches the server logic
//! to them, and [`adapter`] puts the resulting interpreter behind axum.

pub mod adapter;
pub mod api;
pub mod config;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use endpoint_core::server::TracingInterceptor;
use endpoint_core::{ServerInterpreter, ServerOptions};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

use crate::api::{ApiError, CreateTodo, Todo, UpdateTodo};
use crate::config::ServerConfig;

pub type Db = Arc<RwLock<HashMap<Uuid, Todo>>>;

/// The interpreter serving every todo endpoint from `db`.
pub fn interpreter(db: Db) -> ServerInterpreter {
    ServerInterpreter::builder()
        .options(ServerOptions {
            bad_request_on_invalid_path: true,
            ..ServerOptions::default()
        })
        .interceptor(TracingInterceptor)
        .endpoint(api::list_todos().server_logic({
            let db = db.clone();
            move |(completed,)| list_todos(db.clone(), completed)
        }))
        .endpoint(api::create_todo().server_logic({
            let db = db.clone();
            move |(input,)| create_todo(db.clone(), input)
        }))
        .endpoint(api::get_todo().server_logic({
            let db = db.clone();
            move |(id,)| get_todo(db.clone(), id)
        }))
        .endpoint(api::update_todo().server_logic({
            let db = db.clone();
            move |(id, input)| update_todo(db.clone(), id, input)
        }))
        .endpoint(api::delete_todo().server_logic(move |(id,)| delete_todo(db.clone(), id)))
        .build()
}

pub fn app() -> Router {
    app_with(&ServerConfig::default())
}

pub fn app_with(config: &ServerConfig) -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    adapter::router(interpreter(db), config.body_limit)
}

pub async fn run(listener: TcpListener, config: &ServerConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn not_found(id: Uuid) -> (ApiError,) {
    (ApiError::NotFound(format!("todo {id} not found")),)
}

async fn list_todos(db: Db, completed: Option<bool>) -> Result<(usize, Vec<Todo>), (ApiError,)> {
    let todos = db.read().await;
    let matching: Vec<Todo> = todos
        .values()
        .filter(|todo| completed.map_or(true, |completed| todo.completed == completed))
        .cloned()
        .collect();
    Ok((matching.len(), matching))
}

async fn create_todo(db: Db, input: CreateTodo) -> Result<(Todo,), (ApiError,)> {
    if input.title.trim().is_empty() {
        return Err((ApiError::BadRequest("title must not be blank".to_string()),));
    }
    let todo = Todo {
        id: Uuid::new_v4(),
        title: input.title,
        completed: input.completed,
    };
    db.write().await.insert(todo.id, todo.clone());
    tracing::info!(id = %todo.id, "todo created");
    Ok((todo,))
}

async fn get_todo(db: Db, id: Uuid) -> Result<(Todo,), (ApiError,)> {
    let todos = db.read().await;
    todos.get(&id).cloned().map(|todo| (todo,)).ok_or_else(|| not_found(id))
}

async fn update_todo(db: Db, id: Uuid, input: UpdateTodo) -> Result<(Todo,), (ApiError,)> {
    let mut todos = db.write().await;
    let todo = todos.get_mut(&id).ok_or_else(|| not_found(id))?;
    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    Ok((todo.clone(),))
}

async fn delete_todo(db: Db, id: Uuid) -> Result<(), (ApiError,)> {
    let mut todos = db.write().await;
    todos.remove(&id).ok_or_else(|| not_found(id))?;
    tracing::info!(%id, "todo deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Db {
        Arc::new(RwLock::new(HashMap::new()))
    }

    #[tokio::test]
    async fn blank_titles_are_rejected() {
        let result = create_todo(
            db(),
            CreateTodo {
                title: "   ".to_string(),
                completed: false,
            },
        )
        .await;
        assert!(matches!(result, Err((ApiError::BadRequest(_),))));
    }

    #[tokio::test]
    async fn list_filters_by_completion() {
        let db = db();
        for (title, completed) in [("a", true), ("b", false), ("c", true)] {
            create_todo(
                db.clone(),
                CreateTodo {
                    title: title.to_string(),
                    completed,
                },
            )
            .await
            .unwrap();
        }

        let (count, done) = list_todos(db.clone(), Some(true)).await.unwrap();
        assert_eq!(count, 2);
        assert!(done.iter().all(|todo| todo.completed));
        let (all, _) = list_todos(db, None).await.unwrap();
        assert_eq!(all, 3);
    }

    #[tokio::test]
    async fn missing_todos_are_not_found() {
        let id = Uuid::nil();
        let result = update_todo(db(), id, UpdateTodo::default()).await;
        assert_eq!(
            result.unwrap_err().0,
            ApiError::NotFound("todo 00000000-0000-0000-0000-000000000000 not found".to_string())
        );
    }
}
