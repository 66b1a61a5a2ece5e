//! Serves a `ServerInterpreter` from an axum router.
//!
//! Every request goes to a single fallback handler, which converts it to
//! `RequestParts` plus a lazily read body and writes the interpreter's
//! response back. Requests no endpoint accepts get an empty `404`.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use endpoint_core::{BodyKind, HttpMethod, InterpretError, RawBody, RequestBody, RequestParts, ServerInterpreter, ServerResponse};
use futures::{StreamExt, TryStreamExt};

/// Default for the largest body buffered for byte and text body inputs.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    interpreter: Arc<ServerInterpreter>,
    body_limit: usize,
}

pub fn router(interpreter: ServerInterpreter, body_limit: usize) -> Router {
    let state = AppState {
        interpreter: Arc::new(interpreter),
        body_limit,
    };
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(method) = parts.method.as_str().parse::<HttpMethod>() else {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    };
    let target = parts.uri.path_and_query().map_or("/", |target| target.as_str());
    let mut request = RequestParts::from_target(method, target);
    request.headers = header_pairs(&parts.headers);

    let mut body = AxumBody::new(body, state.body_limit);
    match state.interpreter.handle(&request, &mut body).await {
        Ok(Some(response)) => into_response(response),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(InterpretError::BodyRead(error)) => {
            tracing::warn!(%error, "request body could not be read");
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(error) => {
            tracing::error!(%error, uri = %parts.uri, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Header values that are not visible ASCII are dropped.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn into_response(response: ServerResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match response.body {
        None => Body::empty(),
        Some(RawBody::Bytes(bytes)) => Body::from(bytes),
        Some(RawBody::Text(text)) => Body::from(text),
        Some(RawBody::Stream(stream)) => Body::from_stream(stream),
    };
    let mut builder = Response::builder().status(status);
    for (name, value) in response.headers {
        builder = builder.header(name, value);
    }
    builder.body(body).unwrap_or_else(|error| {
        tracing::error!(%error, "response headers are not valid HTTP");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

/// An axum request body, read on demand by the interpreter.
pub struct AxumBody {
    body: Option<Body>,
    limit: usize,
}

impl AxumBody {
    pub fn new(body: Body, limit: usize) -> Self {
        Self { body: Some(body), limit }
    }
}

impl RequestBody for AxumBody {
    fn read_raw(&mut self, kind: BodyKind) -> impl Future<Output = io::Result<RawBody>> + Send {
        let body = self.body.take();
        let limit = self.limit;
        async move {
            let Some(body) = body else {
                return Ok(RawBody::Bytes(Bytes::new()));
            };
            match kind {
                BodyKind::Stream => Ok(RawBody::Stream(body.into_data_stream().map_err(io::Error::other).boxed())),
                BodyKind::Bytes | BodyKind::Text => {
                    let bytes = axum::body::to_bytes(body, limit).await.map_err(io::Error::other)?;
                    Ok(RawBody::Bytes(bytes))
                }
            }
        }
    }
}
