//! What the interpreter needs from a transport's request.

use std::future::Future;
use std::io;

use bytes::Bytes;

use crate::body::{BodyKind, RawBody};
use crate::http::{header_values, Header, HttpMethod, QueryParams};

/// Request metadata: everything but the body.
///
/// Path segments and query parameters are already percent-decoded.
pub trait ServerRequest: Send + Sync {
    fn method(&self) -> &HttpMethod;

    fn path_segments(&self) -> &[String];

    fn query(&self) -> &QueryParams;

    fn headers(&self) -> &[Header];

    /// Values of cookie `name`, from every `cookie` header, percent-decoded.
    fn cookies(&self, name: &str) -> Vec<String> {
        header_values(self.headers(), "cookie")
            .iter()
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| percent_decode(value))
            .collect()
    }
}

/// The request body, read at most once and only when an endpoint needs it.
pub trait RequestBody: Send {
    fn read_raw(&mut self, kind: BodyKind) -> impl Future<Output = io::Result<RawBody>> + Send;
}

/// An already buffered body. Reading it a second time yields nothing.
impl RequestBody for Bytes {
    fn read_raw(&mut self, _kind: BodyKind) -> impl Future<Output = io::Result<RawBody>> + Send {
        let body = std::mem::take(self);
        async move { Ok(RawBody::Bytes(body)) }
    }
}

/// Owned request metadata, for transports and tests.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: HttpMethod,
    pub segments: Vec<String>,
    pub query: QueryParams,
    pub headers: Vec<Header>,
}

impl RequestParts {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            segments: Vec::new(),
            query: QueryParams::new(),
            headers: Vec::new(),
        }
    }

    /// Splits `/a/b?x=1&y` into decoded segments and query pairs. Empty
    /// segments are dropped, and a parameter without `=` has an empty value.
    pub fn from_target(method: HttpMethod, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(percent_decode)
            .collect();
        let query = query
            .into_iter()
            .flat_map(|query| query.split('&'))
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((name, value)) => (form_decode(name), form_decode(value)),
                None => (form_decode(pair), String::new()),
            })
            .collect();
        Self {
            method,
            segments,
            query,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

fn percent_decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Query components also use `+` for a space.
fn form_decode(raw: &str) -> String {
    percent_decode(&raw.replace('+', " "))
}

impl ServerRequest for RequestParts {
    fn method(&self) -> &HttpMethod {
        &self.method
    }

    fn path_segments(&self) -> &[String] {
        &self.segments
    }

    fn query(&self) -> &QueryParams {
        &self.query
    }

    fn headers(&self) -> &[Header] {
        &self.headers
    }
}
