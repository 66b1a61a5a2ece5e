//! Client interpretation of endpoint descriptions.
//!
//! # Design
//! `EndpointClient` holds only a `base_url` and carries no mutable state
//! between calls. Each call is split into `build_request`, which encodes an
//! input value into an `HttpRequest`, and `parse_response`, which decodes an
//! `HttpResponse` with the output or the error output depending on the
//! status. The caller executes the round-trip in between, or hands a
//! `Transport` to `call`.

use std::future::Future;
use std::io;

use crate::body::RawBody;
use crate::endpoint::Endpoint;
use crate::error::{ClientError, DecodeError, DecodeResult, FailingOutput, ResponseDecodeFailure, StructuralError};
use crate::http::{header_values, Header, HttpMethod, HttpRequest, HttpResponse};
use crate::node::{BasicInput, BasicOutput, InputNode, LeafPath, OutputNode};
use crate::params::Params;
use crate::tuple::Tuple;

/// Executes an `HttpRequest`, e.g. over a real HTTP connection.
///
/// Non-2xx responses are data, not errors: only a failed exchange is an
/// `Err`.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> impl Future<Output = io::Result<HttpResponse>> + Send;
}

/// Stateless client for any endpoint description.
#[derive(Debug, Clone)]
pub struct EndpointClient {
    base_url: String,
}

#[derive(Default)]
struct EncodedParts {
    method: Option<HttpMethod>,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    headers: Vec<Header>,
    cookies: Vec<(String, String)>,
    body: Option<(RawBody, &'static str)>,
}

impl EndpointClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Encodes `input` into a request. The method defaults to `GET`.
    pub fn build_request<I: Tuple, E, O>(
        &self,
        endpoint: &Endpoint<I, E, O>,
        input: I,
    ) -> Result<HttpRequest, StructuralError> {
        let mut parts = EncodedParts::default();
        build_into(endpoint.input_node(), input.into_params(), &mut parts)?;

        let mut path = self.base_url.clone();
        for segment in &parts.segments {
            path.push('/');
            path.push_str(&urlencoding::encode(segment));
        }
        if parts.segments.is_empty() {
            path.push('/');
        }
        if !parts.query.is_empty() {
            let query: Vec<String> = parts
                .query
                .iter()
                .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
                .collect();
            path.push('?');
            path.push_str(&query.join("&"));
        }

        let mut headers = parts.headers;
        if !parts.cookies.is_empty() {
            let cookies: Vec<String> = parts
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
                .collect();
            headers.push(("cookie".to_string(), cookies.join("; ")));
        }
        let body = parts.body.map(|(body, media_type)| {
            if header_values(&headers, "content-type").is_empty() {
                headers.push(("content-type".to_string(), media_type.to_string()));
            }
            body
        });

        Ok(HttpRequest {
            method: parts.method.unwrap_or(HttpMethod::Get),
            path,
            headers,
            body,
        })
    }

    /// Decodes a 2xx response with the output, anything else with the
    /// error output.
    /// A failure names the output leaf, or the mapped node, that rejected
    /// the response.
    pub fn parse_response<I, E: Tuple, O: Tuple>(
        &self,
        endpoint: &Endpoint<I, E, O>,
        response: HttpResponse,
    ) -> Result<Result<O, E>, ResponseDecodeFailure> {
        let root = LeafPath::root();
        if response.is_success() {
            decode_output(endpoint.output_node(), &root, &response).map(|params| Ok(O::from_params(params)))
        } else {
            decode_output(endpoint.error_output_node(), &root, &response).map(|params| Err(E::from_params(params)))
        }
    }

    pub async fn call<T, I, E, O>(
        &self,
        transport: &T,
        endpoint: &Endpoint<I, E, O>,
        input: I,
    ) -> Result<Result<O, E>, ClientError>
    where
        T: Transport,
        I: Tuple,
        E: Tuple,
        O: Tuple,
    {
        let request = self.build_request(endpoint, input)?;
        tracing::debug!(method = %request.method, path = %request.path, "sending request");
        let response = transport.send(request).await?;
        tracing::debug!(status = response.status, "received response");
        Ok(self.parse_response(endpoint, response)?)
    }
}

fn build_into(node: &InputNode, value: Params, parts: &mut EncodedParts) -> Result<(), StructuralError> {
    match node {
        InputNode::Pair(pair) => {
            let (left, right) = (pair.split)(value);
            build_into(&pair.left, left, parts)?;
            build_into(&pair.right, right, parts)
        }
        InputNode::Mapped(mapped) => build_into(&mapped.wrapped, (mapped.encode)(value), parts),
        InputNode::Basic(basic) => {
            match basic {
                BasicInput::Method(method) => parts.method = Some(method.clone()),
                BasicInput::FixedPath(segment) => parts.segments.push(segment.clone()),
                BasicInput::PathCapture { codec, .. } => parts.segments.push(codec.encode_params(value)),
                BasicInput::PathsCapture { codec } => parts.segments.extend(codec.encode_params(value)),
                BasicInput::Query { name, codec } => {
                    for v in codec.encode_params(value) {
                        parts.query.push((name.clone(), v));
                    }
                }
                BasicInput::QueryParams { codec } => parts.query.extend(codec.encode_params(value).into_pairs()),
                BasicInput::Header { name, codec } => {
                    for v in codec.encode_params(value) {
                        parts.headers.push((name.clone(), v));
                    }
                }
                BasicInput::FixedHeader { name, value } => parts.headers.push((name.clone(), value.clone())),
                BasicInput::Headers { codec } => parts.headers.extend(codec.encode_params(value)),
                BasicInput::Cookie { name, codec } => {
                    for v in codec.encode_params(value) {
                        parts.cookies.push((name.clone(), v));
                    }
                }
                BasicInput::Body(leaf) => {
                    if parts.body.is_some() {
                        return Err(StructuralError::DuplicateBody("input"));
                    }
                    let raw = leaf.codec.encode_params(value);
                    parts.body = Some((raw, leaf.codec.format().media_type()));
                }
                BasicInput::Empty => {}
            }
            Ok(())
        }
    }
}

fn decode_output(node: &OutputNode, path: &LeafPath, response: &HttpResponse) -> Result<Params, ResponseDecodeFailure> {
    let failure = |description: String, error: DecodeError| ResponseDecodeFailure {
        output: FailingOutput {
            path: path.clone(),
            description,
        },
        error,
    };
    match node {
        OutputNode::Basic(basic) => {
            decode_basic_output(basic, response).map_err(|error| failure(basic.describe(), error))
        }
        OutputNode::Pair(pair) => {
            let left = decode_output(&pair.left, &path.left(), response)?;
            let right = decode_output(&pair.right, &path.right(), response)?;
            Ok((pair.combine)(left, right))
        }
        OutputNode::Mapped(mapped) => {
            let inner = decode_output(&mapped.wrapped, &path.mapped(), response)?;
            (mapped.decode)(inner).map_err(|error| failure(mapped.wrapped.show(), error))
        }
        OutputNode::OneOf(one_of) => {
            // Variants declaring this status first, then those without one.
            let variants = one_of.variants.iter().enumerate();
            let candidates = variants
                .clone()
                .filter(|(_, v)| v.status == Some(response.status))
                .chain(variants.filter(|(_, v)| v.status.is_none()));
            let mut last_failure = None;
            for (index, variant) in candidates {
                match decode_output(&variant.output, &path.variant(index), response) {
                    Ok(value) => return Ok(value),
                    Err(err) => last_failure = Some(err),
                }
            }
            Err(last_failure.unwrap_or_else(|| {
                let statuses: Vec<String> = one_of
                    .variants
                    .iter()
                    .filter_map(|v| v.status.map(|s| s.to_string()))
                    .collect();
                failure(
                    node.show(),
                    DecodeError::mismatch(format!("one of {}", statuses.join(", ")), response.status.to_string()),
                )
            }))
        }
        OutputNode::Void => Err(failure(
            "void".to_string(),
            DecodeError::mismatch("a success status", response.status.to_string()),
        )),
    }
}

fn decode_basic_output(basic: &BasicOutput, response: &HttpResponse) -> DecodeResult<Params> {
    match basic {
        BasicOutput::Body(leaf) => leaf.codec.decode_params(RawBody::Bytes(response.body.clone())),
        BasicOutput::Header { name, codec } => codec.decode_params(header_values(&response.headers, name)),
        BasicOutput::FixedHeader { name, value } => {
            let values = header_values(&response.headers, name);
            if values.iter().any(|v| v == value) {
                Ok(Params::unit())
            } else if values.is_empty() {
                Err(DecodeError::Missing)
            } else {
                Err(DecodeError::mismatch(value.as_str(), values.join(", ")))
            }
        }
        BasicOutput::Headers { codec } => codec.decode_params(response.headers.clone()),
        BasicOutput::StatusCode { codec } => codec.decode_params(response.status),
        BasicOutput::FixedStatusCode(code) => {
            if response.status == *code {
                Ok(Params::unit())
            } else {
                Err(DecodeError::mismatch(code.to_string(), response.status.to_string()))
            }
        }
        BasicOutput::Empty => Ok(Params::unit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::{Deserialize, Serialize};

    use crate::endpoint::endpoint;
    use crate::{input, output};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
    }

    #[derive(Debug, PartialEq)]
    enum ItemError {
        NotFound,
        Invalid(String),
    }

    fn client() -> EndpointClient {
        EndpointClient::new("http://localhost:3000")
    }

    fn get_item() -> Endpoint<(u64,), (ItemError,), (Item,)> {
        endpoint()
            .get()
            .input(input::fixed_path("items"))
            .input(input::path::<u64>("id"))
            .output(output::body_json::<Item>())
            .error_output(
                output::one_of::<ItemError>()
                    .variant(
                        404,
                        output::empty().map(|()| ItemError::NotFound, |_| ()),
                        |e| matches!(e, ItemError::NotFound),
                    )
                    .default_variant(
                        Some(400),
                        output::body_text().map(
                            |(msg,)| ItemError::Invalid(msg),
                            |e| match e {
                                ItemError::Invalid(msg) => (msg,),
                                ItemError::NotFound => (String::new(),),
                            },
                        ),
                    )
                    .build(),
            )
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn build_request_encodes_path_segments() {
        let req = client().build_request(&get_item(), (42,)).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/items/42");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_encodes_query_and_cookies() {
        let search = endpoint()
            .input(input::fixed_path("search"))
            .input(input::query::<String>("q"))
            .input(input::query_list::<u8>("page"))
            .input(input::cookie::<String>("session"))
            .input(input::cookie_opt::<String>("theme"));
        let req = client()
            .build_request(&search, ("a b&c".to_string(), vec![1, 2], "s1".to_string(), Some("dark".to_string())))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/search?q=a%20b%26c&page=1&page=2");
        assert_eq!(req.headers, vec![("cookie".to_string(), "session=s1; theme=dark".to_string())]);

        let req = client()
            .build_request(&search, ("x".to_string(), Vec::new(), "a=b; c".to_string(), None))
            .unwrap();
        assert_eq!(req.headers, vec![("cookie".to_string(), "session=a%3Db%3B%20c".to_string())]);
    }

    #[test]
    fn build_request_sets_content_type_from_body_codec() {
        let create = endpoint().post().input(input::fixed_path("items")).input(input::body_json::<Item>());
        let req = client().build_request(&create, (Item { name: "milk".to_string() },)).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        match req.body {
            Some(RawBody::Text(json)) => assert_eq!(json, r#"{"name":"milk"}"#),
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn build_request_rejects_two_bodies() {
        let broken = endpoint().input(input::body_text()).input(input::body_text());
        let err = client()
            .build_request(&broken, ("a".to_string(), "b".to_string()))
            .unwrap_err();
        assert_eq!(err, StructuralError::DuplicateBody("input"));
    }

    #[test]
    fn parse_response_success() {
        let parsed = client()
            .parse_response(&get_item(), response(200, r#"{"name":"milk"}"#))
            .unwrap();
        assert_eq!(parsed, Ok((Item { name: "milk".to_string() },)));
    }

    #[test]
    fn parse_response_selects_error_variant_by_status() {
        let not_found = client().parse_response(&get_item(), response(404, "")).unwrap();
        assert_eq!(not_found, Err((ItemError::NotFound,)));
        let invalid = client().parse_response(&get_item(), response(400, "bad id")).unwrap();
        assert_eq!(invalid, Err((ItemError::Invalid("bad id".to_string()),)));
    }

    #[test]
    fn parse_response_unknown_error_status() {
        let err = client().parse_response(&get_item(), response(500, "boom")).unwrap_err();
        assert!(matches!(err.error, DecodeError::Mismatch { .. }));
        assert_eq!(err.output.path, LeafPath::root());
    }

    #[test]
    fn parse_response_bad_json() {
        let err = client().parse_response(&get_item(), response(200, "not json")).unwrap_err();
        assert!(matches!(err.error, DecodeError::Malformed { .. }));
        assert_eq!(err.output.description, "{body as application/json}");
    }

    #[test]
    fn error_without_error_output_is_a_mismatch() {
        let ping = endpoint().input(input::fixed_path("ping"));
        let err = client().parse_response(&ping, response(503, "")).unwrap_err();
        assert!(matches!(err.error, DecodeError::Mismatch { .. }));
        assert_eq!(err.output.description, "void");
    }

    #[test]
    fn parse_response_names_the_failing_output() {
        let page = endpoint()
            .input(input::fixed_path("items"))
            .output(output::header::<u32>("x-total-count"))
            .output(output::body_json::<Vec<Item>>());
        let mut bad_count = response(200, "[]");
        bad_count.headers.push(("x-total-count".to_string(), "many".to_string()));

        let err = client().parse_response(&page, bad_count).unwrap_err();
        assert_eq!(err.output.description, "{header x-total-count}");
        assert_eq!(err.output.path, LeafPath::root().left());
        assert!(matches!(err.error, DecodeError::Malformed { ref original, .. } if original == "many"));

        let mut bad_body = response(200, "{}");
        bad_body.headers.push(("x-total-count".to_string(), "0".to_string()));
        let err = client().parse_response(&page, bad_body).unwrap_err();
        assert_eq!(err.output.path, LeafPath::root().right());
    }

    #[test]
    fn parse_response_names_the_error_variant_leaf() {
        let lookup = endpoint().input(input::fixed_path("items")).error_output(
            output::one_of::<ItemError>()
                .variant(
                    404,
                    output::fixed_header("x-reason", "gone").map(|()| ItemError::NotFound, |_| ()),
                    |e| matches!(e, ItemError::NotFound),
                )
                .build(),
        );
        let err = client().parse_response(&lookup, response(404, "")).unwrap_err();
        assert_eq!(err.error, DecodeError::Missing);
        assert_eq!(err.output.description, "{header x-reason: gone}");
        assert_eq!(err.output.path, LeafPath::root().variant(0).mapped());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = EndpointClient::new("http://localhost:3000/");
        let req = client.build_request(&get_item(), (1,)).unwrap();
        assert_eq!(req.path, "http://localhost:3000/items/1");
    }

    struct Canned(u16, &'static str);

    impl Transport for Canned {
        fn send(&self, request: HttpRequest) -> impl Future<Output = io::Result<HttpResponse>> + Send {
            assert_eq!(request.path, "http://localhost:3000/items/7");
            let response = response(self.0, self.1);
            async move { Ok(response) }
        }
    }

    #[tokio::test]
    async fn call_runs_the_round_trip() {
        let result = client().call(&Canned(200, r#"{"name":"tea"}"#), &get_item(), (7,)).await.unwrap();
        assert_eq!(result, Ok((Item { name: "tea".to_string() },)));
        let result = client().call(&Canned(404, ""), &get_item(), (7,)).await.unwrap();
        assert_eq!(result, Err((ItemError::NotFound,)));
    }
}
