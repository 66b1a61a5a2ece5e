//! Request decoding, in two phases.
//!
//! Phase one (`decode_basic_inputs`) decodes every basic input except the
//! body, left to right, and stops at the first failure. It never touches
//! the body, so a server can try endpoint after endpoint against the same
//! request. If phase one succeeds and the endpoint has a body input, the
//! result is `BasicInputs::BodyPending`; phase two (`BasicInputs::finish`)
//! reads the body in the representation the body codec wants, decodes it
//! and splices it back in at its leaf position.

use std::io;

use crate::body::BodyKind;
use crate::error::{DecodeError, DecodeFailure, FailingInput, InputKind, StructuralError};
use crate::http::header_values;
use crate::node::{BasicInput, BodyLeaf, InputNode, LeafPath};
use crate::params::Params;
use crate::server::{RequestBody, ServerRequest};

/// A decoded basic input, tagged with the leaf it came from.
#[derive(Debug)]
pub struct DecodedValue {
    pub path: LeafPath,
    pub value: Params,
}

/// The outcome of phase one.
#[derive(Debug)]
pub enum BasicInputs {
    /// All inputs decoded; there is no body input.
    Ready(Vec<DecodedValue>),
    /// All inputs but the body decoded.
    BodyPending(PendingBody),
    Failed(DecodeFailure),
}

pub struct PendingBody {
    /// Index in `values` the body value goes to.
    position: usize,
    path: LeafPath,
    leaf: BodyLeaf,
    values: Vec<DecodedValue>,
}

impl std::fmt::Debug for PendingBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingBody")
            .field("position", &self.position)
            .field("path", &self.path)
            .field("kind", &self.leaf.kind)
            .field("values", &self.values)
            .finish()
    }
}

impl PendingBody {
    pub fn kind(&self) -> BodyKind {
        self.leaf.kind
    }

    pub async fn read<B>(self, body: &mut B) -> io::Result<Result<Vec<DecodedValue>, DecodeFailure>>
    where
        B: RequestBody + ?Sized,
    {
        let PendingBody {
            position,
            path,
            leaf,
            mut values,
        } = self;
        tracing::trace!(kind = %leaf.kind, "reading request body");
        let raw = body.read_raw(leaf.kind).await?;
        match leaf.codec.decode_params(raw) {
            Ok(value) => {
                values.insert(position, DecodedValue { path, value });
                Ok(Ok(values))
            }
            Err(error) => {
                let input = BasicInput::Body(leaf).failing(&path);
                Ok(Err(DecodeFailure { input, error }))
            }
        }
    }
}

impl BasicInputs {
    /// Phase two. Only an I/O error while reading the body is an `Err`.
    pub async fn finish<B>(self, body: &mut B) -> io::Result<Result<Vec<DecodedValue>, DecodeFailure>>
    where
        B: RequestBody + ?Sized,
    {
        match self {
            BasicInputs::Ready(values) => Ok(Ok(values)),
            BasicInputs::Failed(failure) => Ok(Err(failure)),
            BasicInputs::BodyPending(pending) => pending.read(body).await,
        }
    }
}

struct PhaseOne<'r, R: ?Sized> {
    request: &'r R,
    cursor: usize,
    values: Vec<DecodedValue>,
    body: Option<(usize, LeafPath, BodyLeaf)>,
}

impl<'r, R: ServerRequest + ?Sized> PhaseOne<'r, R> {
    fn visit(&mut self, node: &InputNode, path: &LeafPath) -> Result<(), DecodeFailure> {
        match node {
            InputNode::Basic(basic) => self.leaf(basic, path),
            InputNode::Pair(pair) => {
                self.visit(&pair.left, &path.left())?;
                self.visit(&pair.right, &path.right())
            }
            InputNode::Mapped(mapped) => self.visit(&mapped.wrapped, &path.mapped()),
        }
    }

    fn next_segment(&mut self) -> Option<&'r String> {
        let request: &'r R = self.request;
        let segment = request.path_segments().get(self.cursor)?;
        self.cursor += 1;
        Some(segment)
    }

    fn leaf(&mut self, basic: &BasicInput, path: &LeafPath) -> Result<(), DecodeFailure> {
        let fail = |error: DecodeError| DecodeFailure {
            input: basic.failing(path),
            error,
        };
        let request = self.request;
        let value = match basic {
            BasicInput::Method(expected) => {
                let actual = request.method();
                if actual != expected {
                    return Err(fail(DecodeError::mismatch(expected.as_str(), actual.as_str())));
                }
                Params::unit()
            }
            BasicInput::FixedPath(expected) => match self.next_segment() {
                Some(actual) if actual == expected => Params::unit(),
                Some(actual) => return Err(fail(DecodeError::mismatch(expected.as_str(), actual.as_str()))),
                None => return Err(fail(DecodeError::Missing)),
            },
            BasicInput::PathCapture { codec, .. } => match self.next_segment() {
                Some(segment) => codec.decode_params(segment.clone()).map_err(fail)?,
                None => return Err(fail(DecodeError::Missing)),
            },
            BasicInput::PathsCapture { codec } => {
                let segments = request.path_segments();
                let rest = segments[self.cursor.min(segments.len())..].to_vec();
                self.cursor = segments.len();
                codec.decode_params(rest).map_err(fail)?
            }
            BasicInput::Query { name, codec } => codec.decode_params(request.query().get_all(name)).map_err(fail)?,
            BasicInput::QueryParams { codec } => codec.decode_params(request.query().clone()).map_err(fail)?,
            BasicInput::Header { name, codec } => {
                codec.decode_params(header_values(request.headers(), name)).map_err(fail)?
            }
            BasicInput::FixedHeader { name, value } => {
                let values = header_values(request.headers(), name);
                if values.is_empty() {
                    return Err(fail(DecodeError::Missing));
                }
                if !values.iter().any(|v| v == value) {
                    return Err(fail(DecodeError::mismatch(value.as_str(), values.join(", "))));
                }
                Params::unit()
            }
            BasicInput::Headers { codec } => codec.decode_params(request.headers().to_vec()).map_err(fail)?,
            BasicInput::Cookie { name, codec } => codec.decode_params(request.cookies(name)).map_err(fail)?,
            BasicInput::Body(leaf) => {
                debug_assert!(self.body.is_none(), "body inputs are counted before decoding");
                self.body = Some((self.values.len(), path.clone(), leaf.clone()));
                return Ok(());
            }
            BasicInput::Empty => Params::unit(),
        };
        self.values.push(DecodedValue {
            path: path.clone(),
            value,
        });
        Ok(())
    }
}

/// Phase one: decodes every basic input but the body.
///
/// Returns `Err` only when the tree itself cannot be decoded, i.e. it has
/// more than one body input.
pub fn decode_basic_inputs<R>(node: &InputNode, request: &R) -> Result<BasicInputs, StructuralError>
where
    R: ServerRequest + ?Sized,
{
    if node.body_count() > 1 {
        return Err(StructuralError::DuplicateBody("input"));
    }
    let mut phase = PhaseOne {
        request,
        cursor: 0,
        values: Vec::new(),
        body: None,
    };
    if let Err(failure) = phase.visit(node, &LeafPath::root()) {
        return Ok(BasicInputs::Failed(failure));
    }

    let segments = request.path_segments();
    if phase.cursor < segments.len() {
        let extra = &segments[phase.cursor..];
        let shown = format!("/{}", extra.join("/"));
        return Ok(BasicInputs::Failed(DecodeFailure {
            input: FailingInput {
                kind: InputKind::ExtraPathSegments,
                path: LeafPath::root(),
                description: shown.clone(),
            },
            error: DecodeError::mismatch("end of path", shown),
        }));
    }

    Ok(match phase.body {
        None => BasicInputs::Ready(phase.values),
        Some((position, path, leaf)) => BasicInputs::BodyPending(PendingBody {
            position,
            path,
            leaf,
            values: phase.values,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::http::HttpMethod;
    use crate::input::{self, Input};
    use crate::server::RequestParts;
    use crate::tuple::Tuple;

    fn decode<T: Tuple>(input: &Input<T>, request: &RequestParts) -> BasicInputs {
        decode_basic_inputs(input.node(), request).unwrap()
    }

    fn values(inputs: BasicInputs) -> Vec<DecodedValue> {
        match inputs {
            BasicInputs::Ready(values) => values,
            other => panic!("expected ready inputs, got {other:?}"),
        }
    }

    fn failure(inputs: BasicInputs) -> DecodeFailure {
        match inputs {
            BasicInputs::Failed(failure) => failure,
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[test]
    fn values_follow_leaf_order() {
        let input = input::method(HttpMethod::Get)
            .and(input::fixed_path("items"))
            .and(input::path::<u32>("id"))
            .and(input::query::<String>("q"));
        let request = RequestParts::from_target(HttpMethod::Get, "/items/7?q=x");
        let decoded = values(decode(&input, &request));
        let paths: Vec<LeafPath> = decoded.iter().map(|v| v.path.clone()).collect();
        assert_eq!(paths, input.node().leaf_paths());
        assert_eq!(decoded[2].value.downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn first_failure_wins() {
        let input = input::fixed_path("items")
            .and(input::query::<String>("q1"))
            .and(input::query::<i32>("q2"));
        let request = RequestParts::from_target(HttpMethod::Get, "/items?q2=x");
        let failure = failure(decode(&input, &request));
        assert_eq!(failure.input.description, "?q1");
        assert_eq!(failure.error, DecodeError::Missing);
    }

    #[test]
    fn extra_segments_fail_as_path_shape() {
        let input = input::fixed_path("items");
        let request = RequestParts::from_target(HttpMethod::Get, "/items/7/edit");
        let failure = failure(decode(&input, &request));
        assert_eq!(failure.input.kind, InputKind::ExtraPathSegments);
        assert!(failure.input.kind.is_path_shape());
        assert_eq!(failure.input.description, "/7/edit");
    }

    #[test]
    fn paths_capture_takes_the_rest() {
        let input = input::fixed_path("files").and(input::paths());
        let request = RequestParts::from_target(HttpMethod::Get, "/files/a/b/c");
        let decoded = values(decode(&input, &request));
        assert_eq!(
            decoded[1].value.downcast_ref::<Vec<String>>(),
            Some(&vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn fixed_header_must_match() {
        let input = input::fixed_header("accept", "application/json");
        let request = RequestParts::new(HttpMethod::Get).with_header("Accept", "text/html");
        let failure = failure(decode(&input, &request));
        assert!(matches!(failure.error, DecodeError::Mismatch { .. }));
    }

    #[test]
    fn two_bodies_are_a_structural_error() {
        let input = input::body_text().and(input::body_bytes());
        let request = RequestParts::new(HttpMethod::Post);
        let result = decode_basic_inputs(input.node(), &request);
        assert_eq!(result.unwrap_err(), StructuralError::DuplicateBody("input"));
    }

    #[tokio::test]
    async fn body_is_spliced_at_its_position() {
        let input = input::query::<String>("a")
            .and(input::body_text())
            .and(input::query::<String>("b"));
        let request = RequestParts::from_target(HttpMethod::Post, "/?a=1&b=2");
        let pending = decode(&input, &request);
        assert!(matches!(pending, BasicInputs::BodyPending(_)));
        let mut body = Bytes::from_static(b"hello");
        let decoded = pending.finish(&mut body).await.unwrap().unwrap();
        let paths: Vec<LeafPath> = decoded.iter().map(|v| v.path.clone()).collect();
        assert_eq!(paths, input.node().leaf_paths());
        assert_eq!(decoded[1].value.downcast_ref::<String>().map(String::as_str), Some("hello"));
    }

    #[tokio::test]
    async fn body_is_not_read_after_a_failure() {
        let input = input::query::<i32>("n").and(input::body_text());
        let request = RequestParts::from_target(HttpMethod::Post, "/?n=x");
        let mut body = Bytes::from_static(b"untouched");
        let result = decode(&input, &request).finish(&mut body).await.unwrap();
        assert!(result.is_err());
        assert_eq!(body, Bytes::from_static(b"untouched"));
    }
}
