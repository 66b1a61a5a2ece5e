//! Error types for the engine.
//!
//! # Design
//! Three families, kept apart by how they are handled:
//!
//! - `DecodeError` is recoverable. Wrapped with the failing input in a
//!   `DecodeFailure` it flows to the interceptor chain (server); wrapped
//!   with the failing output in a `ResponseDecodeFailure` it goes back to
//!   the caller (client).
//! - `StructuralError` means an endpoint description and the value driving
//!   it disagree (two bodies, encoding `Void`, no `OneOf` variant). It is
//!   propagated out of the call and never retried.
//! - `ClientError` / `InterpretError` are the outer envelopes returned by
//!   the client and the server interpreter.

use std::fmt;

use crate::node::LeafPath;

/// Result of any decode step. `?` short-circuits on the first failure.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Why a raw value could not be turned into a typed one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// No value was present where exactly one was required.
    #[error("missing value")]
    Missing,

    /// Several values were present where at most one was allowed.
    #[error("expected a single value, got {}", .0.len())]
    Multiple(Vec<String>),

    /// The raw value did not match a fixed literal (method, path segment,
    /// header value) or the shape the decoder expected.
    #[error("expected `{expected}`, got `{actual}`")]
    Mismatch { expected: String, actual: String },

    /// The raw value could not be parsed into the target type.
    #[error("cannot parse `{original}`: {reason}")]
    Malformed { original: String, reason: String },

    /// The value parsed but violates a constraint.
    #[error("invalid value: {0}")]
    Invalid(String),
}

impl DecodeError {
    pub fn malformed(original: impl Into<String>, reason: impl fmt::Display) -> Self {
        DecodeError::Malformed {
            original: original.into(),
            reason: reason.to_string(),
        }
    }

    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        DecodeError::Mismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// The kind of input node a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Method,
    FixedPath,
    PathCapture,
    PathsCapture,
    Query,
    QueryParams,
    Header,
    FixedHeader,
    Headers,
    Cookie,
    Body,
    Empty,
    /// A `Mapped` node whose mapping rejected the combined value.
    Mapped,
    /// The request had more path segments than the endpoint consumes.
    ExtraPathSegments,
}

impl InputKind {
    /// Whether a failure here means "this request is for another endpoint"
    /// rather than "this request is malformed".
    pub fn is_path_shape(self) -> bool {
        matches!(
            self,
            InputKind::Method
                | InputKind::FixedPath
                | InputKind::PathCapture
                | InputKind::PathsCapture
                | InputKind::ExtraPathSegments
        )
    }
}

/// The input node a decode failure is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailingInput {
    pub kind: InputKind,
    pub path: LeafPath,
    /// Human-readable rendering, e.g. `?q2` or `{header X-Count}`.
    pub description: String,
}

impl fmt::Display for FailingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// A recoverable failure while decoding a request or a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{input}: {error}")]
pub struct DecodeFailure {
    pub input: FailingInput,
    #[source]
    pub error: DecodeError,
}

/// The output node a response decode failure is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailingOutput {
    pub path: LeafPath,
    /// Human-readable rendering, e.g. `{header x-total-count}`.
    pub description: String,
}

impl fmt::Display for FailingOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// A response that does not decode with the output selected for it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{output}: {error}")]
pub struct ResponseDecodeFailure {
    pub output: FailingOutput,
    #[source]
    pub error: DecodeError,
}

/// An endpoint description that cannot be interpreted for the given value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("more than one body in a single {0} tree")]
    DuplicateBody(&'static str),

    #[error("a void output was reached while encoding")]
    VoidOutput,

    #[error("no one-of variant accepts the value being encoded")]
    NoMatchingVariant,
}

/// Errors returned by `EndpointClient`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("transport failed: {0}")]
    Transport(#[from] std::io::Error),

    #[error("cannot decode response: {0}")]
    Decode(#[from] ResponseDecodeFailure),
}

/// Errors returned by `ServerInterpreter::handle`.
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("reading request body failed: {0}")]
    BodyRead(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_names_the_input() {
        let failure = DecodeFailure {
            input: FailingInput {
                kind: InputKind::Query,
                path: LeafPath::root().right(),
                description: "?q2".to_string(),
            },
            error: DecodeError::malformed("xyz", "invalid digit found in string"),
        };
        assert_eq!(
            failure.to_string(),
            "?q2: cannot parse `xyz`: invalid digit found in string"
        );
    }

    #[test]
    fn response_failure_display_names_the_output() {
        let failure = ResponseDecodeFailure {
            output: FailingOutput {
                path: LeafPath::root().left(),
                description: "{header x-total-count}".to_string(),
            },
            error: DecodeError::Missing,
        };
        assert_eq!(
            ClientError::from(failure).to_string(),
            "cannot decode response: {header x-total-count}: missing value"
        );
    }

    #[test]
    fn path_shape_kinds() {
        assert!(InputKind::FixedPath.is_path_shape());
        assert!(InputKind::ExtraPathSegments.is_path_shape());
        assert!(!InputKind::Query.is_path_shape());
        assert!(!InputKind::Body.is_path_shape());
    }
}
