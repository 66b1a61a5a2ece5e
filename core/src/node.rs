//! The untyped node tree behind every endpoint input and output.
//!
//! # Design
//! Nodes are plain enums. Composite nodes own the closures that move values
//! between a node and its children: `Pair` has `combine`/`split`, `Mapped`
//! has a partial `decode` and a total `encode`, `OneOf` variants have a
//! predicate. Codecs and closures sit behind `Arc`, so cloning a tree is
//! cheap and the tree is `Send + Sync`.
//!
//! Basic leaves are addressed by a `LeafPath`: the left/right/mapped/variant
//! steps from the root. Every traversal in the engine walks leaves in the
//! same order (left before right), and the decoder tags each decoded value
//! with its leaf path so the reconstructor can check it.

use std::fmt;
use std::sync::Arc;

use crate::body::{BodyKind, RawBody};
use crate::codec::ErasedCodec;
use crate::error::{DecodeResult, FailingInput, InputKind};
use crate::http::{Header, HttpMethod, QueryParams};
use crate::params::Params;

pub type CombineFn = Arc<dyn Fn(Params, Params) -> Params + Send + Sync>;
pub type SplitFn = Arc<dyn Fn(Params) -> (Params, Params) + Send + Sync>;
pub type MapDecodeFn = Arc<dyn Fn(Params) -> DecodeResult<Params> + Send + Sync>;
pub type MapEncodeFn = Arc<dyn Fn(Params) -> Params + Send + Sync>;
pub type PredicateFn = Arc<dyn Fn(&Params) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// Leaf paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Left,
    Right,
    Mapped,
    Variant(usize),
}

/// Structural address of a node, from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LeafPath(Vec<Step>);

impl LeafPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    fn with(&self, step: Step) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn left(&self) -> Self {
        self.with(Step::Left)
    }

    pub fn right(&self) -> Self {
        self.with(Step::Right)
    }

    pub fn mapped(&self) -> Self {
        self.with(Step::Mapped)
    }

    pub fn variant(&self, index: usize) -> Self {
        self.with(Step::Variant(index))
    }
}

impl fmt::Display for LeafPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match step {
                Step::Left => f.write_str("L")?,
                Step::Right => f.write_str("R")?,
                Step::Mapped => f.write_str("M")?,
                Step::Variant(n) => write!(f, "V{n}")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Composites
// ---------------------------------------------------------------------------

pub struct Pair<N> {
    pub left: Box<N>,
    pub right: Box<N>,
    pub combine: CombineFn,
    pub split: SplitFn,
}

impl<N> Pair<N> {
    /// A pair whose value is the left tuple followed by the right tuple.
    pub fn concat(left: N, right: N, left_arity: usize) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
            combine: Arc::new(Params::concat),
            split: Arc::new(move |params: Params| params.split_at(left_arity)),
        }
    }
}

impl<N: Clone> Clone for Pair<N> {
    fn clone(&self) -> Self {
        Self {
            left: self.left.clone(),
            right: self.right.clone(),
            combine: Arc::clone(&self.combine),
            split: Arc::clone(&self.split),
        }
    }
}

pub struct Mapped<N> {
    pub wrapped: Box<N>,
    pub decode: MapDecodeFn,
    pub encode: MapEncodeFn,
}

impl<N: Clone> Clone for Mapped<N> {
    fn clone(&self) -> Self {
        Self {
            wrapped: self.wrapped.clone(),
            decode: Arc::clone(&self.decode),
            encode: Arc::clone(&self.encode),
        }
    }
}

#[derive(Clone)]
pub struct BodyLeaf {
    pub kind: BodyKind,
    pub codec: Arc<dyn ErasedCodec<RawBody>>,
}

impl BodyLeaf {
    fn describe(&self) -> String {
        format!("{{body as {}}}", self.codec.format().media_type())
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum BasicInput {
    Method(HttpMethod),
    FixedPath(String),
    PathCapture {
        name: String,
        codec: Arc<dyn ErasedCodec<String>>,
    },
    PathsCapture {
        codec: Arc<dyn ErasedCodec<Vec<String>>>,
    },
    Query {
        name: String,
        codec: Arc<dyn ErasedCodec<Vec<String>>>,
    },
    QueryParams {
        codec: Arc<dyn ErasedCodec<QueryParams>>,
    },
    Header {
        name: String,
        codec: Arc<dyn ErasedCodec<Vec<String>>>,
    },
    FixedHeader {
        name: String,
        value: String,
    },
    Headers {
        codec: Arc<dyn ErasedCodec<Vec<Header>>>,
    },
    Cookie {
        name: String,
        codec: Arc<dyn ErasedCodec<Vec<String>>>,
    },
    Body(BodyLeaf),
    Empty,
}

impl BasicInput {
    pub fn kind(&self) -> InputKind {
        match self {
            BasicInput::Method(_) => InputKind::Method,
            BasicInput::FixedPath(_) => InputKind::FixedPath,
            BasicInput::PathCapture { .. } => InputKind::PathCapture,
            BasicInput::PathsCapture { .. } => InputKind::PathsCapture,
            BasicInput::Query { .. } => InputKind::Query,
            BasicInput::QueryParams { .. } => InputKind::QueryParams,
            BasicInput::Header { .. } => InputKind::Header,
            BasicInput::FixedHeader { .. } => InputKind::FixedHeader,
            BasicInput::Headers { .. } => InputKind::Headers,
            BasicInput::Cookie { .. } => InputKind::Cookie,
            BasicInput::Body(_) => InputKind::Body,
            BasicInput::Empty => InputKind::Empty,
        }
    }

    pub fn describe(&self) -> String {
        let optional = |optional: bool, name: &str| {
            if optional {
                format!("[{name}]")
            } else {
                name.to_string()
            }
        };
        match self {
            BasicInput::Method(method) => method.to_string(),
            BasicInput::FixedPath(segment) => format!("/{segment}"),
            BasicInput::PathCapture { name, .. } => format!("/{{{name}}}"),
            BasicInput::PathsCapture { .. } => "/*".to_string(),
            BasicInput::Query { name, codec } => {
                format!("?{}", optional(codec.schema().optional, name))
            }
            BasicInput::QueryParams { .. } => "?*".to_string(),
            BasicInput::Header { name, codec } => {
                format!("{{header {}}}", optional(codec.schema().optional, name))
            }
            BasicInput::FixedHeader { name, value } => format!("{{header {name}: {value}}}"),
            BasicInput::Headers { .. } => "{headers}".to_string(),
            BasicInput::Cookie { name, codec } => {
                format!("{{cookie {}}}", optional(codec.schema().optional, name))
            }
            BasicInput::Body(body) => body.describe(),
            BasicInput::Empty => "-".to_string(),
        }
    }

    pub fn failing(&self, path: &LeafPath) -> FailingInput {
        FailingInput {
            kind: self.kind(),
            path: path.clone(),
            description: self.describe(),
        }
    }
}

#[derive(Clone)]
pub enum InputNode {
    Basic(BasicInput),
    Pair(Pair<InputNode>),
    Mapped(Mapped<InputNode>),
}

impl InputNode {
    /// Folds over basic leaves, left to right, with their leaf paths.
    pub fn reduce<A, F>(&self, init: A, f: &mut F) -> A
    where
        F: FnMut(A, &BasicInput, &LeafPath) -> A,
    {
        self.reduce_at(&LeafPath::root(), init, f)
    }

    fn reduce_at<A, F>(&self, path: &LeafPath, acc: A, f: &mut F) -> A
    where
        F: FnMut(A, &BasicInput, &LeafPath) -> A,
    {
        match self {
            InputNode::Basic(basic) => f(acc, basic, path),
            InputNode::Pair(pair) => {
                let acc = pair.left.reduce_at(&path.left(), acc, f);
                pair.right.reduce_at(&path.right(), acc, f)
            }
            InputNode::Mapped(mapped) => mapped.wrapped.reduce_at(&path.mapped(), acc, f),
        }
    }

    pub fn leaf_paths(&self) -> Vec<LeafPath> {
        self.reduce(Vec::new(), &mut |mut acc, _, path| {
            acc.push(path.clone());
            acc
        })
    }

    pub fn body_count(&self) -> usize {
        self.reduce(0, &mut |n, basic, _| match basic {
            BasicInput::Body(_) => n + 1,
            _ => n,
        })
    }

    pub fn method(&self) -> Option<HttpMethod> {
        self.reduce(None, &mut |found, basic, _| match (found, basic) {
            (None, BasicInput::Method(method)) => Some(method.clone()),
            (found, _) => found,
        })
    }

    /// Renders the leaves, e.g. `GET /items /{id} ?q`.
    pub fn show(&self) -> String {
        let parts = self.reduce(Vec::new(), &mut |mut acc, basic, _| {
            if !matches!(basic, BasicInput::Empty) {
                acc.push(basic.describe());
            }
            acc
        });
        parts.join(" ")
    }
}

impl fmt::Debug for InputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InputNode").field(&self.show()).finish()
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum BasicOutput {
    Body(BodyLeaf),
    Header {
        name: String,
        codec: Arc<dyn ErasedCodec<Vec<String>>>,
    },
    FixedHeader {
        name: String,
        value: String,
    },
    Headers {
        codec: Arc<dyn ErasedCodec<Vec<Header>>>,
    },
    StatusCode {
        codec: Arc<dyn ErasedCodec<u16>>,
    },
    FixedStatusCode(u16),
    Empty,
}

impl BasicOutput {
    pub fn describe(&self) -> String {
        match self {
            BasicOutput::Body(body) => body.describe(),
            BasicOutput::Header { name, .. } => format!("{{header {name}}}"),
            BasicOutput::FixedHeader { name, value } => format!("{{header {name}: {value}}}"),
            BasicOutput::Headers { .. } => "{headers}".to_string(),
            BasicOutput::StatusCode { .. } => "{status}".to_string(),
            BasicOutput::FixedStatusCode(code) => format!("{{status {code}}}"),
            BasicOutput::Empty => "-".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct OneOfVariant {
    pub status: Option<u16>,
    pub output: OutputNode,
    pub applies: PredicateFn,
}

/// Output chosen by value: the first variant whose predicate accepts wins.
#[derive(Clone)]
pub struct OneOf {
    pub variants: Vec<OneOfVariant>,
}

#[derive(Clone)]
pub enum OutputNode {
    Basic(BasicOutput),
    Pair(Pair<OutputNode>),
    Mapped(Mapped<OutputNode>),
    OneOf(OneOf),
    /// Uninhabited; only valid as an error output.
    Void,
}

/// A leaf as seen by `OutputNode::reduce`.
#[derive(Clone, Copy)]
pub enum OutputLeaf<'a> {
    Basic(&'a BasicOutput),
    Void,
}

impl OutputNode {
    pub fn reduce<A, F>(&self, init: A, f: &mut F) -> A
    where
        F: FnMut(A, OutputLeaf<'_>, &LeafPath) -> A,
    {
        self.reduce_at(&LeafPath::root(), init, f)
    }

    fn reduce_at<A, F>(&self, path: &LeafPath, acc: A, f: &mut F) -> A
    where
        F: FnMut(A, OutputLeaf<'_>, &LeafPath) -> A,
    {
        match self {
            OutputNode::Basic(basic) => f(acc, OutputLeaf::Basic(basic), path),
            OutputNode::Void => f(acc, OutputLeaf::Void, path),
            OutputNode::Pair(pair) => {
                let acc = pair.left.reduce_at(&path.left(), acc, f);
                pair.right.reduce_at(&path.right(), acc, f)
            }
            OutputNode::Mapped(mapped) => mapped.wrapped.reduce_at(&path.mapped(), acc, f),
            OutputNode::OneOf(one_of) => {
                let mut acc = acc;
                for (i, variant) in one_of.variants.iter().enumerate() {
                    acc = variant.output.reduce_at(&path.variant(i), acc, f);
                }
                acc
            }
        }
    }

    pub fn leaf_paths(&self) -> Vec<LeafPath> {
        self.reduce(Vec::new(), &mut |mut acc, _, path| {
            acc.push(path.clone());
            acc
        })
    }

    pub fn show(&self) -> String {
        let parts = self.reduce(Vec::new(), &mut |mut acc, leaf, _| {
            match leaf {
                OutputLeaf::Basic(BasicOutput::Empty) => {}
                OutputLeaf::Basic(basic) => acc.push(basic.describe()),
                OutputLeaf::Void => acc.push("void".to_string()),
            }
            acc
        });
        if parts.is_empty() {
            "-".to_string()
        } else {
            parts.join(" ")
        }
    }
}

impl fmt::Debug for OutputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OutputNode").field(&self.show()).finish()
    }
}
