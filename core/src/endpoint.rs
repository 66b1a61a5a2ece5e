//! Endpoint descriptions.
//!
//! An `Endpoint<I, E, O>` is a value: the input tree decoding to `I`, the
//! error output encoding `E` and the output encoding `O`, plus metadata.
//! Building one performs no I/O. The same description is interpreted by
//! the server (`ServerInterpreter`) and by the client (`EndpointClient`).

use std::fmt;
use std::marker::PhantomData;

use crate::http::HttpMethod;
use crate::input::Input;
use crate::node::{BasicInput, BasicOutput, InputNode, OutputNode, Pair};
use crate::output::Output;
use crate::tuple::{Concat, Tuple, Void};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointInfo {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
}

pub struct Endpoint<I, E, O> {
    input: InputNode,
    error_output: OutputNode,
    output: OutputNode,
    info: EndpointInfo,
    _types: PhantomData<fn() -> (I, E, O)>,
}

impl<I, E, O> Clone for Endpoint<I, E, O> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            error_output: self.error_output.clone(),
            output: self.output.clone(),
            info: self.info.clone(),
            _types: PhantomData,
        }
    }
}

/// An endpoint with no inputs, no outputs and no error output.
pub fn endpoint() -> Endpoint<(), Void, ()> {
    Endpoint {
        input: InputNode::Basic(BasicInput::Empty),
        error_output: OutputNode::Void,
        output: OutputNode::Basic(BasicOutput::Empty),
        info: EndpointInfo::default(),
        _types: PhantomData,
    }
}

fn is_empty_input(node: &InputNode) -> bool {
    matches!(node, InputNode::Basic(BasicInput::Empty))
}

fn is_empty_output(node: &OutputNode) -> bool {
    matches!(node, OutputNode::Basic(BasicOutput::Empty))
}

impl<I, E, O> Endpoint<I, E, O> {
    pub fn info(&self) -> &EndpointInfo {
        &self.info
    }

    pub fn input_node(&self) -> &InputNode {
        &self.input
    }

    pub fn output_node(&self) -> &OutputNode {
        &self.output
    }

    pub fn error_output_node(&self) -> &OutputNode {
        &self.error_output
    }
}

impl<I: Tuple, E: Tuple, O: Tuple> Endpoint<I, E, O> {
    /// Requires `method`. The method leaf goes first, wherever this is
    /// called in the chain.
    pub fn method(mut self, method: HttpMethod) -> Self {
        let leaf = InputNode::Basic(BasicInput::Method(method));
        let rest = std::mem::replace(&mut self.input, InputNode::Basic(BasicInput::Empty));
        self.input = if is_empty_input(&rest) {
            leaf
        } else {
            InputNode::Pair(Pair::concat(leaf, rest, 0))
        };
        self
    }

    pub fn get(self) -> Self {
        self.method(HttpMethod::Get)
    }

    pub fn post(self) -> Self {
        self.method(HttpMethod::Post)
    }

    pub fn put(self) -> Self {
        self.method(HttpMethod::Put)
    }

    pub fn patch(self) -> Self {
        self.method(HttpMethod::Patch)
    }

    pub fn delete(self) -> Self {
        self.method(HttpMethod::Delete)
    }

    /// Appends `input`; its values follow the existing ones.
    pub fn input<J: Tuple>(self, input: Input<J>) -> Endpoint<I::Out, E, O>
    where
        I: Concat<J>,
    {
        let Endpoint {
            input: current,
            error_output,
            output,
            info,
            ..
        } = self;
        let input = if is_empty_input(&current) {
            input.into_node()
        } else {
            InputNode::Pair(Pair::concat(current, input.into_node(), I::ARITY))
        };
        Endpoint {
            input,
            error_output,
            output,
            info,
            _types: PhantomData,
        }
    }

    /// Appends `output`; its values follow the existing ones.
    pub fn output<P: Tuple>(self, output: Output<P>) -> Endpoint<I, E, O::Out>
    where
        O: Concat<P>,
    {
        let Endpoint {
            input,
            error_output,
            output: current,
            info,
            ..
        } = self;
        let output = if is_empty_output(&current) {
            output.into_node()
        } else {
            OutputNode::Pair(Pair::concat(current, output.into_node(), O::ARITY))
        };
        Endpoint {
            input,
            error_output,
            output,
            info,
            _types: PhantomData,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.info.name = Some(name.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.info.summary = Some(summary.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.info.tags.push(tag.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.info.deprecated = true;
        self
    }

    /// One-line rendering, e.g. `get-item: GET /items /{id} -> {body as application/json} | void`.
    pub fn show(&self) -> String {
        let prefix = match &self.info.name {
            Some(name) => format!("{name}: "),
            None => String::new(),
        };
        let input = match self.input.show() {
            shown if shown.is_empty() => "-".to_string(),
            shown => shown,
        };
        format!(
            "{prefix}{input} -> {} | {}",
            self.output.show(),
            self.error_output.show()
        )
    }
}

impl<I: Tuple, O: Tuple> Endpoint<I, Void, O> {
    /// Sets the error output. Only available while there is none.
    pub fn error_output<E: Tuple>(self, error_output: Output<E>) -> Endpoint<I, E, O> {
        Endpoint {
            input: self.input,
            error_output: error_output.into_node(),
            output: self.output,
            info: self.info,
            _types: PhantomData,
        }
    }
}

impl<I: Tuple, E: Tuple, O: Tuple> fmt::Debug for Endpoint<I, E, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Endpoint").field(&self.show()).finish()
    }
}
