//! Typed response outputs.
//!
//! `Output<T>` mirrors `Input<T>` for responses: leaves for the body,
//! headers and status code, composed with `and` and `map`. `one_of` picks
//! one of several outputs by looking at the value being sent, which is how
//! error enums with a status code per variant are described.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::body::{BodyRaw, ByteStream};
use crate::codec::{self, body_kind, Codec, Erased, ErasedBody, Mapping, Optional, PlainValue, Required};
use crate::error::DecodeResult;
use crate::http::Header;
use crate::node::{BasicOutput, BodyLeaf, Mapped, OneOf, OneOfVariant, OutputNode, Pair};
use crate::params::Params;
use crate::tuple::{Concat, Tuple, Void};

pub struct Output<T> {
    node: OutputNode,
    _shape: PhantomData<fn() -> T>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _shape: PhantomData,
        }
    }
}

impl<T: Tuple> Output<T> {
    pub(crate) fn from_node(node: OutputNode) -> Self {
        Self {
            node,
            _shape: PhantomData,
        }
    }

    fn basic(basic: BasicOutput) -> Self {
        Self::from_node(OutputNode::Basic(basic))
    }

    pub fn node(&self) -> &OutputNode {
        &self.node
    }

    pub fn into_node(self) -> OutputNode {
        self.node
    }

    pub fn and<U: Tuple>(self, other: Output<U>) -> Output<T::Out>
    where
        T: Concat<U>,
    {
        Output::from_node(OutputNode::Pair(Pair::concat(self.node, other.node, T::ARITY)))
    }

    pub fn map<B, F, G>(self, f: F, g: G) -> Output<(B,)>
    where
        B: Any + Send,
        F: Fn(T) -> B + Send + Sync + 'static,
        G: Fn(B) -> T + Send + Sync + 'static,
    {
        self.map_with(Mapping::from_fn(f, g))
    }

    pub fn map_decode<B, F, G>(self, f: F, g: G) -> Output<(B,)>
    where
        B: Any + Send,
        F: Fn(T) -> DecodeResult<B> + Send + Sync + 'static,
        G: Fn(B) -> T + Send + Sync + 'static,
    {
        self.map_with(Mapping::from_decode(f, g))
    }

    pub fn map_with<B: Any + Send>(self, mapping: Mapping<T, B>) -> Output<(B,)> {
        let encoder = mapping.clone();
        Output::from_node(OutputNode::Mapped(Mapped {
            wrapped: Box::new(self.node),
            decode: Arc::new(move |params: Params| {
                mapping.decode(T::from_params(params)).map(Params::single)
            }),
            encode: Arc::new(move |params: Params| {
                encoder.encode(params.downcast::<B>()).into_params()
            }),
        }))
    }

    pub fn show(&self) -> String {
        self.node.show()
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

pub fn body_with<C>(codec: C) -> Output<(C::Value,)>
where
    C: Codec,
    C::Raw: BodyRaw,
{
    Output::basic(BasicOutput::Body(BodyLeaf {
        kind: body_kind::<C>(),
        codec: Arc::new(ErasedBody(codec)),
    }))
}

pub fn body_text() -> Output<(String,)> {
    body_with(codec::TextCodec)
}

pub fn body_bytes() -> Output<(Bytes,)> {
    body_with(codec::BytesCodec)
}

pub fn body_stream() -> Output<(ByteStream,)> {
    body_with(codec::StreamCodec)
}

pub fn body_json<T: Serialize + DeserializeOwned + Send + 'static>() -> Output<(T,)> {
    body_with(codec::json::<T>())
}

// ---------------------------------------------------------------------------
// Headers and status
// ---------------------------------------------------------------------------

pub fn header<T: PlainValue>(name: impl Into<String>) -> Output<(T,)> {
    header_with(name, Required(codec::plain::<T>()))
}

pub fn header_opt<T: PlainValue>(name: impl Into<String>) -> Output<(Option<T>,)> {
    header_with(name, Optional(codec::plain::<T>()))
}

pub fn header_with<C: Codec<Raw = Vec<String>>>(name: impl Into<String>, codec: C) -> Output<(C::Value,)> {
    Output::basic(BasicOutput::Header {
        name: name.into(),
        codec: Arc::new(Erased(codec)),
    })
}

pub fn fixed_header(name: impl Into<String>, value: impl Into<String>) -> Output<()> {
    Output::basic(BasicOutput::FixedHeader {
        name: name.into(),
        value: value.into(),
    })
}

pub fn headers() -> Output<(Vec<Header>,)> {
    Output::basic(BasicOutput::Headers {
        codec: Arc::new(Erased(codec::identity::<Vec<Header>>())),
    })
}

/// The status code, chosen by the server logic.
pub fn status_code() -> Output<(u16,)> {
    Output::basic(BasicOutput::StatusCode {
        codec: Arc::new(Erased(codec::identity::<u16>())),
    })
}

pub fn fixed_status(code: u16) -> Output<()> {
    Output::basic(BasicOutput::FixedStatusCode(code))
}

pub fn empty() -> Output<()> {
    Output::basic(BasicOutput::Empty)
}

/// The output of something that cannot happen, e.g. the errors of an
/// endpoint without an error output.
pub fn void() -> Output<Void> {
    Output::from_node(OutputNode::Void)
}

// ---------------------------------------------------------------------------
// One-of
// ---------------------------------------------------------------------------

pub fn one_of<T: Any + Send>() -> OneOfBuilder<T> {
    OneOfBuilder {
        variants: Vec::new(),
        catch_all: false,
        _value: PhantomData,
    }
}

pub struct OneOfBuilder<T> {
    variants: Vec<OneOfVariant>,
    catch_all: bool,
    _value: PhantomData<fn() -> T>,
}

impl<T: Any + Send> OneOfBuilder<T> {
    /// Used for values accepted by `applies`, responding with `status`.
    pub fn variant<F>(self, status: u16, output: Output<(T,)>, applies: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.push(Some(status), output, applies, false)
    }

    /// A variant that leaves the status code to its output.
    pub fn variant_without_status<F>(self, output: Output<(T,)>, applies: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.push(None, output, applies, false)
    }

    /// Accepts every value; later variants are never chosen when encoding.
    pub fn default_variant(self, status: Option<u16>, output: Output<(T,)>) -> Self {
        self.push(status, output, |_: &T| true, true)
    }

    fn push<F>(mut self, status: Option<u16>, output: Output<(T,)>, applies: F, catch_all: bool) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.variants.push(OneOfVariant {
            status,
            output: output.into_node(),
            applies: Arc::new(move |params: &Params| {
                params.downcast_ref::<T>().is_some_and(|value| applies(value))
            }),
        });
        self.catch_all = catch_all;
        self
    }

    pub fn build(self) -> Output<(T,)> {
        if !self.catch_all {
            tracing::warn!(
                value = std::any::type_name::<T>(),
                variants = self.variants.len(),
                "one-of output has no default variant; encoding an unmatched value will fail"
            );
        }
        Output::from_node(OutputNode::OneOf(OneOf {
            variants: self.variants,
        }))
    }
}
