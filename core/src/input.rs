//! Typed request inputs.
//!
//! `Input<T>` wraps an `InputNode` and remembers, at the type level, the
//! tuple `T` it decodes to. Leaves are built with the functions in this
//! module and composed with `and` and `map`.
//!
//! ```
//! use endpoint_core::input;
//!
//! let search = input::fixed_path("items")
//!     .and(input::query::<String>("q1"))
//!     .and(input::query::<i32>("q2"));
//! assert_eq!(search.show(), "/items ?q1 ?q2");
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::body::{BodyRaw, ByteStream};
use crate::codec::{self, body_kind, Codec, Erased, ErasedBody, List, Mapping, Optional, PlainValue, Required};
use crate::error::DecodeResult;
use crate::http::{Header, HttpMethod, QueryParams};
use crate::node::{BasicInput, BodyLeaf, InputNode, Mapped, Pair};
use crate::params::Params;
use crate::tuple::{Concat, Tuple};

pub struct Input<T> {
    node: InputNode,
    _shape: PhantomData<fn() -> T>,
}

impl<T> Clone for Input<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _shape: PhantomData,
        }
    }
}

impl<T: Tuple> Input<T> {
    pub(crate) fn from_node(node: InputNode) -> Self {
        Self {
            node,
            _shape: PhantomData,
        }
    }

    fn basic(basic: BasicInput) -> Self {
        Self::from_node(InputNode::Basic(basic))
    }

    pub fn node(&self) -> &InputNode {
        &self.node
    }

    pub fn into_node(self) -> InputNode {
        self.node
    }

    /// Both inputs, values concatenated left then right.
    pub fn and<U: Tuple>(self, other: Input<U>) -> Input<T::Out>
    where
        T: Concat<U>,
    {
        Input::from_node(InputNode::Pair(Pair::concat(self.node, other.node, T::ARITY)))
    }

    pub fn map<B, F, G>(self, f: F, g: G) -> Input<(B,)>
    where
        B: Any + Send,
        F: Fn(T) -> B + Send + Sync + 'static,
        G: Fn(B) -> T + Send + Sync + 'static,
    {
        self.map_with(Mapping::from_fn(f, g))
    }

    /// Like `map`, but decoding may fail, e.g. on a cross-field invariant.
    pub fn map_decode<B, F, G>(self, f: F, g: G) -> Input<(B,)>
    where
        B: Any + Send,
        F: Fn(T) -> DecodeResult<B> + Send + Sync + 'static,
        G: Fn(B) -> T + Send + Sync + 'static,
    {
        self.map_with(Mapping::from_decode(f, g))
    }

    pub fn map_with<B: Any + Send>(self, mapping: Mapping<T, B>) -> Input<(B,)> {
        let encoder = mapping.clone();
        Input::from_node(InputNode::Mapped(Mapped {
            wrapped: Box::new(self.node),
            decode: Arc::new(move |params: Params| {
                mapping.decode(T::from_params(params)).map(Params::single)
            }),
            encode: Arc::new(move |params: Params| {
                encoder.encode(params.downcast::<B>()).into_params()
            }),
        }))
    }

    /// Rejects decoded values for which `check` returns an error message.
    pub fn validate<F>(self, check: F) -> Input<T>
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        let mapping = Mapping::validating(check);
        Input::from_node(InputNode::Mapped(Mapped {
            wrapped: Box::new(self.node),
            decode: Arc::new(move |params: Params| {
                mapping.decode(T::from_params(params)).map(Tuple::into_params)
            }),
            encode: Arc::new(|params: Params| params),
        }))
    }

    pub fn show(&self) -> String {
        self.node.show()
    }
}

// ---------------------------------------------------------------------------
// Method and path
// ---------------------------------------------------------------------------

pub fn method(method: HttpMethod) -> Input<()> {
    Input::basic(BasicInput::Method(method))
}

pub fn fixed_path(segment: impl Into<String>) -> Input<()> {
    Input::basic(BasicInput::FixedPath(segment.into()))
}

/// One path segment, decoded as `T`.
pub fn path<T: PlainValue>(name: impl Into<String>) -> Input<(T,)> {
    path_with(name, codec::plain::<T>())
}

pub fn path_with<C: Codec<Raw = String>>(name: impl Into<String>, codec: C) -> Input<(C::Value,)> {
    Input::basic(BasicInput::PathCapture {
        name: name.into(),
        codec: Arc::new(Erased(codec)),
    })
}

/// All remaining path segments.
pub fn paths() -> Input<(Vec<String>,)> {
    Input::basic(BasicInput::PathsCapture {
        codec: Arc::new(Erased(List(codec::plain::<String>()))),
    })
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

pub fn query<T: PlainValue>(name: impl Into<String>) -> Input<(T,)> {
    query_with(name, Required(codec::plain::<T>()))
}

pub fn query_opt<T: PlainValue>(name: impl Into<String>) -> Input<(Option<T>,)> {
    query_with(name, Optional(codec::plain::<T>()))
}

pub fn query_list<T: PlainValue>(name: impl Into<String>) -> Input<(Vec<T>,)> {
    query_with(name, List(codec::plain::<T>()))
}

pub fn query_with<C: Codec<Raw = Vec<String>>>(name: impl Into<String>, codec: C) -> Input<(C::Value,)> {
    Input::basic(BasicInput::Query {
        name: name.into(),
        codec: Arc::new(Erased(codec)),
    })
}

pub fn query_params() -> Input<(QueryParams,)> {
    Input::basic(BasicInput::QueryParams {
        codec: Arc::new(Erased(codec::identity::<QueryParams>())),
    })
}

// ---------------------------------------------------------------------------
// Headers and cookies
// ---------------------------------------------------------------------------

pub fn header<T: PlainValue>(name: impl Into<String>) -> Input<(T,)> {
    header_with(name, Required(codec::plain::<T>()))
}

pub fn header_opt<T: PlainValue>(name: impl Into<String>) -> Input<(Option<T>,)> {
    header_with(name, Optional(codec::plain::<T>()))
}

pub fn header_with<C: Codec<Raw = Vec<String>>>(name: impl Into<String>, codec: C) -> Input<(C::Value,)> {
    Input::basic(BasicInput::Header {
        name: name.into(),
        codec: Arc::new(Erased(codec)),
    })
}

/// Requires header `name` to carry `value`; produces nothing.
pub fn fixed_header(name: impl Into<String>, value: impl Into<String>) -> Input<()> {
    Input::basic(BasicInput::FixedHeader {
        name: name.into(),
        value: value.into(),
    })
}

pub fn headers() -> Input<(Vec<Header>,)> {
    Input::basic(BasicInput::Headers {
        codec: Arc::new(Erased(codec::identity::<Vec<Header>>())),
    })
}

pub fn cookie<T: PlainValue>(name: impl Into<String>) -> Input<(T,)> {
    cookie_with(name, Required(codec::plain::<T>()))
}

pub fn cookie_opt<T: PlainValue>(name: impl Into<String>) -> Input<(Option<T>,)> {
    cookie_with(name, Optional(codec::plain::<T>()))
}

pub fn cookie_with<C: Codec<Raw = Vec<String>>>(name: impl Into<String>, codec: C) -> Input<(C::Value,)> {
    Input::basic(BasicInput::Cookie {
        name: name.into(),
        codec: Arc::new(Erased(codec)),
    })
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

pub fn body_with<C>(codec: C) -> Input<(C::Value,)>
where
    C: Codec,
    C::Raw: BodyRaw,
{
    Input::basic(BasicInput::Body(BodyLeaf {
        kind: body_kind::<C>(),
        codec: Arc::new(ErasedBody(codec)),
    }))
}

pub fn body_text() -> Input<(String,)> {
    body_with(codec::TextCodec)
}

pub fn body_bytes() -> Input<(Bytes,)> {
    body_with(codec::BytesCodec)
}

pub fn body_stream() -> Input<(ByteStream,)> {
    body_with(codec::StreamCodec)
}

pub fn body_json<T: Serialize + DeserializeOwned + Send + 'static>() -> Input<(T,)> {
    body_with(codec::json::<T>())
}

pub fn empty() -> Input<()> {
    Input::basic(BasicInput::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn and_flattens_units_and_values() {
        let input = fixed_path("items").and(path::<i64>("id")).and(query_opt::<bool>("full"));
        assert_eq!(input.show(), "/items /{id} ?[full]");
        assert_eq!(input.node().leaf_paths().len(), 3);
    }

    #[test]
    fn map_wraps_in_a_mapped_node() {
        #[derive(Debug, PartialEq)]
        struct Page {
            number: u32,
        }
        let input = query::<u32>("page").map(|(number,)| Page { number }, |page| (page.number,));
        let InputNode::Mapped(mapped) = input.node() else {
            panic!("expected a mapped node");
        };
        let decoded = (mapped.decode)(Params::single(3_u32)).unwrap();
        assert_eq!(decoded.downcast::<Page>(), Page { number: 3 });
        let encoded = (mapped.encode)(Params::single(Page { number: 4 }));
        assert_eq!(encoded.downcast::<u32>(), 4);
    }

    #[test]
    fn validate_keeps_the_tuple_shape() {
        let input = query::<i32>("from")
            .and(query::<i32>("to"))
            .validate(|(from, to)| {
                if from <= to {
                    Ok(())
                } else {
                    Err("`from` must not exceed `to`".to_string())
                }
            });
        let InputNode::Mapped(mapped) = input.node() else {
            panic!("expected a mapped node");
        };
        let ok = (mapped.decode)((1_i32, 2_i32).into_params()).unwrap();
        assert_eq!(<(i32, i32)>::from_params(ok), (1, 2));
        let err = (mapped.decode)((3_i32, 2_i32).into_params()).unwrap_err();
        assert_eq!(err, DecodeError::Invalid("`from` must not exceed `to`".to_string()));
    }
}
