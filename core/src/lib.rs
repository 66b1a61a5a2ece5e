//! Describe HTTP endpoints as values, then serve or call them.
//!
//! # Overview
//! An endpoint is built from typed inputs and outputs:
//!
//! ```
//! use endpoint_core::{endpoint, input, output};
//!
//! let get_item = endpoint()
//!     .get()
//!     .input(input::fixed_path("items"))
//!     .input(input::path::<u64>("id"))
//!     .output(output::body_text())
//!     .name("get-item");
//! assert_eq!(
//!     get_item.show(),
//!     "get-item: GET /items /{id} -> {body as text/plain; charset=utf-8} | void"
//! );
//! ```
//!
//! The description performs no I/O. `ServerInterpreter` decodes requests
//! with it and runs server logic; `EndpointClient` builds requests and
//! parses responses with the same description (host-does-IO: the caller or
//! a `Transport` executes the round-trip).
//!
//! # Design
//! - The typed façade (`Input<T>`, `Output<T>`, `Endpoint<I, E, O>`) keeps
//!   value types in phantom parameters. Underneath is an untyped node tree
//!   whose values travel as `Params`, so the interpreters are written once
//!   for every endpoint.
//! - Inputs and outputs compose with `and`, which concatenates value tuples
//!   (`()` and `(T,)` act as units), and `map`, which converts between a
//!   tuple and a domain type.
//! - Request decoding is two-phase: everything but the body first, so
//!   endpoints that do not match never consume the body.
//! - Decode failures are values (`DecodeFailure`); malformed descriptions
//!   are `StructuralError`s. Engine invariants, such as a value not
//!   matching its node, are panics.

pub mod body;
pub mod client;
pub mod codec;
pub mod decode;
pub mod encode;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod input;
pub mod node;
pub mod output;
pub mod params;
pub mod reconstruct;
pub mod schema;
pub mod server;
pub mod tuple;

pub use body::{BodyKind, ByteStream, RawBody};
pub use client::{EndpointClient, Transport};
pub use codec::{Codec, CodecFormat, Mapping};
pub use endpoint::{endpoint, Endpoint, EndpointInfo};
pub use error::{
    ClientError, DecodeError, DecodeFailure, DecodeResult, FailingOutput, InterpretError, ResponseDecodeFailure,
    StructuralError,
};
pub use http::{Header, HttpMethod, HttpRequest, HttpResponse, QueryParams};
pub use input::Input;
pub use output::Output;
pub use params::Params;
pub use schema::Schema;
pub use server::{
    Interceptor, RequestBody, RequestParts, ServerEndpoint, ServerInterpreter, ServerOptions, ServerRequest,
    ServerResponse,
};
pub use tuple::{Tuple, Void};
