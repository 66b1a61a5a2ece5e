//! Server interpretation of endpoint descriptions.
//!
//! The transport adapts its request to `ServerRequest` + `RequestBody`,
//! calls `ServerInterpreter::handle` and writes the `ServerResponse` back.

pub mod interceptor;
pub mod interpreter;
mod request;
mod response;

pub use interceptor::{
    DecodeFailureInterceptor, FailureContext, FailureNext, Interceptor, SuccessContext, SuccessNext,
    TracingInterceptor,
};
pub use interpreter::{AnyServerEndpoint, ServerEndpoint, ServerInterpreter, ServerInterpreterBuilder, ServerOptions};
pub use request::{RequestBody, RequestParts, ServerRequest};
pub use response::ServerResponse;
