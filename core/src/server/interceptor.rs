//! Interceptors wrap endpoint handling.
//!
//! Each interceptor sees a decode success (before the server logic runs)
//! or a decode failure, and either handles it or passes it on with
//! `next.run(ctx)`. Interceptors run in registration order.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::{DecodeError, DecodeFailure, InputKind, InterpretError};
use crate::server::interpreter::AnyServerEndpoint;
use crate::server::{ServerRequest, ServerResponse};

pub struct SuccessContext<'a> {
    pub endpoint: &'a dyn AnyServerEndpoint,
    pub request: &'a dyn ServerRequest,
}

pub struct FailureContext<'a> {
    pub endpoint: &'a dyn AnyServerEndpoint,
    pub request: &'a dyn ServerRequest,
    pub failure: &'a DecodeFailure,
}

type Logic<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<ServerResponse, InterpretError>> + Send + 'a>;

/// The rest of the chain after a decode success, ending in the server
/// logic.
pub struct SuccessNext<'a> {
    rest: &'a [Arc<dyn Interceptor>],
    logic: Logic<'a>,
}

impl<'a> SuccessNext<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Interceptor>], logic: Logic<'a>) -> Self {
        Self { rest: chain, logic }
    }

    pub fn run(self, ctx: &'a SuccessContext<'a>) -> BoxFuture<'a, Result<ServerResponse, InterpretError>> {
        match self.rest.split_first() {
            Some((first, rest)) => first.on_decode_success(
                ctx,
                SuccessNext {
                    rest,
                    logic: self.logic,
                },
            ),
            None => (self.logic)(),
        }
    }
}

/// The rest of the chain after a decode failure. The end of the chain
/// answers `None`: the next endpoint is tried.
pub struct FailureNext<'a> {
    rest: &'a [Arc<dyn Interceptor>],
}

impl<'a> FailureNext<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Interceptor>]) -> Self {
        Self { rest: chain }
    }

    pub fn run(self, ctx: &'a FailureContext<'a>) -> BoxFuture<'a, Result<Option<ServerResponse>, InterpretError>> {
        match self.rest.split_first() {
            Some((first, rest)) => first.on_decode_failure(ctx, FailureNext { rest }),
            None => async { Ok(None) }.boxed(),
        }
    }
}

pub trait Interceptor: Send + Sync {
    fn on_decode_success<'a>(
        &'a self,
        ctx: &'a SuccessContext<'a>,
        next: SuccessNext<'a>,
    ) -> BoxFuture<'a, Result<ServerResponse, InterpretError>> {
        next.run(ctx)
    }

    fn on_decode_failure<'a>(
        &'a self,
        ctx: &'a FailureContext<'a>,
        next: FailureNext<'a>,
    ) -> BoxFuture<'a, Result<Option<ServerResponse>, InterpretError>> {
        next.run(ctx)
    }
}

/// Turns decode failures into `400 Bad Request` responses, except where the
/// request's method or path shape says it was meant for another endpoint.
#[derive(Debug, Clone)]
pub struct DecodeFailureInterceptor {
    pub status: u16,
    /// Respond instead of deferring when a path capture is malformed or
    /// invalid, e.g. `/items/abc` against `/items/{id: u64}`.
    pub bad_request_on_invalid_path: bool,
}

impl DecodeFailureInterceptor {
    fn responds_to(&self, failure: &DecodeFailure) -> bool {
        if !failure.input.kind.is_path_shape() {
            return true;
        }
        self.bad_request_on_invalid_path
            && matches!(failure.input.kind, InputKind::PathCapture | InputKind::PathsCapture)
            && matches!(failure.error, DecodeError::Malformed { .. } | DecodeError::Invalid(_))
    }
}

impl Default for DecodeFailureInterceptor {
    fn default() -> Self {
        Self {
            status: 400,
            bad_request_on_invalid_path: false,
        }
    }
}

impl Interceptor for DecodeFailureInterceptor {
    fn on_decode_failure<'a>(
        &'a self,
        ctx: &'a FailureContext<'a>,
        next: FailureNext<'a>,
    ) -> BoxFuture<'a, Result<Option<ServerResponse>, InterpretError>> {
        if !self.responds_to(ctx.failure) {
            return next.run(ctx);
        }
        let message = format!("Invalid value for: {}", ctx.failure);
        let response = ServerResponse::text(self.status, message);
        async move { Ok(Some(response)) }.boxed()
    }
}

/// Logs every decode outcome at `debug`.
#[derive(Debug, Clone, Default)]
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn on_decode_success<'a>(
        &'a self,
        ctx: &'a SuccessContext<'a>,
        next: SuccessNext<'a>,
    ) -> BoxFuture<'a, Result<ServerResponse, InterpretError>> {
        async move {
            let response = next.run(ctx).await?;
            tracing::debug!(endpoint = %ctx.endpoint.show(), status = response.status, "request handled");
            Ok(response)
        }
        .boxed()
    }

    fn on_decode_failure<'a>(
        &'a self,
        ctx: &'a FailureContext<'a>,
        next: FailureNext<'a>,
    ) -> BoxFuture<'a, Result<Option<ServerResponse>, InterpretError>> {
        tracing::debug!(
            endpoint = %ctx.endpoint.show(),
            input = %ctx.failure.input,
            error = %ctx.failure.error,
            "request did not decode"
        );
        next.run(ctx)
    }
}
