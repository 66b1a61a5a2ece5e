//! Runs requests against a list of server endpoints.
//!
//! # Design
//! Endpoints are tried in registration order. For each one the request
//! metadata is decoded (phase one); on failure the interceptor chain
//! decides whether to answer or to move on to the next endpoint. Only the
//! endpoint that gets past phase one may read the body, and once it has,
//! a deferred failure ends the search. After the server logic returns,
//! its `Ok` value is encoded with the output and its `Err` value with the
//! error output.
//!
//! Dropping the future returned by `handle` cancels the request: no
//! further endpoint is tried and the server logic future is dropped.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::decode::{decode_basic_inputs, BasicInputs};
use crate::encode::encode_output;
use crate::endpoint::{Endpoint, EndpointInfo};
use crate::error::{DecodeFailure, InterpretError};
use crate::node::{InputNode, OutputNode};
use crate::params::Params;
use crate::reconstruct::reconstruct;
use crate::server::interceptor::{
    DecodeFailureInterceptor, FailureContext, FailureNext, Interceptor, SuccessContext, SuccessNext,
};
use crate::server::{RequestBody, ServerRequest, ServerResponse};
use crate::tuple::Tuple;

type LogicFn<I, E, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, E>> + Send + Sync>;

/// An endpoint paired with its server logic.
pub struct ServerEndpoint<I, E, O> {
    endpoint: Endpoint<I, E, O>,
    logic: LogicFn<I, E, O>,
}

impl<I, E, O> Clone for ServerEndpoint<I, E, O> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            logic: Arc::clone(&self.logic),
        }
    }
}

impl<I: Tuple, E: Tuple, O: Tuple> ServerEndpoint<I, E, O> {
    pub fn endpoint(&self) -> &Endpoint<I, E, O> {
        &self.endpoint
    }
}

impl<I: Tuple, E: Tuple, O: Tuple> Endpoint<I, E, O> {
    /// Attaches the logic run for requests that decode to this endpoint.
    pub fn server_logic<F, Fut>(self, logic: F) -> ServerEndpoint<I, E, O>
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
    {
        ServerEndpoint {
            endpoint: self,
            logic: Arc::new(move |input| logic(input).boxed()),
        }
    }
}

/// A server endpoint with its value types erased.
pub trait AnyServerEndpoint: Send + Sync {
    fn info(&self) -> &EndpointInfo;

    fn input(&self) -> &InputNode;

    fn output(&self) -> &OutputNode;

    fn error_output(&self) -> &OutputNode;

    fn show(&self) -> String;

    /// Runs the server logic. `Ok` holds the output value, `Err` the error
    /// output value.
    fn invoke(&self, input: Params) -> BoxFuture<'static, Result<Params, Params>>;
}

impl<I: Tuple, E: Tuple, O: Tuple> AnyServerEndpoint for ServerEndpoint<I, E, O> {
    fn info(&self) -> &EndpointInfo {
        self.endpoint.info()
    }

    fn input(&self) -> &InputNode {
        self.endpoint.input_node()
    }

    fn output(&self) -> &OutputNode {
        self.endpoint.output_node()
    }

    fn error_output(&self) -> &OutputNode {
        self.endpoint.error_output_node()
    }

    fn show(&self) -> String {
        self.endpoint.show()
    }

    fn invoke(&self, input: Params) -> BoxFuture<'static, Result<Params, Params>> {
        let result = (self.logic)(I::from_params(input));
        async move {
            match result.await {
                Ok(output) => Ok(output.into_params()),
                Err(error) => Err(error.into_params()),
            }
        }
        .boxed()
    }
}

/// Status codes used when an output does not set one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub success_status: u16,
    pub error_status: u16,
    pub decode_failure_status: u16,
    /// Answer malformed path captures with a decode failure response
    /// instead of trying the next endpoint.
    pub bad_request_on_invalid_path: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            success_status: 200,
            error_status: 400,
            decode_failure_status: 400,
            bad_request_on_invalid_path: false,
        }
    }
}

pub struct ServerInterpreterBuilder {
    endpoints: Vec<Arc<dyn AnyServerEndpoint>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    options: ServerOptions,
    decode_failure_handler: bool,
}

impl ServerInterpreterBuilder {
    pub fn endpoint<I: Tuple, E: Tuple, O: Tuple>(mut self, endpoint: ServerEndpoint<I, E, O>) -> Self {
        self.endpoints.push(Arc::new(endpoint));
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Leaves every decode failure to the registered interceptors; without
    /// one that responds, the next endpoint is tried.
    pub fn without_decode_failure_handler(mut self) -> Self {
        self.decode_failure_handler = false;
        self
    }

    pub fn build(self) -> ServerInterpreter {
        let mut interceptors = self.interceptors;
        if self.decode_failure_handler {
            interceptors.push(Arc::new(DecodeFailureInterceptor {
                status: self.options.decode_failure_status,
                bad_request_on_invalid_path: self.options.bad_request_on_invalid_path,
            }));
        }
        ServerInterpreter {
            endpoints: self.endpoints,
            interceptors,
            options: self.options,
        }
    }
}

/// Outcome of offering a request to one endpoint.
enum Attempt {
    Responded(ServerResponse),
    /// The failure chain declined to answer. Once the body has been read,
    /// no later endpoint can see it.
    Deferred { body_read: bool },
}

pub struct ServerInterpreter {
    endpoints: Vec<Arc<dyn AnyServerEndpoint>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    options: ServerOptions,
}

impl ServerInterpreter {
    pub fn builder() -> ServerInterpreterBuilder {
        ServerInterpreterBuilder {
            endpoints: Vec::new(),
            interceptors: Vec::new(),
            options: ServerOptions::default(),
            decode_failure_handler: true,
        }
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &dyn AnyServerEndpoint> {
        self.endpoints.iter().map(|endpoint| endpoint.as_ref())
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Handles one request. `Ok(None)` means no endpoint accepted it, and
    /// the transport should answer on its own (typically `404`).
    pub async fn handle<R, B>(&self, request: &R, body: &mut B) -> Result<Option<ServerResponse>, InterpretError>
    where
        R: ServerRequest,
        B: RequestBody,
    {
        for endpoint in &self.endpoints {
            match self.try_endpoint(endpoint.as_ref(), request, body).await? {
                Attempt::Responded(response) => return Ok(Some(response)),
                Attempt::Deferred { body_read: false } => {}
                Attempt::Deferred { body_read: true } => {
                    tracing::debug!(endpoint = %endpoint.show(), "body already read, no further endpoint tried");
                    return Ok(None);
                }
            }
        }
        tracing::debug!(
            method = %request.method(),
            segments = ?request.path_segments(),
            "no endpoint matched"
        );
        Ok(None)
    }

    async fn try_endpoint<B: RequestBody>(
        &self,
        endpoint: &dyn AnyServerEndpoint,
        request: &dyn ServerRequest,
        body: &mut B,
    ) -> Result<Attempt, InterpretError> {
        let inputs = decode_basic_inputs(endpoint.input(), request)?;
        let body_read = matches!(inputs, BasicInputs::BodyPending(_));
        let deferred = |response: Option<ServerResponse>| match response {
            Some(response) => Attempt::Responded(response),
            None => Attempt::Deferred { body_read },
        };
        let values = match inputs.finish(body).await? {
            Ok(values) => values,
            Err(failure) => return self.decode_failure(endpoint, request, failure).await.map(deferred),
        };
        let input = match reconstruct(endpoint.input(), values) {
            Ok(input) => input,
            Err(failure) => return self.decode_failure(endpoint, request, failure).await.map(deferred),
        };

        let ctx = SuccessContext { endpoint, request };
        let logic = Box::new(move || {
            async move {
                let result = endpoint.invoke(input).await;
                self.encode_result(endpoint, result)
            }
            .boxed()
        });
        SuccessNext::new(&self.interceptors, logic).run(&ctx).await.map(Attempt::Responded)
    }

    async fn decode_failure(
        &self,
        endpoint: &dyn AnyServerEndpoint,
        request: &dyn ServerRequest,
        failure: DecodeFailure,
    ) -> Result<Option<ServerResponse>, InterpretError> {
        tracing::trace!(endpoint = %endpoint.show(), %failure, "decode failure");
        let ctx = FailureContext {
            endpoint,
            request,
            failure: &failure,
        };
        FailureNext::new(&self.interceptors).run(&ctx).await
    }

    fn encode_result(
        &self,
        endpoint: &dyn AnyServerEndpoint,
        result: Result<Params, Params>,
    ) -> Result<ServerResponse, InterpretError> {
        let (node, value, default_status) = match result {
            Ok(value) => (endpoint.output(), value, self.options.success_status),
            Err(value) => (endpoint.error_output(), value, self.options.error_status),
        };
        match encode_output(node, value) {
            Ok(values) => Ok(values.into_response(default_status)),
            Err(error) => {
                tracing::error!(endpoint = %endpoint.show(), %error, "response cannot be encoded");
                Err(error.into())
            }
        }
    }
}
