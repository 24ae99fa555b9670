//! Behavior pipeline - Middleware chain wrapped around a terminal handler call

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::application::errors::MediatorError;
use crate::domain::entities::{CancellationToken, HandlerKey, MessageKind};

/// Dispatch result
pub type DispatchResult<T> = Result<T, MediatorError>;

/// View of the message travelling through the pipeline
#[derive(Clone, Copy)]
pub struct Request<'a> {
    message: &'a (dyn Any + Send + Sync),
    key: HandlerKey,
}

impl<'a> Request<'a> {
    pub fn new(message: &'a (dyn Any + Send + Sync), key: HandlerKey) -> Self {
        Self { message, key }
    }

    pub fn kind(&self) -> MessageKind {
        self.key.kind
    }

    pub fn key(&self) -> &HandlerKey {
        &self.key
    }

    /// Type name of the concrete message
    pub fn message_name(&self) -> &'static str {
        self.key.message_name
    }

    pub fn response_name(&self) -> Option<&'static str> {
        self.key.response_name
    }

    /// Borrow the message as its concrete type
    pub fn downcast_ref<M: 'static>(&self) -> Option<&'a M> {
        self.message.downcast_ref::<M>()
    }

    pub fn is<M: 'static>(&self) -> bool {
        self.message.is::<M>()
    }
}

impl std::fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request").field("key", &self.key).finish()
    }
}

/// Type-erased response flowing back through response-shaped behaviors
pub struct Response {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Response {
    pub fn new<R: Send + 'static>(value: R) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<R>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<R: 'static>(&self) -> bool {
        self.value.is::<R>()
    }

    pub fn downcast_ref<R: 'static>(&self) -> Option<&R> {
        self.value.downcast_ref::<R>()
    }

    /// Recover the concrete response value
    pub fn downcast<R: 'static>(self) -> DispatchResult<R> {
        let actual = self.type_name;
        self.value
            .downcast::<R>()
            .map(|value| *value)
            .map_err(|_| MediatorError::ResponseType {
                expected: std::any::type_name::<R>(),
                actual,
            })
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Rest of the chain, ending in the handler. Consumed by `run`.
pub struct Next<'a, T> {
    inner: Box<dyn FnOnce() -> BoxFuture<'a, DispatchResult<T>> + Send + 'a>,
}

impl<'a, T: Send + 'a> Next<'a, T> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, DispatchResult<T>> + Send + 'a,
    {
        Self { inner: Box::new(f) }
    }

    /// Run the remaining behaviors and the handler
    pub async fn run(self) -> DispatchResult<T> {
        (self.inner)().await
    }
}

/// Behavior wrapped around handler invocation.
///
/// `Behavior<()>` is the no-response shape and only sees `send(command)`.
/// `Behavior<Response>` is the response shape and only sees commands with a
/// response and queries.
#[async_trait]
pub trait Behavior<T: Send + 'static>: Send + Sync {
    /// Intercept a request; call `next.run()` to continue or return to short-circuit
    async fn handle(
        &self,
        request: &Request<'_>,
        next: Next<'_, T>,
        cancel: &CancellationToken,
    ) -> DispatchResult<T>;
}

/// Behavior for the no-response shape
pub type CommandBehavior = dyn Behavior<()>;

/// Behavior for the response shape
pub type PipelineBehavior = dyn Behavior<Response>;

/// Fold behaviors around `terminal`, first behavior outermost
pub fn compose<'a, T: Send + 'static>(
    request: Request<'a>,
    behaviors: Vec<Arc<dyn Behavior<T>>>,
    cancel: &'a CancellationToken,
    terminal: Next<'a, T>,
) -> Next<'a, T> {
    behaviors
        .into_iter()
        .rev()
        .fold(terminal, |next, behavior| {
            Next::new(move || {
                Box::pin(async move { behavior.handle(&request, next, cancel).await })
            })
        })
}
