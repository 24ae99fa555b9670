//! Message dispatcher - Routes messages through behaviors to handlers

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::builder::MediatorBuilder;
use super::fanout::fan_out;
use super::pipeline::{compose, DispatchResult, Next, Request, Response};
use crate::application::errors::MediatorError;
use crate::domain::entities::{
    CancellationToken, Command, HandlerKey, Notification, Query, ResponseCommand,
};
use crate::domain::traits::{CommandHandler, QueryHandler, ResponseCommandHandler};
use crate::infrastructure::config::PublishStrategy;
use crate::infrastructure::registry::Registry;
use crate::infrastructure::scope::{Scope, ScopeFactory};

/// Public entry point for dispatching messages
#[async_trait]
pub trait Sender: Send + Sync {
    /// Send a command that produces no response
    async fn send<C: Command>(&self, command: C, cancel: &CancellationToken) -> DispatchResult<()>;

    /// Send a command and return its response
    async fn send_with_response<C: ResponseCommand>(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> DispatchResult<C::Response>;

    /// Run a query and return its response
    async fn query<Q: Query>(&self, query: Q, cancel: &CancellationToken) -> DispatchResult<Q::Response>;

    /// Broadcast a notification to every registered listener
    async fn publish<N: Notification>(&self, notification: N, cancel: &CancellationToken) -> DispatchResult<()>;
}

/// In-process mediator backed by an immutable registry
#[derive(Clone)]
pub struct Mediator {
    registry: Arc<Registry>,
    scopes: Arc<dyn ScopeFactory>,
    publish_strategy: PublishStrategy,
}

impl Mediator {
    pub fn new(registry: Registry, scopes: Arc<dyn ScopeFactory>, publish_strategy: PublishStrategy) -> Self {
        Self {
            registry: Arc::new(registry),
            scopes,
            publish_strategy,
        }
    }

    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn publish_strategy(&self) -> PublishStrategy {
        self.publish_strategy
    }

    /// Publish a notification whose concrete type is only known at runtime
    pub async fn publish_dyn(
        &self,
        notification: Arc<dyn Notification>,
        cancel: &CancellationToken,
    ) -> DispatchResult<()> {
        let key = HandlerKey::dyn_notification(notification.as_ref());
        self.publish_erased(key, notification.into_any_arc(), cancel).await
    }

    fn open_scope(&self, key: &HandlerKey) -> Scope {
        let scope = self.scopes.create_scope();
        tracing::debug!(%key, scope = %scope.id(), "dispatch");
        scope
    }

    async fn publish_erased(
        &self,
        key: HandlerKey,
        notification: Arc<dyn Any + Send + Sync>,
        cancel: &CancellationToken,
    ) -> DispatchResult<()> {
        let scope = self.open_scope(&key);
        let listeners = self.registry.resolve_listeners(&key, &scope);
        let result = fan_out(&key, notification, listeners, cancel, self.publish_strategy).await;
        scope.close();
        result
    }

    /// Dispatch a response-shaped message through the pipeline behaviors
    async fn dispatch_with_response<M, R, F>(
        &self,
        key: HandlerKey,
        message: &M,
        cancel: &CancellationToken,
        scope: &Scope,
        invoke: F,
    ) -> DispatchResult<R>
    where
        M: Send + Sync + 'static,
        R: Send + 'static,
        F: for<'a> FnOnce(&'a M, &'a CancellationToken) -> futures::future::BoxFuture<'a, DispatchResult<R>>
            + Send,
    {
        let behaviors = self.registry.resolve_pipeline_behaviors(&key, scope);
        let terminal = Next::new(move || {
            Box::pin(async move { invoke(message, cancel).await.map(Response::new) })
        });

        compose(Request::new(message, key), behaviors, cancel, terminal)
            .run()
            .await?
            .downcast::<R>()
    }
}

#[async_trait]
impl Sender for Mediator {
    async fn send<C: Command>(&self, command: C, cancel: &CancellationToken) -> DispatchResult<()> {
        let key = HandlerKey::command::<C>();
        let scope = self.open_scope(&key);

        let result = async {
            let handler = self
                .registry
                .resolve_handler::<dyn CommandHandler<C>>(&key, &scope)
                .inspect_err(|e| tracing::warn!(%key, "{}", e))?;
            let behaviors = self.registry.resolve_command_behaviors(&key, &scope);

            let command = &command;
            let terminal = Next::new(move || {
                Box::pin(async move {
                    handler.handle(command, cancel).await.map_err(MediatorError::from)
                })
            });

            compose(Request::new(command, key), behaviors, cancel, terminal)
                .run()
                .await
        }
        .await;

        scope.close();
        result
    }

    async fn send_with_response<C: ResponseCommand>(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> DispatchResult<C::Response> {
        let key = HandlerKey::response_command::<C>();
        let scope = self.open_scope(&key);

        let result = async {
            let handler = self
                .registry
                .resolve_handler::<dyn ResponseCommandHandler<C>>(&key, &scope)
                .inspect_err(|e| tracing::warn!(%key, "{}", e))?;

            self.dispatch_with_response(key, &command, cancel, &scope, move |command, cancel| {
                Box::pin(async move { handler.handle(command, cancel).await.map_err(MediatorError::from) })
            })
            .await
        }
        .await;

        scope.close();
        result
    }

    async fn query<Q: Query>(&self, query: Q, cancel: &CancellationToken) -> DispatchResult<Q::Response> {
        let key = HandlerKey::query::<Q>();
        let scope = self.open_scope(&key);

        let result = async {
            let handler = self
                .registry
                .resolve_handler::<dyn QueryHandler<Q>>(&key, &scope)
                .inspect_err(|e| tracing::warn!(%key, "{}", e))?;

            self.dispatch_with_response(key, &query, cancel, &scope, move |query, cancel| {
                Box::pin(async move { handler.handle(query, cancel).await.map_err(MediatorError::from) })
            })
            .await
        }
        .await;

        scope.close();
        result
    }

    async fn publish<N: Notification>(&self, notification: N, cancel: &CancellationToken) -> DispatchResult<()> {
        let key = HandlerKey::notification::<N>();
        self.publish_erased(key, Arc::new(notification), cancel).await
    }
}
