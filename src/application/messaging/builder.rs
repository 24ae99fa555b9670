//! Mediator builder - Accumulates registrations, then freezes them into a `Mediator`

use std::sync::Arc;

use super::behaviors::{CancellationGuardBehavior, LoggingBehavior, SlowRequestBehavior};
use super::dispatcher::Mediator;
use super::pipeline::{Behavior, Response};
use crate::domain::entities::{Command, HandlerKey, MessageKind, Notification, Query, ResponseCommand};
use crate::domain::traits::{CommandHandler, NotificationHandler, QueryHandler, ResponseCommandHandler};
use crate::infrastructure::config::{Config, PublishStrategy};
use crate::infrastructure::registry::{BehaviorFilter, BehaviorRegistration, Factory, Registry};
use crate::infrastructure::scope::{DefaultScopeFactory, Scope, ScopeFactory};

/// Builder for a `Mediator`.
///
/// Every factory runs once per resolution, inside the scope of the dispatch
/// that needs the instance.
pub struct MediatorBuilder {
    registry: Registry,
    scopes: Arc<dyn ScopeFactory>,
    publish_strategy: PublishStrategy,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            scopes: Arc::new(DefaultScopeFactory),
            publish_strategy: PublishStrategy::default(),
        }
    }

    /// Apply configuration: publish strategy and the enabled built-in behaviors
    pub fn with_config(mut self, config: &Config) -> Self {
        self.publish_strategy = config.mediator.publish_strategy;

        let behaviors = &config.behaviors;
        if behaviors.reject_cancelled {
            self = self.open_behavior(|_| CancellationGuardBehavior);
        }
        if behaviors.logging {
            self = self.open_behavior(|_| LoggingBehavior);
        }
        if let Some(threshold_ms) = behaviors.slow_request_threshold_ms {
            self = self.open_behavior(move |_| SlowRequestBehavior::from_millis(threshold_ms));
        }
        self
    }

    pub fn publish_strategy(mut self, strategy: PublishStrategy) -> Self {
        self.publish_strategy = strategy;
        self
    }

    /// Replace the scope factory used for every dispatch
    pub fn scope_factory<S: ScopeFactory + 'static>(mut self, scopes: S) -> Self {
        self.scopes = Arc::new(scopes);
        self
    }

    /// Register the handler for a command with no response
    pub fn command_handler<C, H>(mut self, factory: impl Fn(&Scope) -> H + Send + Sync + 'static) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let factory: Factory<dyn CommandHandler<C>> =
            Arc::new(move |scope: &Scope| Arc::new(factory(scope)) as Arc<dyn CommandHandler<C>>);
        self.registry
            .add_handler(HandlerKey::command::<C>(), std::any::type_name::<H>(), factory);
        self
    }

    /// Register the handler for a command with a response
    pub fn response_command_handler<C, H>(
        mut self,
        factory: impl Fn(&Scope) -> H + Send + Sync + 'static,
    ) -> Self
    where
        C: ResponseCommand,
        H: ResponseCommandHandler<C> + 'static,
    {
        let factory: Factory<dyn ResponseCommandHandler<C>> = Arc::new(move |scope: &Scope| {
            Arc::new(factory(scope)) as Arc<dyn ResponseCommandHandler<C>>
        });
        self.registry.add_handler(
            HandlerKey::response_command::<C>(),
            std::any::type_name::<H>(),
            factory,
        );
        self
    }

    /// Register the handler for a query
    pub fn query_handler<Q, H>(mut self, factory: impl Fn(&Scope) -> H + Send + Sync + 'static) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let factory: Factory<dyn QueryHandler<Q>> =
            Arc::new(move |scope: &Scope| Arc::new(factory(scope)) as Arc<dyn QueryHandler<Q>>);
        self.registry
            .add_handler(HandlerKey::query::<Q>(), std::any::type_name::<H>(), factory);
        self
    }

    /// Add a listener for a notification
    pub fn notification_handler<N, H>(mut self, factory: impl Fn(&Scope) -> H + Send + Sync + 'static) -> Self
    where
        N: Notification,
        H: NotificationHandler<N> + 'static,
    {
        let factory: Factory<dyn NotificationHandler<N>> =
            Arc::new(move |scope: &Scope| Arc::new(factory(scope)) as Arc<dyn NotificationHandler<N>>);
        self.registry
            .add_listener::<N>(std::any::type_name::<H>(), factory);
        self
    }

    /// Add a no-response behavior for every command sent without a response
    pub fn command_behavior<B>(self, factory: impl Fn(&Scope) -> B + Send + Sync + 'static) -> Self
    where
        B: Behavior<()> + 'static,
    {
        self.command_behavior_filtered(BehaviorFilter::Any, factory)
    }

    /// Add a no-response behavior for one command type
    pub fn command_behavior_for<C, B>(self, factory: impl Fn(&Scope) -> B + Send + Sync + 'static) -> Self
    where
        C: Command,
        B: Behavior<()> + 'static,
    {
        self.command_behavior_filtered(BehaviorFilter::message::<C>(), factory)
    }

    /// Add a response behavior for every command with a response and every query
    pub fn pipeline_behavior<B>(self, factory: impl Fn(&Scope) -> B + Send + Sync + 'static) -> Self
    where
        B: Behavior<Response> + 'static,
    {
        self.pipeline_behavior_filtered(BehaviorFilter::Any, factory)
    }

    /// Add a response behavior for one message type
    pub fn pipeline_behavior_for<M, B>(self, factory: impl Fn(&Scope) -> B + Send + Sync + 'static) -> Self
    where
        M: 'static,
        B: Behavior<Response> + 'static,
    {
        self.pipeline_behavior_filtered(BehaviorFilter::message::<M>(), factory)
    }

    /// Add a response behavior for one message kind (commands with a response, or queries)
    pub fn pipeline_behavior_for_kind<B>(
        self,
        kind: MessageKind,
        factory: impl Fn(&Scope) -> B + Send + Sync + 'static,
    ) -> Self
    where
        B: Behavior<Response> + 'static,
    {
        self.pipeline_behavior_filtered(BehaviorFilter::Kind(kind), factory)
    }

    /// Add a behavior that implements both shapes, registered at each
    pub fn open_behavior<B>(self, factory: impl Fn(&Scope) -> B + Send + Sync + 'static) -> Self
    where
        B: Behavior<()> + Behavior<Response> + 'static,
    {
        let factory = Arc::new(factory);
        let pipeline_factory = factory.clone();
        self.command_behavior(move |scope| factory(scope))
            .pipeline_behavior(move |scope| pipeline_factory(scope))
    }

    pub fn command_behavior_filtered<B>(
        mut self,
        filter: BehaviorFilter,
        factory: impl Fn(&Scope) -> B + Send + Sync + 'static,
    ) -> Self
    where
        B: Behavior<()> + 'static,
    {
        let factory: Factory<dyn Behavior<()>> =
            Arc::new(move |scope: &Scope| Arc::new(factory(scope)) as Arc<dyn Behavior<()>>);
        self.registry.add_command_behavior(BehaviorRegistration::new(
            std::any::type_name::<B>(),
            filter,
            factory,
        ));
        self
    }

    pub fn pipeline_behavior_filtered<B>(
        mut self,
        filter: BehaviorFilter,
        factory: impl Fn(&Scope) -> B + Send + Sync + 'static,
    ) -> Self
    where
        B: Behavior<Response> + 'static,
    {
        let factory: Factory<dyn Behavior<Response>> =
            Arc::new(move |scope: &Scope| Arc::new(factory(scope)) as Arc<dyn Behavior<Response>>);
        self.registry.add_pipeline_behavior(BehaviorRegistration::new(
            std::any::type_name::<B>(),
            filter,
            factory,
        ));
        self
    }

    /// Freeze the registrations
    pub fn build(self) -> Mediator {
        tracing::debug!(
            behaviors = self.registry.behavior_count(),
            strategy = ?self.publish_strategy,
            "mediator built"
        );
        Mediator::new(self.registry, self.scopes, self.publish_strategy)
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_config_registers_enabled_behaviors() {
        let mut config = Config::default();
        config.mediator.publish_strategy = PublishStrategy::Spawned;
        config.behaviors.reject_cancelled = true;

        let mediator = MediatorBuilder::new().with_config(&config).build();

        assert_eq!(mediator.publish_strategy(), PublishStrategy::Spawned);
        // guard + logging + slow-request, each at both shapes
        assert_eq!(mediator.registry().behavior_count(), 6);
    }

    #[test]
    fn test_with_config_can_disable_everything() {
        let mut config = Config::default();
        config.behaviors.logging = false;
        config.behaviors.slow_request_threshold_ms = None;

        let mediator = MediatorBuilder::new().with_config(&config).build();
        assert_eq!(mediator.registry().behavior_count(), 0);
    }
}
