//! Handler registry - Immutable lookup table compiled by `MediatorBuilder`

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::application::errors::MediatorError;
use crate::application::messaging::pipeline::{Behavior, DispatchResult, Response};
use crate::domain::entities::{CancellationToken, HandlerKey, MessageKind, Notification};
use crate::domain::traits::{HandlerResult, NotificationHandler};
use crate::infrastructure::scope::Scope;

/// Creates a handler (or behavior) instance inside a scope
pub type Factory<H> = Arc<dyn Fn(&Scope) -> Arc<H> + Send + Sync>;

/// Which messages a behavior registration applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorFilter {
    /// Every message dispatched on the behavior's shape
    Any,
    /// Only messages of one kind
    Kind(MessageKind),
    /// Only one concrete message type
    Message(TypeId),
}

impl BehaviorFilter {
    pub fn message<M: 'static>() -> Self {
        BehaviorFilter::Message(TypeId::of::<M>())
    }

    pub fn matches(&self, key: &HandlerKey) -> bool {
        match self {
            BehaviorFilter::Any => true,
            BehaviorFilter::Kind(kind) => *kind == key.kind,
            BehaviorFilter::Message(id) => *id == key.message,
        }
    }
}

struct HandlerRegistration {
    name: &'static str,
    factory: Box<dyn Any + Send + Sync>,
}

/// A behavior registered at one shape
pub struct BehaviorRegistration<T: Send + 'static> {
    pub name: &'static str,
    pub filter: BehaviorFilter,
    factory: Factory<dyn Behavior<T>>,
}

impl<T: Send + 'static> BehaviorRegistration<T> {
    pub fn new(name: &'static str, filter: BehaviorFilter, factory: Factory<dyn Behavior<T>>) -> Self {
        Self {
            name,
            filter,
            factory,
        }
    }
}

/// Notification listener with the notification type erased
pub trait ErasedListener: Send + Sync {
    fn handle<'a>(
        &'a self,
        notification: &'a (dyn Any + Send + Sync),
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, HandlerResult<()>>;
}

struct ListenerAdapter<N> {
    handler: Arc<dyn NotificationHandler<N>>,
    _notification: PhantomData<fn(&N)>,
}

impl<N: Notification> ErasedListener for ListenerAdapter<N> {
    fn handle<'a>(
        &'a self,
        notification: &'a (dyn Any + Send + Sync),
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, HandlerResult<()>> {
        Box::pin(async move {
            let Some(notification) = notification.downcast_ref::<N>() else {
                return Err(MediatorError::Internal(format!(
                    "listener for {} received a different notification type",
                    std::any::type_name::<N>()
                ))
                .into());
            };
            self.handler.handle(notification, cancel).await
        })
    }
}

struct ListenerRegistration {
    name: &'static str,
    factory: Factory<dyn ErasedListener>,
}

/// A listener instance resolved for one publish
#[derive(Clone)]
pub struct ResolvedListener {
    pub name: &'static str,
    pub listener: Arc<dyn ErasedListener>,
}

/// Lookup table for handlers, behaviors and notification listeners
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<HandlerKey, Vec<HandlerRegistration>>,
    command_behaviors: Vec<BehaviorRegistration<()>>,
    pipeline_behaviors: Vec<BehaviorRegistration<Response>>,
    listeners: HashMap<TypeId, Vec<ListenerRegistration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler factory under `key`. Duplicates are kept and reported at dispatch.
    pub fn add_handler<H: ?Sized + 'static>(
        &mut self,
        key: HandlerKey,
        name: &'static str,
        factory: Factory<H>,
    ) {
        let registrations = self.handlers.entry(key).or_default();
        if !registrations.is_empty() {
            tracing::warn!(%key, handler = name, "additional handler registered; dispatch will fail");
        }
        registrations.push(HandlerRegistration {
            name,
            factory: Box::new(factory),
        });
    }

    pub fn add_command_behavior(&mut self, registration: BehaviorRegistration<()>) {
        self.command_behaviors.push(registration);
    }

    pub fn add_pipeline_behavior(&mut self, registration: BehaviorRegistration<Response>) {
        self.pipeline_behaviors.push(registration);
    }

    pub fn add_listener<N: Notification>(
        &mut self,
        name: &'static str,
        factory: Factory<dyn NotificationHandler<N>>,
    ) {
        let erased: Factory<dyn ErasedListener> = Arc::new(move |scope: &Scope| {
            Arc::new(ListenerAdapter::<N> {
                handler: factory(scope),
                _notification: PhantomData,
            }) as Arc<dyn ErasedListener>
        });
        self.listeners
            .entry(TypeId::of::<N>())
            .or_default()
            .push(ListenerRegistration {
                name,
                factory: erased,
            });
    }

    /// Resolve the single handler for `key`
    pub fn resolve_handler<H: ?Sized + 'static>(
        &self,
        key: &HandlerKey,
        scope: &Scope,
    ) -> DispatchResult<Arc<H>> {
        let registrations = self.handlers.get(key).map(Vec::as_slice).unwrap_or_default();

        let registration = match registrations {
            [] => return Err(MediatorError::HandlerNotFound { key: *key }),
            [single] => single,
            many => {
                return Err(MediatorError::MultipleHandlers {
                    key: *key,
                    count: many.len(),
                })
            }
        };

        let factory = registration
            .factory
            .downcast_ref::<Factory<H>>()
            .ok_or_else(|| {
                MediatorError::Internal(format!(
                    "handler {} registered for {} has an unexpected shape",
                    registration.name, key
                ))
            })?;

        tracing::trace!(%key, handler = registration.name, scope = %scope.id(), "handler resolved");
        Ok(factory(scope))
    }

    /// No-response-shape behaviors matching `key`, in registration order
    pub fn resolve_command_behaviors(
        &self,
        key: &HandlerKey,
        scope: &Scope,
    ) -> Vec<Arc<dyn Behavior<()>>> {
        resolve_behaviors(&self.command_behaviors, key, scope)
    }

    /// Response-shape behaviors matching `key`, in registration order
    pub fn resolve_pipeline_behaviors(
        &self,
        key: &HandlerKey,
        scope: &Scope,
    ) -> Vec<Arc<dyn Behavior<Response>>> {
        resolve_behaviors(&self.pipeline_behaviors, key, scope)
    }

    /// Every listener registered for the notification in `key`
    pub fn resolve_listeners(&self, key: &HandlerKey, scope: &Scope) -> Vec<ResolvedListener> {
        self.listeners
            .get(&key.message)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|registration| ResolvedListener {
                        name: registration.name,
                        listener: (registration.factory)(scope),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of handlers registered under `key`
    pub fn handler_count(&self, key: &HandlerKey) -> usize {
        self.handlers.get(key).map(Vec::len).unwrap_or(0)
    }

    pub fn listener_count(&self, key: &HandlerKey) -> usize {
        self.listeners.get(&key.message).map(Vec::len).unwrap_or(0)
    }

    pub fn behavior_count(&self) -> usize {
        self.command_behaviors.len() + self.pipeline_behaviors.len()
    }
}

fn resolve_behaviors<T: Send + 'static>(
    registrations: &[BehaviorRegistration<T>],
    key: &HandlerKey,
    scope: &Scope,
) -> Vec<Arc<dyn Behavior<T>>> {
    let behaviors: Vec<_> = registrations
        .iter()
        .filter(|registration| registration.filter.matches(key))
        .map(|registration| (registration.factory)(scope))
        .collect();
    tracing::trace!(%key, count = behaviors.len(), "behaviors resolved");
    behaviors
}
