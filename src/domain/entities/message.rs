use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Shape of a message, used together with its concrete type as the dispatch key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Command,
    ResponseCommand,
    Query,
    Notification,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Command => "command",
            MessageKind::ResponseCommand => "command",
            MessageKind::Query => "query",
            MessageKind::Notification => "notification",
        }
    }

    /// Whether messages of this kind produce a response
    pub fn has_response(&self) -> bool {
        matches!(self, MessageKind::ResponseCommand | MessageKind::Query)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime type access for type-erased messages.
///
/// Implemented for every `Send + Sync + 'static` type, so it never needs a
/// manual impl. Calls through `&dyn Notification` reach the concrete type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &(dyn Any + Send + Sync);

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A request to change state with no response
pub trait Command: Send + Sync + 'static {}

/// A request to change state that produces a response
pub trait ResponseCommand: Send + Sync + 'static {
    type Response: Send + 'static;
}

/// A read-only request that always produces a response
pub trait Query: Send + Sync + 'static {
    type Response: Send + 'static;
}

/// An event that already happened, broadcast to any number of listeners
pub trait Notification: AsAny {}

/// Identity of a registered handler: message shape, concrete message type and
/// (for response paths) response type
#[derive(Debug, Clone, Copy)]
pub struct HandlerKey {
    pub kind: MessageKind,
    pub message: TypeId,
    pub message_name: &'static str,
    pub response: Option<TypeId>,
    pub response_name: Option<&'static str>,
}

impl HandlerKey {
    pub fn command<C: Command>() -> Self {
        Self::untyped::<C>(MessageKind::Command)
    }

    pub fn response_command<C: ResponseCommand>() -> Self {
        Self::typed::<C, C::Response>(MessageKind::ResponseCommand)
    }

    pub fn query<Q: Query>() -> Self {
        Self::typed::<Q, Q::Response>(MessageKind::Query)
    }

    pub fn notification<N: Notification>() -> Self {
        Self::untyped::<N>(MessageKind::Notification)
    }

    /// Key for a notification known only at runtime
    pub fn dyn_notification(notification: &dyn Notification) -> Self {
        Self {
            kind: MessageKind::Notification,
            message: notification.as_any().type_id(),
            message_name: notification.type_name(),
            response: None,
            response_name: None,
        }
    }

    fn untyped<M: 'static>(kind: MessageKind) -> Self {
        Self {
            kind,
            message: TypeId::of::<M>(),
            message_name: std::any::type_name::<M>(),
            response: None,
            response_name: None,
        }
    }

    fn typed<M: 'static, R: 'static>(kind: MessageKind) -> Self {
        Self {
            kind,
            message: TypeId::of::<M>(),
            message_name: std::any::type_name::<M>(),
            response: Some(TypeId::of::<R>()),
            response_name: Some(std::any::type_name::<R>()),
        }
    }
}

impl PartialEq for HandlerKey {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message && self.response == other.response
    }
}

impl Eq for HandlerKey {}

impl std::hash::Hash for HandlerKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.message.hash(state);
        self.response.hash(state);
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.response_name {
            Some(response) => write!(f, "{} {} -> {}", self.kind, self.message_name, response),
            None => write!(f, "{} {}", self.kind, self.message_name),
        }
    }
}
