use async_trait::async_trait;

use crate::domain::entities::{CancellationToken, Command, Notification, Query, ResponseCommand};

/// Error returned by handlers and carried to the caller unchanged
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handler result
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Handles a command that produces no response
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: &C, cancel: &CancellationToken) -> HandlerResult<()>;
}

/// Handles a command that produces a response
#[async_trait]
pub trait ResponseCommandHandler<C: ResponseCommand>: Send + Sync {
    async fn handle(&self, command: &C, cancel: &CancellationToken) -> HandlerResult<C::Response>;
}

/// Handles a query
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: &Q, cancel: &CancellationToken) -> HandlerResult<Q::Response>;
}

/// Reacts to a notification; any number may be registered per notification type
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    async fn handle(&self, notification: &N, cancel: &CancellationToken) -> HandlerResult<()>;
}
