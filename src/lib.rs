//! In-process mediator for commands, queries and notifications.
//!
//! Callers hand a message to a [`Mediator`]; it opens a [`Scope`], resolves the
//! single handler registered for the message's concrete type, wraps it in the
//! registered behaviors (first registered runs outermost) and runs the chain.
//! Notifications fan out to every listener, and all listener failures are
//! reported together.
//!
//! ```no_run
//! use async_trait::async_trait;
//! use mediator::{CancellationToken, HandlerResult, Mediator, Query, QueryHandler, Sender};
//!
//! struct Echo(String);
//! impl Query for Echo {
//!     type Response = String;
//! }
//!
//! struct EchoHandler;
//!
//! #[async_trait]
//! impl QueryHandler<Echo> for EchoHandler {
//!     async fn handle(&self, query: &Echo, _cancel: &CancellationToken) -> HandlerResult<String> {
//!         Ok(query.0.clone())
//!     }
//! }
//!
//! # async fn run() -> Result<(), mediator::MediatorError> {
//! let mediator = Mediator::builder()
//!     .query_handler::<Echo, _>(|_| EchoHandler)
//!     .build();
//! let reply = mediator.query(Echo("hi".into()), &CancellationToken::new()).await?;
//! assert_eq!(reply, "hi");
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::errors::{AggregateError, ConfigError, ListenerFailure, MediatorError};
pub use application::messaging::{
    compose, Behavior, CancellationGuardBehavior, CommandBehavior, DispatchResult, LoggingBehavior,
    Mediator, MediatorBuilder, Next, PipelineBehavior, Request, Response, Sender,
    SlowRequestBehavior,
};
pub use domain::entities::{
    AsAny, CancellationToken, Command, HandlerKey, MessageKind, Notification, Query, ResponseCommand,
};
pub use domain::traits::{
    CommandHandler, HandlerError, HandlerResult, NotificationHandler, QueryHandler,
    ResponseCommandHandler,
};
pub use infrastructure::config::{Config, PublishStrategy};
pub use infrastructure::registry::{BehaviorFilter, Registry};
pub use infrastructure::scope::{DefaultScopeFactory, Scope, ScopeFactory};
