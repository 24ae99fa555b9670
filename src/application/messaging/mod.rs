//! Message handling - Pipeline composition, dispatch and fan-out

pub mod behaviors;
pub mod builder;
pub mod dispatcher;
pub mod fanout;
pub mod pipeline;

pub use behaviors::{CancellationGuardBehavior, LoggingBehavior, SlowRequestBehavior};
pub use builder::MediatorBuilder;
pub use dispatcher::{Mediator, Sender};
pub use pipeline::{compose, Behavior, CommandBehavior, DispatchResult, Next, PipelineBehavior, Request, Response};
