//! Domain traits - Handler abstractions

pub mod handler;

pub use handler::{
    CommandHandler, HandlerError, HandlerResult, NotificationHandler, QueryHandler,
    ResponseCommandHandler,
};
