//! Domain entities - Messages and the values that travel with them

pub mod cancellation;
pub mod message;

pub use cancellation::CancellationToken;
pub use message::{AsAny, Command, HandlerKey, MessageKind, Notification, Query, ResponseCommand};
