//! Application layer - Dispatch orchestration
//! 
//! This layer contains:
//! - Errors: Dispatch and configuration errors
//! - Messaging: Behavior pipeline, dispatcher, notification fan-out

pub mod errors;
pub mod messaging;
