//! Domain layer - Message taxonomy and handler contracts
//! 
//! This layer contains:
//! - Entities: Message marker traits, dispatch keys, cancellation
//! - Traits: Handler abstractions implemented by application code

pub mod entities;
pub mod traits;
