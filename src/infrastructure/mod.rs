//! Infrastructure layer - Concrete collaborators of the dispatcher
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Registry: Handler, behavior and listener lookup
//! - Scope: Per-dispatch resolution scopes

pub mod config;
pub mod registry;
pub mod scope;
