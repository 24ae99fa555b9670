//! Application layer errors

use std::fmt;
use thiserror::Error;

use crate::domain::entities::HandlerKey;
use crate::domain::traits::HandlerError;

/// Dispatch errors
#[derive(Error, Debug)]
pub enum MediatorError {
    #[error("No handler registered for {key}")]
    HandlerNotFound { key: HandlerKey },

    #[error("{count} handlers registered for {key}, expected exactly one")]
    MultipleHandlers { key: HandlerKey, count: usize },

    #[error("Response type mismatch: expected {expected}, got {actual}")]
    ResponseType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Fault raised by a behavior or handler, passed through as-is
    #[error(transparent)]
    Fault(HandlerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediatorError {
    /// Wrap a behavior or handler fault
    pub fn fault(error: impl Into<HandlerError>) -> Self {
        MediatorError::Fault(error.into())
    }

    /// Wiring defects for the dispatched message itself: no handler or more than
    /// one handler. A nested dispatch failing this way inside a handler surfaces
    /// as a `Fault`.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MediatorError::HandlerNotFound { .. } | MediatorError::MultipleHandlers { .. }
        )
    }

    /// Borrow the underlying fault as a concrete error type
    pub fn downcast_fault_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            MediatorError::Fault(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<HandlerError> for MediatorError {
    fn from(error: HandlerError) -> Self {
        match error.downcast::<MediatorError>() {
            Ok(mediator) if mediator.is_configuration() => MediatorError::Fault(mediator),
            Ok(mediator) => *mediator,
            Err(other) => MediatorError::Fault(other),
        }
    }
}

/// A single listener failure during publish
#[derive(Debug)]
pub struct ListenerFailure {
    pub listener: &'static str,
    pub error: HandlerError,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.listener, self.error)
    }
}

/// Every listener failure from one publish, not just the first
#[derive(Debug)]
pub struct AggregateError {
    pub notification: &'static str,
    pub failures: Vec<ListenerFailure>,
}

impl AggregateError {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListenerFailure> {
        self.failures.iter()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} listener(s) failed for {}",
            self.failures.len(),
            self.notification
        )?;
        for failure in &self.failures {
            write!(f, "\n  - {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
