//! Notification fan-out - Runs every listener and aggregates failures

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::application::errors::{AggregateError, ListenerFailure, MediatorError};
use crate::domain::entities::{CancellationToken, HandlerKey};
use crate::domain::traits::{HandlerError, HandlerResult};
use crate::infrastructure::config::PublishStrategy;
use crate::infrastructure::registry::ResolvedListener;

/// Invoke every listener and wait for all of them.
///
/// Fails with `MediatorError::Aggregate` listing every listener that failed.
pub async fn fan_out(
    key: &HandlerKey,
    notification: Arc<dyn Any + Send + Sync>,
    listeners: Vec<ResolvedListener>,
    cancel: &CancellationToken,
    strategy: PublishStrategy,
) -> Result<(), MediatorError> {
    if listeners.is_empty() {
        tracing::trace!(%key, "no listeners");
        return Ok(());
    }

    let outcomes = match strategy {
        PublishStrategy::Concurrent => concurrent(notification.as_ref(), &listeners, cancel).await,
        PublishStrategy::Spawned => spawned(notification, &listeners, cancel).await,
    };

    let failures: Vec<ListenerFailure> = listeners
        .iter()
        .zip(outcomes)
        .filter_map(|(listener, outcome)| {
            outcome.err().map(|error| ListenerFailure {
                listener: listener.name,
                error,
            })
        })
        .collect();

    if failures.is_empty() {
        return Ok(());
    }

    tracing::debug!(%key, failed = failures.len(), total = listeners.len(), "listeners failed");
    Err(AggregateError {
        notification: key.message_name,
        failures,
    }
    .into())
}

async fn concurrent(
    notification: &(dyn Any + Send + Sync),
    listeners: &[ResolvedListener],
    cancel: &CancellationToken,
) -> Vec<HandlerResult<()>> {
    let futures = listeners.iter().map(|resolved| async move {
        AssertUnwindSafe(resolved.listener.handle(notification, cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panicked(payload)))
    });
    join_all(futures).await
}

/// Aborts listener tasks still running when the publish future is dropped
struct ListenerTasks(Vec<JoinHandle<HandlerResult<()>>>);

impl Drop for ListenerTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

async fn spawned(
    notification: Arc<dyn Any + Send + Sync>,
    listeners: &[ResolvedListener],
    cancel: &CancellationToken,
) -> Vec<HandlerResult<()>> {
    let mut tasks = ListenerTasks(
        listeners
            .iter()
            .map(|resolved| {
                let listener = resolved.listener.clone();
                let notification = notification.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { listener.handle(notification.as_ref(), &cancel).await })
            })
            .collect(),
    );

    join_all(tasks.0.iter_mut())
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(panicked(e.into_panic())),
            Err(e) => Err(Box::new(e) as HandlerError),
        })
        .collect()
}

fn panicked(payload: Box<dyn Any + Send>) -> HandlerError {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("listener panicked: {}", message).into()
}
