//! Built-in behaviors

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::pipeline::{Behavior, DispatchResult, Next, Request};
use crate::application::errors::MediatorError;
use crate::domain::entities::CancellationToken;

/// Logging behavior for debugging
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBehavior;

#[async_trait]
impl<T: Send + 'static> Behavior<T> for LoggingBehavior {
    async fn handle(
        &self,
        request: &Request<'_>,
        next: Next<'_, T>,
        _cancel: &CancellationToken,
    ) -> DispatchResult<T> {
        tracing::debug!("[{}] Handling {}", request.kind(), request.message_name());

        let result = next.run().await;

        match &result {
            Ok(_) => {
                tracing::debug!("[{}] Handled {}", request.kind(), request.message_name());
            }
            Err(e) => {
                tracing::warn!("[{}] {} failed: {}", request.kind(), request.message_name(), e);
            }
        }

        result
    }
}

/// Warns when the rest of the chain takes longer than a threshold
#[derive(Debug, Clone, Copy)]
pub struct SlowRequestBehavior {
    threshold: Duration,
}

impl SlowRequestBehavior {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn from_millis(threshold_ms: u64) -> Self {
        Self::new(Duration::from_millis(threshold_ms))
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

#[async_trait]
impl<T: Send + 'static> Behavior<T> for SlowRequestBehavior {
    async fn handle(
        &self,
        request: &Request<'_>,
        next: Next<'_, T>,
        _cancel: &CancellationToken,
    ) -> DispatchResult<T> {
        let started = Instant::now();
        let result = next.run().await;
        let elapsed = started.elapsed();

        if elapsed > self.threshold {
            tracing::warn!(
                message = request.message_name(),
                kind = %request.kind(),
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.threshold.as_millis() as u64,
                "slow request"
            );
        }

        result
    }
}

/// Short-circuits with `Cancelled` when the token is already cancelled on entry
#[derive(Debug, Default, Clone, Copy)]
pub struct CancellationGuardBehavior;

#[async_trait]
impl<T: Send + 'static> Behavior<T> for CancellationGuardBehavior {
    async fn handle(
        &self,
        request: &Request<'_>,
        next: Next<'_, T>,
        cancel: &CancellationToken,
    ) -> DispatchResult<T> {
        if cancel.is_cancelled() {
            tracing::debug!("[{}] {} rejected: cancelled", request.kind(), request.message_name());
            return Err(MediatorError::Cancelled);
        }
        next.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::pipeline::{compose, Response};
    use crate::domain::entities::{Command, HandlerKey, Query};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Ping;
    impl Command for Ping {}

    struct Total;
    impl Query for Total {
        type Response = u64;
    }

    fn unit_terminal(called: &AtomicBool) -> Next<'_, ()> {
        Next::new(move || {
            Box::pin(async move {
                called.store(true, Ordering::SeqCst);
                Ok::<(), MediatorError>(())
            })
        })
    }

    #[tokio::test]
    async fn test_cancellation_guard_blocks_cancelled_requests() {
        let called = AtomicBool::new(false);
        let ping = Ping;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let behaviors: Vec<Arc<dyn Behavior<()>>> = vec![Arc::new(CancellationGuardBehavior)];
        let result = compose(
            Request::new(&ping, HandlerKey::command::<Ping>()),
            behaviors,
            &cancel,
            unit_terminal(&called),
        )
        .run()
        .await;

        assert!(matches!(result, Err(MediatorError::Cancelled)));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_logging_and_timing_pass_responses_through() {
        let total = Total;
        let cancel = CancellationToken::new();
        let behaviors: Vec<Arc<dyn Behavior<Response>>> = vec![
            Arc::new(LoggingBehavior),
            Arc::new(SlowRequestBehavior::from_millis(0)),
            Arc::new(CancellationGuardBehavior),
        ];
        let terminal = Next::new(|| Box::pin(async { Ok::<Response, MediatorError>(Response::new(42u64)) }));

        let response = compose(
            Request::new(&total, HandlerKey::query::<Total>()),
            behaviors,
            &cancel,
            terminal,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(response.downcast::<u64>().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_logging_passes_errors_through() {
        let ping = Ping;
        let cancel = CancellationToken::new();
        let behaviors: Vec<Arc<dyn Behavior<()>>> = vec![Arc::new(LoggingBehavior)];
        let terminal = Next::new(|| {
            Box::pin(async { Err::<(), MediatorError>(MediatorError::fault("boom")) })
        });

        let err = compose(
            Request::new(&ping, HandlerKey::command::<Ping>()),
            behaviors,
            &cancel,
            terminal,
        )
        .run()
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "boom");
    }
}
