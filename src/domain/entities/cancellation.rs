//! Cooperative cancellation signal threaded through a dispatch

use std::sync::Arc;
use tokio::sync::watch;

use crate::application::errors::MediatorError;

/// Cancellation signal shared by a caller and every behavior/handler of one dispatch.
///
/// Cloning yields a handle to the same signal. The mediator never inspects it;
/// honoring it is up to behaviors and handlers.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Signal cancellation to every holder of this token
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Return `MediatorError::Cancelled` if cancellation was requested
    pub fn check(&self) -> Result<(), MediatorError> {
        if self.is_cancelled() {
            return Err(MediatorError::Cancelled);
        }
        Ok(())
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
