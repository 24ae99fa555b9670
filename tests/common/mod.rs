//! Shared test fixtures

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use mediator::{Behavior, CancellationToken, DispatchResult, Next, Request};

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Ordered record of what ran during a dispatch
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }
}

/// Records enter/exit around the rest of the chain; works at both shapes
pub struct RecordingBehavior {
    pub name: &'static str,
    pub log: CallLog,
}

#[async_trait]
impl<T: Send + 'static> Behavior<T> for RecordingBehavior {
    async fn handle(
        &self,
        _request: &Request<'_>,
        next: Next<'_, T>,
        _cancel: &CancellationToken,
    ) -> DispatchResult<T> {
        self.log.push(format!("{}-enter", self.name));
        let result = next.run().await;
        self.log.push(format!("{}-exit", self.name));
        result
    }
}
