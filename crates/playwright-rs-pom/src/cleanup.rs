// Per-case cleanup stack
//
// Cleanup actions are registered when the data they undo is created and run
// when the case exits, whichever way it exits. Actions run in reverse
// registration order; every action is attempted even if an earlier one fails.

use crate::error::{Error, Result};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;

struct CleanupAction {
    label: String,
    action: BoxFuture<'static, Result<()>>,
}

/// A cleanup action that returned an error.
#[derive(Debug)]
pub struct CleanupFailure {
    pub label: String,
    pub error: Error,
}

/// LIFO stack of pending cleanup actions for one case.
#[derive(Default)]
pub struct CleanupStack {
    actions: Mutex<Vec<CleanupAction>>,
}

impl std::fmt::Debug for CleanupStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupStack")
            .field("pending", &self.len())
            .finish()
    }
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action`. It does not start until [`run`](Self::run).
    pub fn push<F>(&self, label: impl Into<String>, action: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let label = label.into();
        tracing::debug!(label, "Cleanup registered");
        self.actions.lock().push(CleanupAction {
            label,
            action: action.boxed(),
        });
    }

    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }

    /// Runs every pending action, most recent first, and returns the ones
    /// that failed. The stack is empty afterwards.
    pub async fn run(&self) -> Vec<CleanupFailure> {
        let pending = std::mem::take(&mut *self.actions.lock());
        let mut failures = Vec::new();
        for CleanupAction { label, action } in pending.into_iter().rev() {
            match action.await {
                Ok(()) => tracing::debug!(label, "Cleanup done"),
                Err(error) => {
                    tracing::warn!(label, %error, "Cleanup failed");
                    failures.push(CleanupFailure { label, error });
                }
            }
        }
        failures
    }
}
