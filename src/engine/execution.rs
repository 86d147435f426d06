// SPDX-License-Identifier: MIT

//! Execution handle passed to every data source call

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

/// Cancellation-bearing handle for one pipeline run.
///
/// Clones share the same run id and cancellation signal, so a clone handed to
/// another task can stop the run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    run_id: Uuid,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            run_id: Uuid::new_v4(),
            cancel_tx: Arc::new(tx),
            cancel_rx: rx,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Signal cancellation to every clone of this handle
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Resolves once the run is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        // Sender is kept alive by `self`
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_handle_is_live() {
        let ectx = ExecutionContext::new();
        assert!(!ectx.is_cancelled());
        assert_ne!(ectx.run_id(), ExecutionContext::new().run_id());
    }

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let ectx = ExecutionContext::new();
        let clone = ectx.clone();
        clone.cancel();
        assert!(ectx.is_cancelled());
        assert_eq!(ectx.run_id(), clone.run_id());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let ectx = ExecutionContext::new();
        let waiter = ectx.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        ectx.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
