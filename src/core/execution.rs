// src/core/execution.rs

use thiserror::Error;

/// A failure raised by the handler body during invocation, wrapped with the
/// command's qualified name. Never retried, never message-rendered by the
/// engine.
#[derive(Error, Debug)]
#[error("An error occurred while executing the command '{parent_name} {name}': {source}")]
pub struct CommandExecutionError {
    /// Name of the parent command ("" for root commands).
    pub parent_name: String,
    /// Name of the command whose handler failed.
    pub name: String,
    /// The original cause, preserved.
    #[source]
    pub source: anyhow::Error,
}

/// The fully resolved invocation, ready to run.
pub type ExecutionTask = Box<dyn FnOnce() -> Result<(), CommandExecutionError> + Send + 'static>;

/// Abstracts synchronous vs. asynchronous invocation of a resolved handler.
/// Selected per command at registration time.
pub trait ExecutionProvider: Send + Sync {
    /// Runs the task. Synchronous providers return the handler's failure to
    /// the dispatching caller; asynchronous providers return immediately and
    /// report failures out-of-band.
    fn execute(&self, task: ExecutionTask) -> Result<(), CommandExecutionError>;
}

/// Invokes the handler on the dispatching thread, blocking it for the
/// duration of the handler body.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncExecution;

impl ExecutionProvider for SyncExecution {
    fn execute(&self, task: ExecutionTask) -> Result<(), CommandExecutionError> {
        task()
    }
}

/// Hands the invocation off to a tokio worker pool. No ordering guarantee
/// exists between two asynchronous invocations, and there is no built-in
/// cancellation or timeout; a handler that never returns occupies its worker
/// indefinitely.
#[derive(Debug, Clone)]
pub struct AsyncExecution {
    handle: tokio::runtime::Handle,
}

impl AsyncExecution {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Binds to the runtime of the current context. Panics outside a tokio
    /// runtime, so embedders should prefer [`AsyncExecution::new`] during
    /// startup wiring.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl ExecutionProvider for AsyncExecution {
    fn execute(&self, task: ExecutionTask) -> Result<(), CommandExecutionError> {
        // The invocation outlives this call; failures cannot flow back to
        // the dispatching caller and are reported through the log instead.
        self.handle.spawn_blocking(move || {
            if let Err(error) = task() {
                log::error!("{}", error);
            }
        });
        Ok(())
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };
    use std::time::Duration;

    #[test]
    fn test_sync_execution_runs_inline() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let provider = SyncExecution;
        provider
            .execute(Box::new(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_sync_execution_propagates_handler_failure() {
        let provider = SyncExecution;
        let result = provider.execute(Box::new(|| {
            Err(CommandExecutionError {
                parent_name: "bank".to_string(),
                name: "pay".to_string(),
                source: anyhow!("insufficient funds"),
            })
        }));

        let error = result.unwrap_err();
        assert_eq!(error.name, "pay");
        assert!(error.to_string().contains("bank pay"));
        assert!(error.source.to_string().contains("insufficient funds"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_execution_hands_off() {
        let (tx, rx) = std::sync::mpsc::channel::<&'static str>();

        let provider = AsyncExecution::current();
        provider
            .execute(Box::new(move || {
                tx.send("ran").expect("receiver alive");
                Ok(())
            }))
            .unwrap();

        let received = tokio::task::spawn_blocking(move || {
            rx.recv_timeout(Duration::from_secs(5)).expect("task ran")
        })
        .await
        .unwrap();
        assert_eq!(received, "ran");
    }
}
