use crate::errors::AppError;
use crate::types::{ReviewOutcome, ReviewRequest};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use super::cancel::CancellationToken;
use super::orchestrator::{DiffSource, Orchestrator, ReviewBackend};
use super::progress::{ProgressSink, ReviewEvent};

/// A review running on its own thread.
///
/// `events` yields progress until the run ends; the channel closes when the
/// worker finishes, after which [`ReviewHandle::wait`] returns promptly.
pub struct ReviewHandle {
    pub events: UnboundedReceiver<ReviewEvent>,
    cancel: CancellationToken,
    thread: JoinHandle<ReviewOutcome>,
}

impl ReviewHandle {
    /// Asks the worker to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the worker without blocking the async runtime.
    pub async fn wait(self) -> ReviewOutcome {
        let thread = self.thread;
        tokio::task::spawn_blocking(move || thread.join())
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_else(|| ReviewOutcome::failed("The review worker stopped unexpectedly."))
    }
}

pub struct ReviewWorker;

impl ReviewWorker {
    /// Validates `request`, claims the orchestrator and starts the run on a
    /// dedicated thread with its own single-threaded runtime.
    ///
    /// Rejections (invalid request, a run already active) are returned here,
    /// before any thread is started.
    pub fn spawn<D, R>(
        orchestrator: Arc<Orchestrator<D, R>>,
        request: ReviewRequest,
    ) -> Result<ReviewHandle, AppError>
    where
        D: DiffSource + 'static,
        R: ReviewBackend + 'static,
    {
        let guard = orchestrator.begin(&request).map_err(AppError::from)?;

        let cancel = CancellationToken::new();
        let (tx, events) = unbounded_channel();
        let progress = ProgressSink::new(tx);

        let worker_cancel = cancel.clone();
        let thread = std::thread::Builder::new()
            .name("review-worker".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        tracing::error!("Failed to build the review runtime: {}", e);
                        return ReviewOutcome::failed(format!(
                            "Failed to start the review runtime: {e}"
                        ));
                    }
                };
                runtime.block_on(orchestrator.execute(guard, &request, &worker_cancel, &progress))
            })
            .map_err(|e| AppError::IO("starting the review worker".to_string(), e))?;

        Ok(ReviewHandle {
            events,
            cancel,
            thread,
        })
    }
}
