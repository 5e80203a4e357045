use crate::config::AppConfig;
use crate::errors::{AIError, GitError, ValidationError};
use crate::git::DiffResolver;
use crate::logging::OperationTimer;
use crate::ollama::{ReviewInvoker, ReviewReply};
use crate::types::review::has_git_metadata;
use crate::types::{DiffResult, ReviewOutcome, ReviewRequest, ReviewTimings};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use super::cancel::CancellationToken;
use super::progress::ProgressSink;

const EMPTY_FEEDBACK: &str = "AI review failed to generate feedback.";

/// Produces the diff a review is run on.
pub trait DiffSource: Send + Sync {
    fn resolve(
        &self,
        repo_path: &Path,
        base_ref: &str,
        target_ref: &str,
    ) -> Result<DiffResult, GitError>;
}

impl DiffSource for DiffResolver {
    fn resolve(
        &self,
        repo_path: &Path,
        base_ref: &str,
        target_ref: &str,
    ) -> Result<DiffResult, GitError> {
        DiffResolver::resolve(self, repo_path, base_ref, target_ref)
    }
}

/// Turns a diff into review feedback.
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    async fn review(
        &self,
        diff_text: &str,
        endpoint_url: &str,
        model_name: &str,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<ReviewReply, AIError>;
}

#[async_trait]
impl ReviewBackend for ReviewInvoker {
    async fn review(
        &self,
        diff_text: &str,
        endpoint_url: &str,
        model_name: &str,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<ReviewReply, AIError> {
        ReviewInvoker::review(self, diff_text, endpoint_url, model_name, cancel, progress).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    NoDiff,
    Cancelled,
    Failed,
}

impl RunState {
    fn from_outcome(outcome: &ReviewOutcome) -> Self {
        match outcome {
            ReviewOutcome::Completed { .. } => RunState::Completed,
            ReviewOutcome::NoDiff => RunState::NoDiff,
            ReviewOutcome::Cancelled => RunState::Cancelled,
            ReviewOutcome::Failed { .. } => RunState::Failed,
        }
    }
}

/// Exclusive claim on the orchestrator for one run.
///
/// Dropping it without [`RunGuard::finish`] (a panic, or an abandoned future)
/// leaves the state at `Failed` so the next run can start.
#[must_use = "a run that is never executed blocks further runs until dropped"]
pub struct RunGuard {
    state: Arc<Mutex<RunState>>,
    finished: bool,
}

impl RunGuard {
    fn finish(mut self, outcome: &ReviewOutcome) {
        *self.state.lock() = RunState::from_outcome(outcome);
        self.finished = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.lock() = RunState::Failed;
        }
    }
}

/// Runs one review at a time: validate, diff, ask the model.
///
/// Cancellation is checked before the diff, after it, before the model call
/// and after the model returns; the invoker polls it during the transfer.
pub struct Orchestrator<D = DiffResolver, R = ReviewInvoker> {
    diff_source: D,
    backend: R,
    state: Arc<Mutex<RunState>>,
}

impl Orchestrator<DiffResolver, ReviewInvoker> {
    pub fn from_config(config: &AppConfig) -> Self {
        Orchestrator::new(DiffResolver::new(), ReviewInvoker::from_app_config(config))
    }
}

impl<D: DiffSource, R: ReviewBackend> Orchestrator<D, R> {
    pub fn new(diff_source: D, backend: R) -> Self {
        Orchestrator {
            diff_source,
            backend,
            state: Arc::new(Mutex::new(RunState::Idle)),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Validates `request` and moves to `Running`.
    ///
    /// Nothing external runs on rejection and the state is left untouched.
    pub fn begin(&self, request: &ReviewRequest) -> Result<RunGuard, ValidationError> {
        request.validate()?;

        let mut state = self.state.lock();
        if *state == RunState::Running {
            return Err(ValidationError::AlreadyRunning);
        }
        *state = RunState::Running;
        tracing::info!(
            "Starting review of '{}' ({} -> {}) with model {}",
            request.repository_name(),
            request.source_ref,
            request.target_ref,
            request.model_name
        );

        Ok(RunGuard {
            state: Arc::clone(&self.state),
            finished: false,
        })
    }

    /// `begin` followed by `execute`.
    pub async fn run(
        &self,
        request: &ReviewRequest,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<ReviewOutcome, ValidationError> {
        let guard = self.begin(request)?;
        Ok(self.execute(guard, request, cancel, progress).await)
    }

    /// Carries a begun run to its terminal state.
    pub async fn execute(
        &self,
        guard: RunGuard,
        request: &ReviewRequest,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> ReviewOutcome {
        let outcome = self.drive(request, cancel, progress).await;

        match &outcome {
            ReviewOutcome::Failed { description, .. } => {
                tracing::error!("Review failed: {}", description);
                progress.status(format!("Error: {description}"));
            }
            ReviewOutcome::Cancelled => {
                tracing::info!("Review cancelled");
                progress.status("Review stopped.");
            }
            _ => {}
        }

        guard.finish(&outcome);
        outcome
    }

    async fn drive(
        &self,
        request: &ReviewRequest,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> ReviewOutcome {
        let total_timer = OperationTimer::new("review")
            .with_metadata("repository", &request.repository_name())
            .with_metadata("model", &request.model_name);

        progress.progress(5);
        progress.status("Generating diff...");
        if cancel.is_cancelled() {
            return ReviewOutcome::Cancelled;
        }
        if !has_git_metadata(&request.repository_path) {
            return ReviewOutcome::failed(format!(
                "The path '{}' is no longer a Git repository.",
                request.repository_path.display()
            ));
        }

        let diff_timer = OperationTimer::new("diff");
        let diff = match self.diff_source.resolve(
            &request.repository_path,
            &request.target_ref,
            &request.source_ref,
        ) {
            Ok(diff) => diff,
            Err(err) => return ReviewOutcome::failed(err.to_string()),
        };
        let diff_elapsed = diff_timer.finish();

        if cancel.is_cancelled() {
            return ReviewOutcome::Cancelled;
        }
        if diff.is_empty {
            progress.progress(100);
            progress.status(format!(
                "No changes found between '{}' and '{}'.",
                request.target_ref, request.source_ref
            ));
            return ReviewOutcome::NoDiff;
        }

        progress.progress(35);
        progress.status(format!(
            "Diff ready: {} lines, {} characters ({:.2}s)",
            diff.line_count(),
            diff.char_count(),
            diff_elapsed.as_secs_f64()
        ));

        if cancel.is_cancelled() {
            return ReviewOutcome::Cancelled;
        }
        progress.progress(45);
        progress.status(format!("Requesting review from {}...", request.model_name));

        let ai_timer = OperationTimer::new("ai_review").with_metadata("model", &request.model_name);
        let reply = self
            .backend
            .review(
                &diff.text,
                &request.endpoint_url,
                &request.model_name,
                cancel,
                progress,
            )
            .await;
        let ai_elapsed = ai_timer.finish();

        if cancel.is_cancelled() {
            return ReviewOutcome::Cancelled;
        }

        match reply {
            Ok(ReviewReply::Cancelled) => ReviewOutcome::Cancelled,
            Ok(ReviewReply::Feedback { text, transfer }) => {
                progress.progress(90);
                if text.trim().is_empty() {
                    return ReviewOutcome::failed(EMPTY_FEEDBACK);
                }
                progress.progress(100);
                progress.status("Review complete.");
                ReviewOutcome::Completed {
                    feedback: text,
                    transfer,
                    timings: ReviewTimings {
                        diff: diff_elapsed,
                        ai: ai_elapsed,
                        total: total_timer.finish(),
                    },
                }
            }
            Err(AIError::EmptyResponse) => ReviewOutcome::failed(EMPTY_FEEDBACK),
            Err(err) => ReviewOutcome::Failed {
                description: err.to_string(),
                remediation: err.remediation(&request.endpoint_url, &request.model_name),
            },
        }
    }
}
