use crate::errors::ValidationError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ref name accepted in place of a local branch.
pub const HEAD_REF: &str = "HEAD";

/// One user-triggered review. Immutable for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub repository_path: PathBuf,
    /// Ref carrying the new changes (usually `HEAD` or a feature branch).
    pub source_ref: String,
    /// Branch the changes would land on; the diff shows what `source_ref` adds on top of it.
    pub target_ref: String,
    pub endpoint_url: String,
    pub model_name: String,
}

impl ReviewRequest {
    /// Checks every field before a run may start.
    ///
    /// The first failing field is reported; no external command is run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.repository_path.as_os_str().is_empty() {
            return Err(ValidationError::MissingRepositoryPath);
        }
        if !self.repository_path.is_dir() {
            return Err(ValidationError::RepositoryNotFound(
                self.repository_path.clone(),
            ));
        }
        if !has_git_metadata(&self.repository_path) {
            return Err(ValidationError::NotAGitRepository(
                self.repository_path.clone(),
            ));
        }
        if self.source_ref.trim().is_empty() {
            return Err(ValidationError::RefNotSelected("source"));
        }
        if self.target_ref.trim().is_empty() {
            return Err(ValidationError::RefNotSelected("target"));
        }
        if self.endpoint_url.trim().is_empty() {
            return Err(ValidationError::MissingEndpoint);
        }
        if self.model_name.trim().is_empty() {
            return Err(ValidationError::MissingModel);
        }
        Ok(())
    }

    /// Last path component, used in report headers.
    pub fn repository_name(&self) -> String {
        self.repository_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.repository_path.display().to_string())
    }
}

/// True when `path/.git` exists, either as a directory or as a worktree link file.
pub fn has_git_metadata(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Diff text between the merge base and the target ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub text: String,
    pub is_empty: bool,
}

impl DiffResult {
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().to_string();
        let is_empty = text.is_empty();
        DiffResult { text, is_empty }
    }

    pub fn line_count(&self) -> usize {
        if self.is_empty {
            0
        } else {
            self.text.lines().count()
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// How the feedback text was obtained from the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Streaming,
    Blocking,
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferMode::Streaming => write!(f, "streaming"),
            TransferMode::Blocking => write!(f, "non-streaming"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewTimings {
    pub diff: Duration,
    pub ai: Duration,
    pub total: Duration,
}

/// Terminal result of one review run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Completed {
        feedback: String,
        transfer: TransferMode,
        timings: ReviewTimings,
    },
    NoDiff,
    Cancelled,
    Failed {
        description: String,
        remediation: Option<String>,
    },
}

impl ReviewOutcome {
    pub fn failed(description: impl Into<String>) -> Self {
        ReviewOutcome::Failed {
            description: description.into(),
            remediation: None,
        }
    }

    /// Short status indicator for the end of a run.
    pub fn status_label(&self) -> &'static str {
        match self {
            ReviewOutcome::Completed { .. } => "Complete",
            ReviewOutcome::NoDiff => "No changes found",
            ReviewOutcome::Cancelled => "Stopped",
            ReviewOutcome::Failed { .. } => "Failed",
        }
    }
}
