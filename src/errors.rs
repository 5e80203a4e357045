use crate::types::general::CommandOutput;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Git command error: {0}")]
    Git(#[from] GitError),
    #[error("AI interaction error: {0}")]
    AI(#[from] AIError),
    #[error("Invalid review request: {0}")]
    Validation(#[from] ValidationError),
    #[error("I/O error while {0}: {1}")]
    IO(String, #[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to write to path '{0}': {1}")]
    FileWrite(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value for '{0}': {1}")]
    InvalidValue(String, String),
    #[error("Prompt template '{0}' does not contain the {{diff}} placeholder")]
    PromptPlaceholderMissing(String),
    #[error("Configuration file '{0}' already exists (use --force to overwrite)")]
    AlreadyExists(String),
}

/// Rejections raised before any external call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please provide a repository path.")]
    MissingRepositoryPath,
    #[error("The repository path '{}' does not exist or is not a directory.", .0.display())]
    RepositoryNotFound(PathBuf),
    #[error("The path '{}' does not appear to be a Git repository.", .0.display())]
    NotAGitRepository(PathBuf),
    #[error("Please select a valid {0} branch for comparison.")]
    RefNotSelected(&'static str),
    #[error("Please provide the Ollama endpoint URL.")]
    MissingEndpoint,
    #[error("Please provide the Ollama model name.")]
    MissingModel,
    #[error("A review is already running; stop it or wait for it to finish.")]
    AlreadyRunning,
}

#[derive(Debug)]
pub enum GitError {
    CommandFailed {
        command: String,
        status_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    RefNotFound(String),
    NoCommonAncestor {
        base: String,
        target: String,
    },
    NotARepository(PathBuf),
    Spawn(String, std::io::Error),
}

#[derive(Debug, Error)]
pub enum AIError {
    #[error("Could not connect to Ollama at {url}")]
    ConnectionRefused { url: String },
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error("Model '{model}' not found on the Ollama server")]
    ModelNotFound { model: String },
    #[error("Malformed response from Ollama: {0}")]
    MalformedResponse(String),
    #[error("Ollama responded with error {status}: {body}")]
    OtherHttpError {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Ollama reported an error while streaming: {0}")]
    Stream(String),
    #[error("Ollama request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("AI review failed to generate feedback.")]
    EmptyResponse,
}

impl AIError {
    /// Troubleshooting text shown under the error, if any applies.
    pub fn remediation(&self, api_url: &str, model: &str) -> Option<String> {
        match self {
            AIError::ConnectionRefused { .. } => Some(format!(
                "1. Ensure Ollama is installed and running locally\n\
                 2. Start Ollama by running: ollama serve\n\
                 3. Verify the model '{model}' has been downloaded: ollama pull {model}\n\
                 4. Check if Ollama is running: curl {}\n\
                 5. Check firewall settings if Ollama runs on a different machine",
                crate::ollama::client::version_url(api_url)
            )),
            AIError::Timeout { .. } => Some(
                "The AI model took too long to respond. \
                 Consider using a smaller model or check system resources."
                    .to_string(),
            ),
            AIError::ModelNotFound { .. } => Some(format!(
                "Download the model: ollama pull {model}\nList available models: ollama list"
            )),
            _ => None,
        }
    }
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::CommandFailed {
                command,
                status_code,
                stdout,
                stderr,
            } => {
                write!(f, "Git command '{}' failed", command)?;
                if let Some(c) = status_code {
                    write!(f, " with exit code {}", c)?;
                }
                if !stdout.is_empty() {
                    write!(f, "\nStdout:\n{}", stdout)?;
                }
                if !stderr.is_empty() {
                    write!(f, "\nStderr:\n{}", stderr)?;
                }
                Ok(())
            }
            GitError::RefNotFound(name) => write!(
                f,
                "Local branch '{}' not found. Please provide a local branch name.",
                name
            ),
            GitError::NoCommonAncestor { base, target } => write!(
                f,
                "Branches '{}' and '{}' have no common history (no merge base).",
                base, target
            ),
            GitError::NotARepository(path) => {
                write!(f, "'{}' is not a git repository.", path.display())
            }
            GitError::Spawn(command, e) => write!(f, "Failed to run '{}': {}", command, e),
        }
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitError::Spawn(_, e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IO("I/O operation failed".to_string(), err)
    }
}

/// Converts a captured `CommandOutput` into a `GitError::CommandFailed`.
///
/// `status_code` is `None` when the process was terminated by a signal.
pub fn map_command_error(cmd_str: &str, output: CommandOutput) -> GitError {
    GitError::CommandFailed {
        command: cmd_str.to_string(),
        status_code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    }
}
