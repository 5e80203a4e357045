use crate::errors::{map_command_error, GitError};
use crate::types::general::CommandOutput;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Runs the system `git` binary inside one repository.
///
/// Every invocation sets the child's working directory explicitly; the
/// process-wide current directory is never touched.
#[derive(Debug, Clone)]
pub struct GitOps {
    repository_path: PathBuf,
}

impl GitOps {
    pub fn new(repository_path: impl AsRef<Path>) -> Self {
        Self {
            repository_path: repository_path.as_ref().to_path_buf(),
        }
    }

    /// Executes `git <args>` and captures its output regardless of exit status.
    pub fn execute(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        let cmd_str = format!("git {}", args.join(" "));
        tracing::debug!(
            repository = %self.repository_path.display(),
            "Running {}",
            cmd_str
        );

        let output = Command::new("git")
            .current_dir(&self.repository_path)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| GitError::Spawn(cmd_str.clone(), e))?;

        Ok(CommandOutput::from_output(output))
    }

    /// Executes `git <args>`, mapping a non-zero exit status to `GitError::CommandFailed`.
    pub fn execute_checked(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        let output = self.execute(args)?;
        if !output.is_success() {
            let cmd_str = format!("git {}", args.join(" "));
            tracing::warn!("{} exited with {:?}", cmd_str, output.exit_code());
            return Err(map_command_error(&cmd_str, output));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_execute_runs_in_repository_directory() {
        let dir = TempDir::new().unwrap();
        let before = std::env::current_dir().unwrap();

        let git = GitOps::new(dir.path());
        let output = git.execute(&["--version"]).unwrap();

        assert!(output.is_success());
        assert!(output.stdout.contains("git version"));
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_execute_checked_maps_failure() {
        let dir = TempDir::new().unwrap();
        let git = GitOps::new(dir.path());

        let err = git
            .execute_checked(&["rev-parse", "--verify", "refs/heads/main"])
            .unwrap_err();
        match err {
            GitError::CommandFailed {
                command,
                status_code,
                ..
            } => {
                assert_eq!(command, "git rev-parse --verify refs/heads/main");
                assert!(status_code.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
