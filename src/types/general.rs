use std::process::ExitStatus;

/// Represents the output of a command execution
///
/// This structure captures the stdout, stderr, and exit status. Both streams
/// are decoded lossily so that non-UTF-8 bytes in a diff never abort a run.
#[derive(Debug)]
pub struct CommandOutput {
    /// Standard output from the command
    pub stdout: String,

    /// Standard error output from the command
    pub stderr: String,

    /// Exit status of the command
    pub status: ExitStatus,
}

impl CommandOutput {
    pub fn from_output(output: std::process::Output) -> Self {
        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        }
    }

    /// Returns true if the command executed successfully
    pub fn is_success(&self) -> bool {
        self.status.success()
    }

    /// Returns the exit code of the command, if available
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Returns stdout as trimmed, non-empty lines
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }
}
