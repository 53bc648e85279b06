use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GitkitError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Include,
    Exclude,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKind::Include => f.write_str("include"),
            PatternKind::Exclude => f.write_str("exclude"),
        }
    }
}

#[derive(Error, Debug)]
pub enum GitkitError {
    #[error("Malformed input: {line:?}")]
    MalformedInput { line: String },
    #[error("Error in {kind} pattern: {pattern}\nMessage: {message}")]
    InvalidPattern {
        kind: PatternKind,
        pattern: String,
        message: String,
    },
    #[error("Invalid git repo: {}", .path.display())]
    InvalidRepository { path: PathBuf },
    #[error("Directory not found: {}", .path.display())]
    DirectoryNotFound { path: PathBuf },
    #[error("Failed to run `{command}`: {source}")]
    GitSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{}", .stderr.trim_end())]
    GitStderr { command: String, stderr: String },
    #[error("`{command}` exited with {}", exit_description(.code))]
    GitStatus { command: String, code: Option<i32> },
    #[error("`{command}` did not finish within {}", wait_description(.timeout))]
    GitTimeout { command: String, timeout: Duration },
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

fn wait_description(timeout: &Duration) -> String {
    humantime::format_duration(*timeout).to_string()
}

impl GitkitError {
    pub fn malformed(line: &str) -> Self {
        GitkitError::MalformedInput {
            line: line.to_string(),
        }
    }

    /// True for failures that came back from the git process itself.
    pub fn is_git_failure(&self) -> bool {
        matches!(
            self,
            GitkitError::GitSpawn { .. }
                | GitkitError::GitStderr { .. }
                | GitkitError::GitStatus { .. }
                | GitkitError::GitTimeout { .. }
        )
    }

    /// True when the reader of our output went away.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, GitkitError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_closed_output_counts_as_broken_pipe() {
        let closed = GitkitError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        let denied = GitkitError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(closed.is_broken_pipe());
        assert!(!denied.is_broken_pipe());
        assert!(!GitkitError::malformed("x").is_broken_pipe());
    }
}
