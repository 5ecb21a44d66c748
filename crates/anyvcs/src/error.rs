//! Error types shared by detection, the repository factory, and the drivers.
//!
//! Detection ambiguity and cross-validation mismatches always come back as a
//! specific variant; native command failures are wrapped exactly once with
//! their combined output preserved for diagnostics.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VcsError>;

#[derive(Error, Debug)]
pub enum VcsError {
    /// Neither the local path nor the remote URL carried enough signal to
    /// determine the VCS type.
    #[error("Cannot detect VCS")]
    CannotDetectVcs,

    /// The local checkout is managed by a different VCS than the one
    /// requested.
    #[error("Wrong VCS detected")]
    WrongVcs,

    /// The supplied remote does not match the remote configured in the
    /// existing local checkout.
    #[error("The remote does not match the VCS endpoint")]
    WrongRemote,

    /// The requested revision could not be resolved by the native tool.
    #[error("Revision unavailable")]
    RevisionUnavailable,

    /// A native VCS command failed. `output` holds the combined
    /// stdout/stderr of the command; `source` is set when the process could
    /// not be spawned at all.
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        output: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A remote handed to the URL resolver could not be parsed as a URL at
    /// all. Scheme-less remotes (ssh shorthand) are not this; they fail
    /// detection with [`VcsError::CannotDetectVcs`] instead.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl VcsError {
    /// Captured output of the failed native command, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            VcsError::CommandFailed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_strings() {
        assert_eq!(VcsError::CannotDetectVcs.to_string(), "Cannot detect VCS");
        assert_eq!(VcsError::WrongVcs.to_string(), "Wrong VCS detected");
        assert_eq!(
            VcsError::WrongRemote.to_string(),
            "The remote does not match the VCS endpoint"
        );
        assert_eq!(
            VcsError::RevisionUnavailable.to_string(),
            "Revision unavailable"
        );
    }

    #[test]
    fn test_command_failed_preserves_output() {
        let err = VcsError::CommandFailed {
            command: "git pull".to_string(),
            output: "fatal: no remote configured\n".to_string(),
            source: None,
        };
        assert_eq!(err.output(), Some("fatal: no remote configured\n"));
        assert_eq!(err.to_string(), "Command failed: git pull");
    }

    #[test]
    fn test_command_failed_empty_output() {
        let err = VcsError::CommandFailed {
            command: "git pull".to_string(),
            output: String::new(),
            source: None,
        };
        assert_eq!(err.output(), None);
    }
}
