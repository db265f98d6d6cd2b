//! Error types for InputBuilder.
//!
//! Library crates use [`InputBuilderError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all InputBuilder operations.
#[derive(Debug, thiserror::Error)]
pub enum InputBuilderError {
    /// The external tool ran but the expected artifact never appeared.
    #[error(
        "external tool failed to build inputs for '{directory}': {artifact:?} was not produced"
    )]
    ArtifactNotProduced {
        directory: String,
        artifact: PathBuf,
    },

    /// An artifact appeared but predates the tool invocation.
    #[error("artifact {artifact:?} in '{directory}' was not written by this run")]
    StaleArtifact {
        directory: String,
        artifact: PathBuf,
    },

    /// The external tool could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    ToolSpawn {
        command: String,
        source: std::io::Error,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid selection pattern or wait parameters.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, InputBuilderError>;

impl InputBuilderError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The example directory this error is attributed to, if any.
    pub fn directory(&self) -> Option<&str> {
        match self {
            Self::ArtifactNotProduced { directory, .. } | Self::StaleArtifact { directory, .. } => {
                Some(directory.as_str())
            }
            _ => None,
        }
    }
}
