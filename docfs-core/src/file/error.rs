use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::git::GitError;
use crate::restore::RestoreError;

/// Errors surfaced by the resolver and the input facade.
#[derive(Error, Debug)]
pub enum InputError {
    /// The operation is not available for this kind of input. Always a
    /// programming or configuration error.
    #[error("{operation} is not supported for {input}")]
    Unsupported { operation: &'static str, input: String },

    /// A dependency file names a dependency the config does not declare.
    #[error("dependency '{name}' is not declared in the config")]
    UnknownDependency { name: String },

    /// A dependency file whose path does not start with `<name>/`.
    #[error("{file} is not under dependency '{name}'")]
    OutsideDependency { file: String, name: String },

    /// The file resolved to a git object that does not exist. The caller
    /// believed the file existed, so this is an invariant violation.
    #[error("file not found in git object storage: {file} (commit {commit})")]
    ObjectNotFound { file: String, commit: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file} is not valid UTF-8")]
    InvalidUtf8 { file: String },

    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    #[error(transparent)]
    Restore(#[from] RestoreError),

    /// Shared because a failed git read is cached and handed to every caller
    /// asking for the same file.
    #[error(transparent)]
    Git(#[from] Arc<GitError>),
}

impl InputError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors meaning "there is no such file" rather than "something
    /// went wrong while reading it".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ObjectNotFound { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T, E = InputError> = std::result::Result<T, E>;
