//! git::reader
//!
//! Blob and tree reads by commit using git2.
//!
//! Repositories are opened with `git2::Repository::open`, which accepts bare
//! repositories as well as working-tree checkouts. Nothing here ever needs a
//! working directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from git object reads.
#[derive(Debug, Error)]
pub enum GitError {
    /// The base path is not a git repository.
    #[error("not a git repository: {}", path.display())]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// The commit identifier does not name a commit in the repository.
    #[error("commit not found: {commit}")]
    CommitNotFound {
        /// The commit identifier as given
        commit: String,
    },

    /// The commit identifier is malformed.
    #[error("invalid commit id: {commit}")]
    InvalidCommit {
        /// The commit identifier as given
        commit: String,
    },

    /// Any other git2 failure.
    #[error("git error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl GitError {
    fn from_git2(err: git2::Error, commit: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::CommitNotFound {
                commit: commit.to_string(),
            },
            git2::ErrorCode::InvalidSpec | git2::ErrorCode::Ambiguous => GitError::InvalidCommit {
                commit: commit.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", commit, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// Reads files out of git object storage.
///
/// Implementations must work on bare repositories.
pub trait GitObjectReader: Send + Sync {
    /// Read the blob at `path` in the tree of `commit`.
    ///
    /// Returns `Ok(None)` when the commit exists but has no file at `path`.
    fn read_bytes(
        &self,
        repo: &Path,
        path: &str,
        commit: &str,
    ) -> Result<Option<Vec<u8>>, GitError>;

    /// List every file in the tree of `commit`, as `/` separated paths
    /// relative to the repository root.
    fn list_tree(&self, repo: &Path, commit: &str) -> Result<Vec<String>, GitError>;
}

/// [`GitObjectReader`] backed by libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2ObjectReader;

impl Git2ObjectReader {
    pub fn new() -> Self {
        Self
    }

    fn open(repo: &Path) -> Result<git2::Repository, GitError> {
        git2::Repository::open(repo).map_err(|_| GitError::NotARepo {
            path: repo.to_path_buf(),
        })
    }

    fn commit_tree<'r>(
        repo: &'r git2::Repository,
        commit: &str,
    ) -> Result<git2::Tree<'r>, GitError> {
        let object = repo
            .revparse_single(commit)
            .map_err(|e| GitError::from_git2(e, commit))?;
        let commit_object = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, commit))?;
        commit_object
            .tree()
            .map_err(|e| GitError::from_git2(e, commit))
    }
}

impl GitObjectReader for Git2ObjectReader {
    fn read_bytes(
        &self,
        repo: &Path,
        path: &str,
        commit: &str,
    ) -> Result<Option<Vec<u8>>, GitError> {
        let repository = Self::open(repo)?;
        let tree = Self::commit_tree(&repository, commit)?;

        // The tree root is not a file.
        if path.trim_matches('/').is_empty() {
            return Ok(None);
        }

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Directories and submodule links are not files.
        if entry.kind() != Some(git2::ObjectType::Blob) {
            return Ok(None);
        }

        let blob = repository.find_blob(entry.id())?;
        debug!(
            "Read {} bytes for {path} at {commit} from {}",
            blob.size(),
            repo.display()
        );
        Ok(Some(blob.content().to_vec()))
    }

    fn list_tree(&self, repo: &Path, commit: &str) -> Result<Vec<String>, GitError> {
        let repository = Self::open(repo)?;
        let tree = Self::commit_tree(&repository, commit)?;

        let mut paths = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                match entry.name() {
                    Some(name) => paths.push(format!("{root}{name}")),
                    None => tracing::warn!("Skipping non UTF-8 tree entry under '{root}'"),
                }
            }
            git2::TreeWalkResult::Ok
        })?;

        paths.sort();
        Ok(paths)
    }
}
