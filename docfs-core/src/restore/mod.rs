//! Locating restored dependency and template repositories.
//!
//! Restoring (cloning, fetching, checking out) happens before a build starts
//! and is not done here. This module only answers "where did the source end
//! up, and which commit should be read from it".

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// A git source for a dependency or template, as written in the config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl SourceDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}#{}", self.url, branch),
            None => write!(f, "{}", self.url),
        }
    }
}

/// Where a source was restored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredSource {
    pub path: PathBuf,
    /// Commit to read files from, or `None` when the source is a checked-out
    /// working tree read from the live filesystem.
    pub commit: Option<String>,
}

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("{source_descriptor} has not been restored")]
    NotRestored { source_descriptor: String },

    #[error("failed to read restored repository {}: {message}", path.display())]
    Repository { path: PathBuf, message: String },
}

/// Maps dependency and template sources to their restored location.
///
/// Results must be stable for the lifetime of a build; callers may resolve
/// the same source repeatedly.
pub trait RestoreGitMap: Send + Sync {
    fn resolve(
        &self,
        source: &SourceDescriptor,
        is_dependency: bool,
    ) -> Result<RestoredSource, RestoreError>;
}

/// Restore map for builds with nothing restored.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyRestoreMap;

impl RestoreGitMap for EmptyRestoreMap {
    fn resolve(
        &self,
        source: &SourceDescriptor,
        _is_dependency: bool,
    ) -> Result<RestoredSource, RestoreError> {
        Err(RestoreError::NotRestored {
            source_descriptor: source.to_string(),
        })
    }
}

/// Finds restored repositories under a single root directory.
///
/// Each source lives in `root/<name>-<hash>` where `name` is the last url
/// segment and `hash` is a prefix of the url's sha256. Bare repositories are
/// read at the tip of the configured branch (or `HEAD`); working-tree
/// checkouts are read from disk.
#[derive(Debug, Clone)]
pub struct DirectoryRestoreMap {
    root: PathBuf,
}

impl DirectoryRestoreMap {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a source is restored into.
    pub fn repository_path(&self, source: &SourceDescriptor) -> PathBuf {
        self.root.join(repository_dir_name(&source.url))
    }
}

impl RestoreGitMap for DirectoryRestoreMap {
    fn resolve(
        &self,
        source: &SourceDescriptor,
        is_dependency: bool,
    ) -> Result<RestoredSource, RestoreError> {
        let path = self.repository_path(source);
        if !path.is_dir() {
            return Err(RestoreError::NotRestored {
                source_descriptor: source.to_string(),
            });
        }

        let repository_error = |e: git2::Error| RestoreError::Repository {
            path: path.clone(),
            message: e.message().to_string(),
        };

        let repository = git2::Repository::open(&path).map_err(repository_error)?;
        if !repository.is_bare() {
            debug!(
                "Resolved {source} to working tree {} (dependency: {is_dependency})",
                path.display()
            );
            return Ok(RestoredSource { path, commit: None });
        }

        let spec = match &source.branch {
            Some(branch) => format!("refs/heads/{branch}"),
            None => "HEAD".to_string(),
        };
        let commit = repository
            .revparse_single(&spec)
            .and_then(|object| object.peel_to_commit())
            .map_err(repository_error)?
            .id()
            .to_string();

        debug!(
            "Resolved {source} to {} at {commit} (dependency: {is_dependency})",
            path.display()
        );
        Ok(RestoredSource {
            path,
            commit: Some(commit),
        })
    }
}

fn repository_dir_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let name = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed)
        .trim_end_matches(".git");
    let name: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    format!("{name}-{}", &digest[..12])
}
