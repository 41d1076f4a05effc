use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::file::error::{InputError, Result};
use crate::file::path::{FilePath, Origin};
use crate::restore::RestoreGitMap;
use crate::settings::Config;

/// Where the bytes of a [`FilePath`] live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Root the relative path is under. `None` when the origin's root is not
    /// configured (for example a fallback file without a fallback root).
    pub base_path: Option<PathBuf>,
    /// `/` separated path under `base_path` (or inside the commit tree).
    pub relative_path: String,
    /// Commit to read from. `None` means the live filesystem.
    pub commit: Option<String>,
}

impl ResolvedPath {
    /// The on-disk location, when there is a base path.
    pub fn physical_path(&self) -> Option<PathBuf> {
        self.base_path
            .as_ref()
            .map(|base| base.join(&self.relative_path))
    }
}

/// Responsible for mapping a logical [`FilePath`] to the root, relative
/// path and commit its content is read from.
///
/// Performs no I/O of its own beyond asking the restore map.
#[derive(Clone)]
pub struct Resolver {
    docset_path: PathBuf,
    fallback_path: Option<PathBuf>,
    config: Arc<Config>,
    restore_map: Arc<dyn RestoreGitMap>,
}

impl Resolver {
    pub fn new(
        docset_path: PathBuf,
        fallback_path: Option<PathBuf>,
        config: Arc<Config>,
        restore_map: Arc<dyn RestoreGitMap>,
    ) -> Self {
        Self {
            docset_path,
            fallback_path,
            config,
            restore_map,
        }
    }

    pub fn docset_path(&self) -> &Path {
        &self.docset_path
    }

    pub fn fallback_path(&self) -> Option<&Path> {
        self.fallback_path.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolve(&self, file: &FilePath) -> Result<ResolvedPath> {
        let commit = file.commit().map(str::to_string);
        match file.origin() {
            Origin::Default => Ok(ResolvedPath {
                base_path: Some(self.docset_path.clone()),
                relative_path: file.path().to_string(),
                commit,
            }),
            Origin::Fallback => Ok(ResolvedPath {
                base_path: self.fallback_path.clone(),
                relative_path: file.path().to_string(),
                commit,
            }),
            Origin::Dependency { name } => {
                let source = self
                    .config
                    .dependency(name)
                    .ok_or_else(|| InputError::UnknownDependency { name: name.clone() })?;
                let relative_path = dependency_relative_path(file.path(), name)
                    .ok_or_else(|| InputError::OutsideDependency {
                        file: file.to_string(),
                        name: name.clone(),
                    })?
                    .to_string();
                let restored = self.restore_map.resolve(source, true)?;

                // A commit pinned on the file wins over the dependency's own.
                let commit = commit.or(restored.commit);
                debug!(
                    "Resolved {file} to {relative_path} in {} at {commit:?}",
                    restored.path.display()
                );
                Ok(ResolvedPath {
                    base_path: Some(restored.path),
                    relative_path,
                    commit,
                })
            }
            Origin::Template => {
                let Some(source) = &self.config.template else {
                    return Ok(ResolvedPath {
                        base_path: None,
                        relative_path: file.path().to_string(),
                        commit,
                    });
                };
                let restored = self.restore_map.resolve(source, false)?;
                Ok(ResolvedPath {
                    base_path: Some(restored.path),
                    relative_path: file.path().to_string(),
                    commit,
                })
            }
        }
    }
}

/// Strip the `<dependency name>/` prefix a dependency file's docset path
/// carries. The bare name is the dependency root. Anything else is not in
/// the dependency.
pub(crate) fn dependency_relative_path<'a>(path: &'a str, name: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(name)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix('/')
}
