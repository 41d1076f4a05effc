use std::fs;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::file::cache::{Blob, BlobCache};
use crate::file::error::{InputError, Result};
use crate::file::path::{FilePath, Origin};
use crate::file::resolver::{ResolvedPath, Resolver};
use crate::git::{Git2ObjectReader, GitObjectReader};
use crate::restore::{EmptyRestoreMap, RestoreGitMap};
use crate::settings::Config;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read-only access to docset files, wherever their bytes live.
///
/// Live files are read straight from disk. Files pinned to a commit (and
/// files of bare dependency repositories) are read from git object storage
/// through a session wide [`BlobCache`]. One `InputManager` belongs to one
/// build session; clones share the same cache.
#[derive(Clone)]
pub struct InputManager {
    resolver: Resolver,
    git: Arc<dyn GitObjectReader>,
    cache: Arc<BlobCache>,
}

pub struct InputManagerBuilder {
    docset_path: PathBuf,
    fallback_path: Option<PathBuf>,
    config: Arc<Config>,
    restore_map: Arc<dyn RestoreGitMap>,
    git: Arc<dyn GitObjectReader>,
}

impl InputManagerBuilder {
    pub fn fallback_path(mut self, fallback_path: impl Into<PathBuf>) -> Self {
        self.fallback_path = Some(fallback_path.into());
        self
    }

    pub fn config(mut self, config: impl Into<Arc<Config>>) -> Self {
        self.config = config.into();
        self
    }

    pub fn restore_map(mut self, restore_map: Arc<dyn RestoreGitMap>) -> Self {
        self.restore_map = restore_map;
        self
    }

    pub fn git_reader(mut self, git: Arc<dyn GitObjectReader>) -> Self {
        self.git = git;
        self
    }

    pub fn build(self) -> InputManager {
        let resolver = Resolver::new(
            self.docset_path,
            self.fallback_path,
            self.config,
            self.restore_map,
        );
        InputManager {
            resolver,
            cache: Arc::new(BlobCache::new(self.git.clone())),
            git: self.git,
        }
    }
}

impl InputManager {
    pub fn builder(docset_path: impl Into<PathBuf>) -> InputManagerBuilder {
        InputManagerBuilder {
            docset_path: docset_path.into(),
            fallback_path: None,
            config: Arc::new(Config::default()),
            restore_map: Arc::new(EmptyRestoreMap),
            git: Arc::new(Git2ObjectReader::new()),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn config(&self) -> &Config {
        self.resolver.config()
    }

    /// Number of files read from git object storage so far.
    pub fn blob_cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Whether `file` exists. Files that cannot be resolved do not exist.
    pub fn exists(&self, file: &FilePath) -> bool {
        let resolved = match self.resolver.resolve(file) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Cannot resolve {file}: {e}");
                return false;
            }
        };
        let Some(base_path) = &resolved.base_path else {
            return false;
        };

        match &resolved.commit {
            None => base_path.join(&resolved.relative_path).is_file(),
            Some(commit) => {
                match self
                    .cache
                    .get_bytes(file, base_path, &resolved.relative_path, commit)
                {
                    Ok(bytes) => bytes.is_some(),
                    Err(e) => {
                        warn!("Cannot read {file} from git: {e}");
                        false
                    }
                }
            }
        }
    }

    /// The on-disk path of `file`, if it has one.
    ///
    /// Files that only exist as git objects have no physical path, even
    /// though [`InputManager::exists`] reports them.
    pub fn try_get_physical_path(&self, file: &FilePath) -> Option<PathBuf> {
        let resolved = match self.resolver.resolve(file) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Cannot resolve {file}: {e}");
                return None;
            }
        };
        if resolved.commit.is_some() {
            return None;
        }
        resolved.physical_path().filter(|path| path.is_file())
    }

    /// Open `file` for reading.
    pub fn read_stream(&self, file: &FilePath) -> Result<Box<dyn Read + Send>> {
        let resolved = self.resolver.resolve(file)?;
        match self.read_source(file, &resolved)? {
            Source::Live(path) => {
                let reader = fs::File::open(&path).map_err(|e| InputError::io(path, e))?;
                Ok(Box::new(reader))
            }
            Source::Blob(blob) => Ok(Box::new(Cursor::new(blob))),
        }
    }

    pub fn read_bytes(&self, file: &FilePath) -> Result<Vec<u8>> {
        let resolved = self.resolver.resolve(file)?;
        match self.read_source(file, &resolved)? {
            Source::Live(path) => fs::read(&path).map_err(|e| InputError::io(path, e)),
            Source::Blob(blob) => Ok(blob.to_vec()),
        }
    }

    /// Full content of `file` as text. A UTF-8 byte order mark is dropped.
    pub fn read_string(&self, file: &FilePath) -> Result<String> {
        let mut bytes = self.read_bytes(file)?;
        if bytes.starts_with(UTF8_BOM) {
            bytes.drain(..UTF8_BOM.len());
        }
        String::from_utf8(bytes).map_err(|_| InputError::InvalidUtf8 {
            file: file.to_string(),
        })
    }

    /// Buffered text reader over `file`. A UTF-8 byte order mark is skipped.
    pub fn read_text(&self, file: &FilePath) -> Result<Box<dyn BufRead + Send>> {
        let mut reader = BufReader::new(self.read_stream(file)?);
        let head = reader.fill_buf().map_err(|e| self.io_error(file, e))?;
        if head.starts_with(UTF8_BOM) {
            reader.consume(UTF8_BOM.len());
        }
        Ok(Box::new(reader))
    }

    pub fn read_json<T: DeserializeOwned>(&self, file: &FilePath) -> Result<T> {
        let text = self.read_string(file)?;
        serde_json::from_str(&text).map_err(|e| InputError::Parse {
            file: file.to_string(),
            message: e.to_string(),
        })
    }

    pub fn read_yaml<T: DeserializeOwned>(&self, file: &FilePath) -> Result<T> {
        let text = self.read_string(file)?;
        serde_yaml::from_str(&text).map_err(|e| InputError::Parse {
            file: file.to_string(),
            message: e.to_string(),
        })
    }

    /// Every file of `origin`, sorted by path.
    pub fn list_files_recursive(&self, origin: &Origin) -> Result<Vec<FilePath>> {
        let files = match origin {
            Origin::Default => list_directory(self.resolver.docset_path(), "", origin)?,
            Origin::Fallback => match self.resolver.fallback_path() {
                Some(root) => list_directory(root, "", origin)?,
                None => Vec::new(),
            },
            Origin::Dependency { name } => self.list_dependency(name, origin)?,
            Origin::Template => {
                return Err(InputError::Unsupported {
                    operation: "listing files",
                    input: origin.to_string(),
                })
            }
        };

        debug!("Listed {} files for {origin}", files.len());
        Ok(files)
    }

    fn list_dependency(&self, name: &str, origin: &Origin) -> Result<Vec<FilePath>> {
        // Resolving the dependency root goes through the same path as a file.
        let root = self.resolver.resolve(&FilePath::new(name, origin.clone()))?;
        let Some(base_path) = root.base_path else {
            return Ok(Vec::new());
        };

        let Some(commit) = root.commit else {
            return list_directory(&base_path, name, origin);
        };

        let paths = self
            .git
            .list_tree(&base_path, &commit)
            .map_err(|e| InputError::Git(Arc::new(e)))?;
        Ok(paths
            .into_iter()
            .map(|path| FilePath::new(format!("{name}/{path}"), origin.clone()))
            .collect())
    }

    fn read_source(&self, file: &FilePath, resolved: &ResolvedPath) -> Result<Source> {
        let Some(base_path) = &resolved.base_path else {
            return Err(InputError::Unsupported {
                operation: "reading",
                input: format!("{file}, whose origin has no configured root"),
            });
        };

        let Some(commit) = &resolved.commit else {
            return Ok(Source::Live(base_path.join(&resolved.relative_path)));
        };

        match self
            .cache
            .get_bytes(file, base_path, &resolved.relative_path, commit)?
        {
            Some(blob) => Ok(Source::Blob(blob)),
            None => Err(InputError::ObjectNotFound {
                file: file.to_string(),
                commit: commit.clone(),
            }),
        }
    }

    fn io_error(&self, file: &FilePath, source: std::io::Error) -> InputError {
        let path = self
            .resolver
            .resolve(file)
            .ok()
            .and_then(|resolved| resolved.physical_path())
            .unwrap_or_else(|| PathBuf::from(file.path()));
        InputError::io(path, source)
    }
}

enum Source {
    Live(PathBuf),
    Blob(Blob),
}

/// Walk every regular file under `root`, skipping `.git` directories. Paths
/// are made relative to `root` and prefixed with `prefix` when it is not
/// empty.
fn list_directory(root: &Path, prefix: &str, origin: &Origin) -> Result<Vec<FilePath>> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            InputError::io(root, source)
        })?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy();
        let path = if prefix.is_empty() {
            relative.into_owned()
        } else {
            format!("{prefix}/{relative}")
        };
        files.push(FilePath::new(path, origin.clone()));
    }

    files.sort();
    Ok(files)
}
