use std::sync::OnceLock;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_is_glob() -> bool {
    true
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlobError {
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// How literal path patterns compare against file paths. `Insensitive`
/// compares Unicode lowercase forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCase {
    Sensitive,
    Insensitive,
}

impl PathCase {
    /// The file system convention of the current platform.
    pub fn platform() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            Self::Insensitive
        } else {
            Self::Sensitive
        }
    }

    pub fn equals(self, a: &str, b: &str) -> bool {
        match self {
            Self::Sensitive => a == b,
            Self::Insensitive => a.to_lowercase() == b.to_lowercase(),
        }
    }

    pub fn starts_with(self, path: &str, prefix: &str) -> bool {
        match self {
            Self::Sensitive => path.starts_with(prefix),
            Self::Insensitive => path.to_lowercase().starts_with(&prefix.to_lowercase()),
        }
    }
}

/// A configuration value that applies to the files selected by an
/// include/exclude pattern pair.
///
/// In glob mode the patterns are compiled on first use and the compiled
/// matcher is shared by every later call, from any thread. Glob patterns
/// follow gitignore rules: a pattern without a `/` matches at any depth
/// (`*.md` matches `sub/a.md`), and a pattern naming a directory matches
/// everything below it (`docs` matches `docs/a.md`). Negated `!` patterns
/// are rejected as invalid. In literal mode a
/// pattern ending with a separator selects everything below that directory
/// and any other pattern selects exactly one path. Excludes always win.
///
/// ```toml
/// [[file_metadata.author]]
/// files = ["docs/**"]
/// exclude = ["docs/internal/**"]
/// value = "docs-team"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobConfig<T> {
    #[serde(rename = "files", alias = "include")]
    include: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    exclude: Vec<String>,

    value: T,

    #[serde(rename = "glob", default = "default_is_glob")]
    is_glob: bool,

    #[serde(skip)]
    matcher: OnceLock<Result<CompiledGlob, GlobError>>,
}

#[derive(Debug, Clone)]
struct CompiledGlob {
    include: Gitignore,
    exclude: Gitignore,
}

impl CompiledGlob {
    fn new(include: &[String], exclude: &[String]) -> Result<Self, GlobError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    fn is_match(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        let hit = |matcher: &Gitignore| {
            matcher
                .matched_path_or_any_parents(path, false)
                .is_ignore()
        };
        hit(&self.include) && !hit(&self.exclude)
    }
}

fn compile(patterns: &[String]) -> Result<Gitignore, GlobError> {
    let mut builder = GitignoreBuilder::new("");
    for pattern in patterns {
        if pattern.starts_with('!') {
            return Err(GlobError::InvalidPattern {
                pattern: pattern.clone(),
                message: "negated patterns are not supported".to_string(),
            });
        }
        builder
            .add_line(None, pattern)
            .map_err(|e| GlobError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
    }
    builder.build().map_err(|e| GlobError::InvalidPattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

fn literal_hit(pattern: &str, path: &str, case: PathCase) -> bool {
    if pattern.ends_with(['/', '\\']) {
        case.starts_with(path, pattern)
    } else {
        case.equals(path, pattern)
    }
}

impl<T> GlobConfig<T> {
    pub fn new(include: Vec<String>, exclude: Vec<String>, value: T, is_glob: bool) -> Self {
        Self {
            include,
            exclude,
            value,
            is_glob,
            matcher: OnceLock::new(),
        }
    }

    pub fn glob(include: &[&str], exclude: &[&str], value: T) -> Self {
        Self::new(to_strings(include), to_strings(exclude), value, true)
    }

    pub fn literal(include: &[&str], exclude: &[&str], value: T) -> Self {
        Self::new(to_strings(include), to_strings(exclude), value, false)
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_glob(&self) -> bool {
        self.is_glob
    }

    /// Whether this entry applies to `file_path`, comparing literal patterns
    /// with the platform's case convention.
    pub fn is_match(&self, file_path: &str) -> Result<bool, GlobError> {
        self.is_match_with(file_path, PathCase::platform())
    }

    /// Like [`GlobConfig::is_match`] with an explicit comparison policy for
    /// literal mode. An empty path never matches.
    pub fn is_match_with(&self, file_path: &str, case: PathCase) -> Result<bool, GlobError> {
        if file_path.is_empty() {
            return Ok(false);
        }

        if self.is_glob {
            let compiled = self
                .matcher
                .get_or_init(|| CompiledGlob::new(&self.include, &self.exclude))
                .as_ref()
                .map_err(Clone::clone)?;
            return Ok(compiled.is_match(file_path));
        }

        if self.exclude.iter().any(|p| literal_hit(p, file_path, case)) {
            return Ok(false);
        }
        Ok(self.include.iter().any(|p| literal_hit(p, file_path, case)))
    }

    /// Value of the last entry in `entries` that applies to `file_path`.
    pub fn last_match<'a>(
        entries: &'a [GlobConfig<T>],
        file_path: &str,
    ) -> Result<Option<&'a T>, GlobError> {
        let mut found = None;
        for entry in entries {
            if entry.is_match(file_path)? {
                found = Some(&entry.value);
            }
        }
        Ok(found)
    }
}

fn to_strings(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}
