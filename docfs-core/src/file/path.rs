use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the bytes of a logical file live.
///
/// The dependency name is carried by the `Dependency` variant only, so a
/// dependency file can never be constructed without one (and no other origin
/// can carry one).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// The docset root on the live filesystem.
    Default,
    /// The optional fallback root on the live filesystem.
    Fallback,
    /// A restored dependency repository, named as in the config.
    Dependency { name: String },
    /// The restored template repository.
    Template,
}

impl Origin {
    pub fn dependency(name: impl Into<String>) -> Self {
        Self::Dependency { name: name.into() }
    }

    pub fn dependency_name(&self) -> Option<&str> {
        match self {
            Self::Dependency { name } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Fallback => write!(f, "fallback"),
            Self::Dependency { name } => write!(f, "dependency {name}"),
            Self::Template => write!(f, "template"),
        }
    }
}

/// A logical file, independent of where its bytes physically live.
///
/// `path` is docset relative and always uses `/` separators. For dependency
/// files it must start with `<name>/`, anything else does not resolve.
/// `commit` pins the file to a historical git object instead of the live
/// tree.
///
/// Two `FilePath`s describing the same logical file compare and hash equal,
/// which is what the blob cache relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawFilePath")]
pub struct FilePath {
    path: String,
    origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
}

/// Wire shape of [`FilePath`]; deserialized paths are normalized like
/// constructed ones.
#[derive(Deserialize)]
struct RawFilePath {
    path: String,
    origin: Origin,
    #[serde(default)]
    commit: Option<String>,
}

impl From<RawFilePath> for FilePath {
    fn from(raw: RawFilePath) -> Self {
        Self {
            path: normalize(&raw.path),
            origin: raw.origin,
            commit: raw.commit,
        }
    }
}

impl FilePath {
    pub fn new(path: impl AsRef<str>, origin: Origin) -> Self {
        Self {
            path: normalize(path.as_ref()),
            origin,
            commit: None,
        }
    }

    pub fn default_origin(path: impl AsRef<str>) -> Self {
        Self::new(path, Origin::Default)
    }

    pub fn fallback(path: impl AsRef<str>) -> Self {
        Self::new(path, Origin::Fallback)
    }

    pub fn dependency(path: impl AsRef<str>, name: impl Into<String>) -> Self {
        Self::new(path, Origin::dependency(name))
    }

    pub fn template(path: impl AsRef<str>) -> Self {
        Self::new(path, Origin::Template)
    }

    /// Pin this file to a specific commit.
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Origin::Default => write!(f, "{}", self.path)?,
            Origin::Fallback => write!(f, "{} (fallback)", self.path)?,
            Origin::Dependency { name } => write!(f, "{} (dependency {name})", self.path)?,
            Origin::Template => write!(f, "{} (template)", self.path)?,
        }
        if let Some(commit) = &self.commit {
            write!(f, "@{commit}")?;
        }
        Ok(())
    }
}

/// Forward slashes only, no leading `./`.
pub(crate) fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut trimmed = path.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}
