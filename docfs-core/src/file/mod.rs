//! The file module provides a single read-only interface to docset files,
//! hiding where their bytes actually live.
//!
//! ## Architecture
//!
//! ### path.rs
//! [`FilePath`] names a logical file: a docset relative path, an [`Origin`]
//! (docset, fallback, dependency or template) and an optional commit pinning
//! it to a historical git object. It is an immutable value and the blob
//! cache key.
//!
//! ### resolver.rs
//! Maps a [`FilePath`] to a base directory, a path under it, and the commit
//! to read from (if any). Dependency and template roots come from the
//! restore map; a dependency file without its own commit is read at the
//! dependency's resolved commit.
//!
//! ### cache.rs
//! Git object reads are expensive and the same file is often requested by
//! many pipeline workers at once. The blob cache reads each file from git at
//! most once per build session and shares the bytes.
//!
//! ### access.rs
//! [`InputManager`] ties everything together: existence checks, physical
//! path lookup, reading and recursive listing. Files without a commit go to
//! the live filesystem, files with one go through the blob cache.

pub mod access;
pub mod cache;
pub mod error;
pub mod path;
pub mod resolver;

pub use access::{InputManager, InputManagerBuilder};
pub use cache::{Blob, BlobCache};
pub use error::InputError;
pub use path::{FilePath, Origin};
pub use resolver::{ResolvedPath, Resolver};
