//! git
//!
//! Read-only access to git object storage.
//!
//! Dependency and template repositories may be restored as bare
//! repositories, so files are read straight out of commit trees instead of
//! a checked-out working directory. Everything that touches `git2` lives
//! behind the [`GitObjectReader`] trait so the input layer can be tested
//! with a stub reader.

mod reader;

pub use reader::{Git2ObjectReader, GitError, GitObjectReader};
