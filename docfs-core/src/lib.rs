pub mod file;
pub mod git;
pub mod restore;
pub mod settings;

// Public library API - the pipeline only needs these types.
pub use file::{FilePath, InputError, InputManager, Origin};
pub use git::{Git2ObjectReader, GitObjectReader};
pub use restore::{DirectoryRestoreMap, RestoreGitMap, SourceDescriptor};
pub use settings::{Config, GlobConfig, PathCase};
