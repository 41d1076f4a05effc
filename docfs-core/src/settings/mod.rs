pub mod config;
pub mod glob;


pub use config::Config;
pub use glob::{GlobConfig, GlobError, PathCase};
