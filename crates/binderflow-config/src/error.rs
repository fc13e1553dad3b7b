use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required CI context is missing: {0}")]
    MissingContext(&'static str),

    #[error("invalid repository identifier (expected owner/name): {0:?}")]
    InvalidRepository(String),

    #[error("commit identifier {sha:?} has {len} characters, at least 12 are required")]
    ShaTooShort { sha: String, len: usize },

    #[error("could not read appendix file {}", path.display())]
    AppendixUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
