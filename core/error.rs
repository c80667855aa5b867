use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory Creation Error: Path '{path}', Error: {source}")]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage Backend Error: {0}")]
    Storage(String),

    #[error("Hanuki is not installed in '{0}'")]
    NotInstalled(PathBuf),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Embedded Asset Error: {0}")]
    Asset(String),
}

/// Failure while fetching a file from the storage gateway.
///
/// Absence of a listing is not an error (see `ContentStore::list_directory`);
/// this type only covers file fetches that a renderer asked for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Failed to load {path}: HTTP {status}")]
    Http { status: u16, path: String },

    #[error("Failed to load {path}: {message}")]
    Transport { path: String, message: String },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            FetchError::Transport { .. } => None,
        }
    }
}
