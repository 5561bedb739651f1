use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No download endpoints configured")]
    NoEndpoints,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Every endpoint was tried; `source` is the last failure
    #[error("All {attempts} endpoints failed for {app_id}: {source}")]
    AllEndpointsFailed {
        app_id: String,
        attempts: usize,
        #[source]
        source: reqwest::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    /// No usable refs sources were supplied
    #[error("Nothing to do: {0}")]
    Configuration(String),

    #[error("Refs directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
