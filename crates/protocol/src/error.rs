use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RefListError>;

/// Errors raised while reading reference-list sources
#[derive(Error, Debug)]
pub enum RefListError {
    /// The source file or directory does not exist
    #[error("refs source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RefListError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
