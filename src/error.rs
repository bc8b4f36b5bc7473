//! Error types surfaced by the engine and its I/O adapters.

use std::path::PathBuf;

/// Errors that can occur while building, configuring or training a network
#[derive(Debug)]
pub enum NetworkError {
    /// Malformed topology: wrong stage shape, empty hidden stage, unwired stage
    Structure(String),
    /// Session state missing before training (epoch, categories)
    NotInitialized(String),
    /// Dataset folder does not exist
    FolderNotFound(PathBuf),
    /// Configuration file does not exist
    FileNotFound(PathBuf),
    /// Malformed configuration
    Parse(String),
    /// Discovered dataset categories do not match the output stage
    CategoryMismatch { found: usize, expected: usize },
    /// Position outside of a layer
    OutOfRange { position: usize, len: usize },
    Io(std::io::Error),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structure(msg) => write!(f, "Invalid network structure: {}", msg),
            Self::NotInitialized(msg) => write!(f, "Network isn't initialized: {}", msg),
            Self::FolderNotFound(path) => {
                write!(f, "Could not find dataset folder {}", path.display())
            }
            Self::FileNotFound(path) => write!(f, "Could not find config file {}", path.display()),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
            Self::CategoryMismatch { found, expected } => write!(
                f,
                "Dataset has {} categories, output layer has {} neurons",
                found, expected
            ),
            Self::OutOfRange { position, len } => {
                write!(f, "Position {} out of range for layer of {} neurons", position, len)
            }
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl NetworkError {
    /// True for errors reported by the filesystem collaborators
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::FolderNotFound(_) | Self::FileNotFound(_) | Self::Io(_)
        )
    }
}
