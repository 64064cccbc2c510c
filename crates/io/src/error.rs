use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that stop an output or check pass. Failures scoped to one annex
/// file are diagnostics instead.
#[derive(Debug)]
pub enum FsError {
    /// A file or directory could not be read.
    Read { path: PathBuf, message: String },
    /// A planned output could not be written or removed.
    Write { path: PathBuf, message: String },
    /// An existing output file is malformed.
    Parse { path: PathBuf, message: String },
}

impl FsError {
    pub fn read(path: &Path, err: impl fmt::Display) -> Self {
        Self::Read { path: path.to_path_buf(), message: err.to_string() }
    }

    pub fn write(path: &Path, err: impl fmt::Display) -> Self {
        Self::Write { path: path.to_path_buf(), message: err.to_string() }
    }

    pub fn parse(path: &Path, err: impl fmt::Display) -> Self {
        Self::Parse { path: path.to_path_buf(), message: err.to_string() }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
            Self::Parse { path, message } => write!(f, "malformed {}: {message}", path.display()),
        }
    }
}

impl std::error::Error for FsError {}
