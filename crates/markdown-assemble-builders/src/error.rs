use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("style '{name}' not found in reference template ({role})")]
    MissingStyle { name: String, role: String },

    #[error("reference template is missing required part '{part}'")]
    InvalidPart { part: String },

    #[error("unsupported image format: {path}")]
    UnsupportedImage { path: PathBuf },

    #[error("malformed xml in '{part}': {message}")]
    Xml { part: String, message: String },

    #[error("failed to read or write package {path}: {source}")]
    Package {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    pub(crate) fn xml(part: &str, err: impl std::fmt::Display) -> Self {
        BuildError::Xml {
            part: part.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;
