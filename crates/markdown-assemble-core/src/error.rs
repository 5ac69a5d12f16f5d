use std::io;
use std::path::PathBuf;

use markdown_assemble_builders::BuildError;
use markdown_assemble_config::{ConfigError, OutputFormat};
use markdown_assemble_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Config = 2,
    Parse = 3,
    Build = 4,
    Renderer = 5,
    Io = 6,
}

impl ExitCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            2 => Some(Self::Config),
            3 => Some(Self::Parse),
            4 => Some(Self::Build),
            5 => Some(Self::Renderer),
            6 => Some(Self::Io),
            _ => None,
        }
    }
}

/// Failure of a single render pass.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("invalid document structure: {0}")]
    InvalidStructure(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{format} output failed: {source}")]
    Render {
        format: OutputFormat,
        #[source]
        source: RenderError,
    },

    #[error("pdf renderer '{program}' not found")]
    RendererNotFound { program: String },

    #[error("pdf renderer {program} exited with {}", describe_status(.code))]
    Renderer { program: PathBuf, code: Option<i32> },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl AssembleError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::Config,
            Self::Parse(ParseError::Io { .. }) => ExitCode::Io,
            Self::Parse(_) => ExitCode::Parse,
            Self::Render { .. } => ExitCode::Build,
            Self::RendererNotFound { .. } | Self::Renderer { .. } => ExitCode::Renderer,
            Self::Io { .. } => ExitCode::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AssembleResult<T> = Result<T, AssembleError>;
