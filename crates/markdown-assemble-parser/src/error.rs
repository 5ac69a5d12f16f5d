use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file not found: {path}{}", describe_origin(.included_from))]
    MissingFile {
        path: PathBuf,
        included_from: Option<PathBuf>,
    },

    #[error("cyclic include: {}", format_chain(.chain))]
    CyclicInclude { chain: Vec<PathBuf> },

    #[error("malformed table at line {line}: expected {expected} cells, found {found}")]
    MalformedTable {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

fn describe_origin(included_from: &Option<PathBuf>) -> String {
    match included_from {
        Some(from) => format!(" (included from {})", from.display()),
        None => String::new(),
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type ParseResult<T> = Result<T, ParseError>;
