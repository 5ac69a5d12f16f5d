//! Expansion of `#include "path"` directives into one flat text stream.
//!
//! Paths resolve against the directory of the file that contains the
//! directive. Every line that is not a directive is copied verbatim, line
//! terminator included, so a file without directives expands to itself.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{ParseError, ParseResult};

static INCLUDE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*#include\s+"([^"]+)"\s*$"#).expect("include directive pattern is valid")
});

/// Expand `root` and everything it includes, transitively.
pub fn expand(root: &Path) -> ParseResult<String> {
    let root = resolve(root, None)?;
    let mut expander = IncludeExpander::default();
    let mut output = String::new();
    expander.expand_into(&root, &mut output)?;
    Ok(output)
}

/// Returns the quoted path when `line` is an include directive.
pub fn include_target(line: &str) -> Option<&str> {
    INCLUDE_DIRECTIVE
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|target| target.as_str())
}

#[derive(Default)]
struct IncludeExpander {
    active: Vec<PathBuf>,
}

impl IncludeExpander {
    fn expand_into(&mut self, path: &Path, output: &mut String) -> ParseResult<()> {
        if self.active.iter().any(|active| active == path) {
            let mut chain = self.active.clone();
            chain.push(path.to_path_buf());
            return Err(ParseError::CyclicInclude { chain });
        }

        let contents = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        self.active.push(path.to_path_buf());

        for segment in contents.split_inclusive('\n') {
            let line = segment.trim_end_matches(&['\r', '\n'][..]);
            let Some(target) = include_target(line) else {
                output.push_str(segment);
                continue;
            };

            let resolved = resolve(&base_dir.join(target), Some(path))?;
            debug!(from = %path.display(), include = %resolved.display(), "expanding include");

            let start = output.len();
            self.expand_into(&resolved, output)?;
            if segment.ends_with('\n') && output.len() > start && !output.ends_with('\n') {
                output.push('\n');
            }
        }

        self.active.pop();
        Ok(())
    }
}

fn resolve(path: &Path, included_from: Option<&Path>) -> ParseResult<PathBuf> {
    fs::canonicalize(path).map_err(|_| ParseError::MissingFile {
        path: path.to_path_buf(),
        included_from: included_from.map(Path::to_path_buf),
    })
}
