use std::path::{Path, PathBuf};

use markdown_assemble_config::Settings;
use markdown_assemble_parser::{expand, parse, substitute_variables, Document, ParseOptions};
use markdown_assemble_utils::atomic_write;
use tracing::info;

use crate::error::{AssembleError, AssembleResult};
use crate::render::render_all;

/// Files produced by one run.
#[derive(Debug, Clone)]
pub struct AssembleOutcome {
    pub outputs: Vec<PathBuf>,
    pub expanded_markdown: PathBuf,
    pub markdown_source: Option<PathBuf>,
}

/// End-to-end pipeline for one settings file: expand, substitute, parse,
/// render.
pub struct Assembler {
    settings: Settings,
}

impl Assembler {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Expanded and variable-substituted markdown for the input file.
    pub fn expand(&self) -> AssembleResult<String> {
        let expanded = expand(&self.settings.input_file)?;
        Ok(substitute_variables(&expanded, &self.settings.variables))
    }

    pub fn parse(&self, text: &str) -> AssembleResult<Document> {
        Ok(parse(text, &ParseOptions::from_settings(&self.settings))?)
    }

    pub fn run(&self) -> AssembleResult<AssembleOutcome> {
        let settings = &self.settings;
        info!(input = %settings.input_file.display(), "assembling document");

        let text = self.expand()?;
        let document = self.parse(&text)?;
        info!(nodes = document.nodes().len(), "document parsed");

        let markdown_name = format!("{}.md", settings.input_stem());

        let expanded_markdown = settings.build_path.join(&markdown_name);
        write(&expanded_markdown, &text)?;

        let outputs = render_all(&document, settings)?;
        for output in &outputs {
            info!(output = %output.display(), "output ready");
        }

        // Deliverable copy only once every format has rendered.
        let markdown_source = if settings.include_markdown_source {
            let path = settings.output_path.join(&markdown_name);
            write(&path, &text)?;
            Some(path)
        } else {
            None
        };

        Ok(AssembleOutcome {
            outputs,
            expanded_markdown,
            markdown_source,
        })
    }
}

fn write(path: &Path, contents: &str) -> AssembleResult<()> {
    atomic_write(path, contents).map_err(|source| AssembleError::io(path, source))
}
