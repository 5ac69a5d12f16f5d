//! Hand-off of rendered HTML to an external HTML-to-PDF renderer.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use markdown_assemble_config::Settings;
use tracing::{debug, info};

use crate::error::{AssembleError, AssembleResult};

const DEFAULT_RENDERER: &str = "wkhtmltopdf";

/// Intermediate HTML the PDF pass writes into the build directory.
pub fn source_path(settings: &Settings) -> PathBuf {
    settings
        .build_path
        .join(format!("{}.html", settings.input_stem()))
}

/// Renderer binary: the configured path when it names a file, otherwise a
/// `PATH` lookup of the configured (or default) program name.
pub fn locate_renderer(settings: &Settings) -> AssembleResult<PathBuf> {
    let configured = settings.pdf.renderer.as_deref();
    if let Some(path) = configured {
        if path.components().count() > 1 || path.is_absolute() {
            return if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(AssembleError::RendererNotFound {
                    program: path.display().to_string(),
                })
            };
        }
    }

    let program = configured
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_RENDERER.to_string());
    which::which(&program).map_err(|_| AssembleError::RendererNotFound { program })
}

/// Arguments passed to the renderer, in order.
pub fn renderer_args(html: &Path, output: &Path, settings: &Settings) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(stylesheet) = &settings.pdf.stylesheet {
        args.push("--user-style-sheet".to_string());
        args.push(stylesheet.display().to_string());
    }
    args.extend(settings.pdf.args.iter().cloned());
    args.push(html.display().to_string());
    args.push(output.display().to_string());
    args
}

pub fn render_pdf(html: &Path, output: &Path, settings: &Settings) -> AssembleResult<()> {
    let program = locate_renderer(settings)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|source| AssembleError::io(parent, source))?;
    }

    let args = renderer_args(html, output, settings);
    debug!(program = %program.display(), ?args, "invoking pdf renderer");
    let status = Command::new(&program)
        .args(&args)
        .status()
        .map_err(|source| AssembleError::io(&program, source))?;

    if !status.success() {
        return Err(AssembleError::Renderer {
            program,
            code: status.code(),
        });
    }
    info!(output = %output.display(), "pdf written");
    Ok(())
}
