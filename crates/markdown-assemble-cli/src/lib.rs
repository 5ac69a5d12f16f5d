use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use markdown_assemble_config::{LoadOptions, Settings, SettingsOverrides};
use markdown_assemble_core::{AssembleOutcome, AssembleResult, Assembler, ExitCode};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref())?;

    let overrides = cli.overrides();
    let mut exit_code = ExitCode::Success;
    for settings in &cli.settings {
        match assemble(settings, overrides.clone()) {
            Ok(outcome) => {
                for output in &outcome.outputs {
                    println!("{}", output.display());
                }
            }
            Err(err) => {
                error!(settings = %settings.display(), "run failed");
                eprintln!("{}: {err}", settings.display());
                exit_code = err.exit_code();
            }
        }
    }
    Ok(exit_code as i32)
}

fn assemble(settings_path: &Path, overrides: SettingsOverrides) -> AssembleResult<AssembleOutcome> {
    let options = LoadOptions {
        overrides,
        ..LoadOptions::default()
    }
    .with_settings_path(settings_path);
    let settings = Settings::load(options)?;
    Assembler::new(settings).run()
}

/// `--log` wins over `RUST_LOG`; without either only warnings are shown.
fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()?;
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Assemble markdown fragments into DOCX, HTML and PDF documents"
)]
struct Cli {
    /// Settings file to run; repeat to assemble several documents.
    #[arg(long = "settings", short = 's', value_name = "FILE", required = true, num_args = 1..)]
    settings: Vec<PathBuf>,

    /// Overrides the document version.
    #[arg(long = "version-label", value_name = "VERSION")]
    version_label: Option<String>,

    /// Output formats to produce instead of the configured ones.
    #[arg(long = "format", short = 'f', value_enum)]
    formats: Vec<FormatValue>,

    /// Output directory instead of the configured one.
    #[arg(long = "output", short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,

    /// Log filter, e.g. `info` or `markdown_assemble_builders=debug`.
    #[arg(long = "log", value_name = "LEVEL")]
    log: Option<String>,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        let output_formats = if self.formats.is_empty() {
            None
        } else {
            Some(
                self.formats
                    .iter()
                    .map(|format| format.as_str().to_owned())
                    .collect(),
            )
        };
        SettingsOverrides {
            output_path: self.output.clone(),
            output_formats,
            version: self.version_label.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatValue {
    Docx,
    Html,
    Pdf,
}

impl FormatValue {
    fn as_str(self) -> &'static str {
        match self {
            FormatValue::Docx => "docx",
            FormatValue::Html => "html",
            FormatValue::Pdf => "pdf",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "markdown-assemble",
            "--settings",
            "a.toml",
            "b.toml",
            "--format",
            "html",
            "-f",
            "pdf",
            "--version-label",
            "2.0",
        ]);
        assert_eq!(cli.settings, vec![PathBuf::from("a.toml"), PathBuf::from("b.toml")]);

        let overrides = cli.overrides();
        assert_eq!(
            overrides.output_formats,
            Some(vec!["html".to_owned(), "pdf".to_owned()])
        );
        assert_eq!(overrides.version.as_deref(), Some("2.0"));
        assert!(overrides.output_path.is_none());
    }

    #[test]
    fn settings_are_required() {
        assert!(Cli::try_parse_from(["markdown-assemble"]).is_err());
    }
}
