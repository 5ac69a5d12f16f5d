//! Settings primitives and loader for markdown-assemble.
//!
//! The loader resolves settings using a precedence stack:
//! built-in defaults → settings file → command-line overrides.
//! Every path remembers the layer that set it, so relative paths resolve
//! against the directory of that layer rather than the process cwd.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Deserialize;
use thiserror::Error;

/// Name of the built-in variable holding the document version.
pub const VERSION_VARIABLE: &str = "VERSION";
/// Name of the built-in variable holding the document date.
pub const DATE_VARIABLE: &str = "DATE";

const DATE_FORMAT: &str = "%d-%m-%Y";

/// Complete settings for one assembly run, resolved from every layer.
#[derive(Clone, Debug)]
pub struct Settings {
    pub input_file: PathBuf,
    pub output_path: PathBuf,
    pub build_path: PathBuf,
    pub image_path: PathBuf,
    pub title: String,
    pub subtitle: Option<String>,
    pub document_type: DocumentType,
    pub version: String,
    pub date: String,
    pub include_front_page: bool,
    pub include_markdown_source: bool,
    pub include_table_of_contents: bool,
    pub toc_title: String,
    pub output_formats: Vec<OutputFormat>,
    pub reference_template: Option<PathBuf>,
    pub front_page_image: Option<PathBuf>,
    pub variables: BTreeMap<String, String>,
    pub markers: MarkerSettings,
    pub styles: StyleNames,
    pub docx: DocxSettings,
    pub html: HtmlSettings,
    pub pdf: PdfSettings,
    pub sources: SettingsSources,
}

impl Settings {
    /// File stem of the input document, used to name default outputs.
    pub fn input_stem(&self) -> String {
        self.input_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_owned())
    }

    /// Final artifact path for `format` inside the output directory.
    pub fn output_file_for(&self, format: OutputFormat) -> PathBuf {
        let configured = match format {
            OutputFormat::Docx => self.docx.output_file.as_ref(),
            OutputFormat::Html => self.html.output_file.as_ref(),
            OutputFormat::Pdf => self.pdf.output_file.as_ref(),
        };
        match configured {
            Some(name) => self.output_path.join(name),
            None => self
                .output_path
                .join(format!("{}.{}", self.input_stem(), format.extension())),
        }
    }
}

/// Output formats the assembler knows how to produce.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum OutputFormat {
    Docx,
    Html,
    Pdf,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(OutputFormat::Docx),
            "html" => Ok(OutputFormat::Html),
            "pdf" => Ok(OutputFormat::Pdf),
            _ => Err(()),
        }
    }
}

/// Kind of deliverable; templates get placeholder text on the front page.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DocumentType {
    #[default]
    Document,
    Template,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentType::Document => "document",
            DocumentType::Template => "template",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for DocumentType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "document" => Ok(DocumentType::Document),
            "template" => Ok(DocumentType::Template),
            _ => Err(()),
        }
    }
}

/// Marker lines recognised by the structural parser.
#[derive(Clone, Debug)]
pub struct MarkerSettings {
    pub toc: String,
    pub page_break: String,
    pub appendix: String,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        MarkerSettings {
            toc: "<!-- toc -->".to_owned(),
            page_break: "<!-- pagebreak -->".to_owned(),
            appendix: "appendix".to_owned(),
        }
    }
}

/// Paragraph, table and numbering style names expected in the reference template.
#[derive(Clone, Debug)]
pub struct StyleNames {
    pub heading: Vec<String>,
    pub appendix_heading: Vec<String>,
    pub bullet_list: String,
    pub numbered_list: String,
    pub table: String,
    pub title: String,
    pub subtitle: String,
    pub header: String,
    pub footer: String,
    pub measure: String,
    pub toc_heading: String,
}

impl Default for StyleNames {
    fn default() -> Self {
        StyleNames {
            heading: (1..=5).map(|level| format!("heading {level}")).collect(),
            appendix_heading: (1..=5).map(|level| format!("Kop {level} Bijlage")).collect(),
            bullet_list: "Lijst opsom.teken1".to_owned(),
            numbered_list: "Lijstnummering1".to_owned(),
            table: "Tabelraster1".to_owned(),
            title: "Title".to_owned(),
            subtitle: "Subtitle".to_owned(),
            header: "header".to_owned(),
            footer: "footer".to_owned(),
            measure: "Maatregel".to_owned(),
            toc_heading: "TOC Heading".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DocxSettings {
    pub output_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct HtmlSettings {
    pub output_file: Option<PathBuf>,
    pub stylesheet: Option<PathBuf>,
}

/// Hand-off settings for the external HTML-to-PDF renderer.
#[derive(Clone, Debug, Default)]
pub struct PdfSettings {
    pub output_file: Option<PathBuf>,
    pub renderer: Option<PathBuf>,
    pub stylesheet: Option<PathBuf>,
    pub args: Vec<String>,
}

/// Provenance information for resolved settings.
#[derive(Clone, Debug)]
pub struct SettingsSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of settings (defaults/file/command line).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    fn default(base_dir: PathBuf) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir,
        }
    }

    fn for_file(path: PathBuf) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ConfigSource {
            kind: ConfigSourceKind::File,
            path: Some(path),
            base_dir,
        }
    }

    fn command_line(base_dir: PathBuf) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::CommandLine,
            path: None,
            base_dir,
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of settings sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    File,
    CommandLine,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::File => "settings file",
            ConfigSourceKind::CommandLine => "command line",
        };
        f.write_str(label)
    }
}

/// Values supplied on the command line; they win over every other layer.
#[derive(Clone, Debug, Default)]
pub struct SettingsOverrides {
    pub output_path: Option<PathBuf>,
    pub output_formats: Option<Vec<String>>,
    pub version: Option<String>,
}

impl SettingsOverrides {
    fn is_empty(&self) -> bool {
        self.output_path.is_none() && self.output_formats.is_none() && self.version.is_none()
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub settings_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub overrides: SettingsOverrides,
}

impl LoadOptions {
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Errors surfaced while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("settings file {path} not found")]
    NotFound { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse variables file {path}: {source}")]
    Variables {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("settings validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Settings {
    /// Loads settings using the precedence rules and returns typed values.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let settings_path = options
            .settings_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &settings_path {
            if !path.exists() {
                return Err(ConfigError::NotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::default(working_dir.clone());
        let mut merged = SettingsPartial::default();
        merged.merge(defaults_layer(default_source.clone()));
        let mut source_layers = vec![default_source];

        if let Some(path) = settings_path {
            let source = ConfigSource::for_file(path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        if !options.overrides.is_empty() {
            let source = ConfigSource::command_line(working_dir.clone());
            merged.merge(overrides_layer(options.overrides, source.clone()));
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        let variables = collect_variables(&resolved)?;

        Ok(Settings {
            input_file: resolved.input_file,
            output_path: resolved.output_path,
            build_path: resolved.build_path,
            image_path: resolved.image_path,
            title: resolved.title,
            subtitle: resolved.subtitle,
            document_type: resolved.document_type,
            version: resolved.version,
            date: resolved.date,
            include_front_page: resolved.include_front_page,
            include_markdown_source: resolved.include_markdown_source,
            include_table_of_contents: resolved.include_table_of_contents,
            toc_title: resolved.toc_title,
            output_formats: resolved.output_formats,
            reference_template: resolved.reference_template,
            front_page_image: resolved.front_page_image,
            variables,
            markers: resolved.markers,
            styles: resolved.styles,
            docx: resolved.docx,
            html: resolved.html,
            pdf: resolved.pdf,
            sources: SettingsSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<SettingsPartial, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let raw: RawSettings = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> SettingsPartial {
    SettingsPartial {
        output_path: Some(Located::new(PathBuf::from("output"), source.clone())),
        build_path: Some(Located::new(PathBuf::from("build"), source.clone())),
        image_path: Some(Located::new(PathBuf::from("."), source.clone())),
        document_type: Some(Located::new("document".to_owned(), source.clone())),
        include_front_page: Some(true),
        include_markdown_source: Some(false),
        include_table_of_contents: Some(true),
        toc_title: Some("Contents".to_owned()),
        output_formats: Some(Located::new(vec!["docx".to_owned()], source)),
        ..SettingsPartial::default()
    }
}

fn overrides_layer(overrides: SettingsOverrides, source: ConfigSource) -> SettingsPartial {
    SettingsPartial {
        output_path: overrides
            .output_path
            .map(|path| Located::new(path, source.clone())),
        output_formats: overrides
            .output_formats
            .map(|formats| Located::new(formats, source.clone())),
        version: overrides.version,
        ..SettingsPartial::default()
    }
}

fn collect_variables(resolved: &ResolvedSettings) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut variables = BTreeMap::new();
    for path in &resolved.variables_files {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed: BTreeMap<String, String> =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Variables {
                path: path.clone(),
                source,
            })?;
        variables.extend(parsed);
    }
    variables.extend(resolved.variables.clone());
    variables.insert(VERSION_VARIABLE.to_owned(), resolved.version.clone());
    variables.insert(DATE_VARIABLE.to_owned(), resolved.date.clone());
    Ok(variables)
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

fn resolve_path(located: &Located<PathBuf>) -> PathBuf {
    let path = &located.value;
    if path.is_absolute() {
        path.clone()
    } else {
        located.source.base_dir.join(path)
    }
}

fn resolve_optional(located: Option<Located<PathBuf>>) -> Option<PathBuf> {
    located.as_ref().map(resolve_path)
}

#[derive(Clone, Debug, Default)]
struct SettingsPartial {
    input_file: Option<Located<PathBuf>>,
    output_path: Option<Located<PathBuf>>,
    build_path: Option<Located<PathBuf>>,
    image_path: Option<Located<PathBuf>>,
    title: Option<Located<String>>,
    subtitle: Option<String>,
    document_type: Option<Located<String>>,
    version: Option<String>,
    date: Option<String>,
    include_front_page: Option<bool>,
    include_markdown_source: Option<bool>,
    include_table_of_contents: Option<bool>,
    toc_title: Option<String>,
    output_formats: Option<Located<Vec<String>>>,
    reference_template: Option<Located<PathBuf>>,
    front_page_image: Option<Located<PathBuf>>,
    variables_files: Option<Vec<Located<PathBuf>>>,
    variables: BTreeMap<String, String>,
    markers: MarkersPartial,
    styles: StylesPartial,
    docx_output_file: Option<PathBuf>,
    html_output_file: Option<PathBuf>,
    html_stylesheet: Option<Located<PathBuf>>,
    pdf_output_file: Option<PathBuf>,
    pdf_renderer: Option<Located<PathBuf>>,
    pdf_stylesheet: Option<Located<PathBuf>>,
    pdf_args: Option<Vec<String>>,
}

macro_rules! take_if_some {
    ($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $self.$field = $other.$field;
            }
        )+
    };
}

impl SettingsPartial {
    fn merge(&mut self, other: SettingsPartial) {
        take_if_some!(
            self,
            other,
            input_file,
            output_path,
            build_path,
            image_path,
            title,
            subtitle,
            document_type,
            version,
            date,
            include_front_page,
            include_markdown_source,
            include_table_of_contents,
            toc_title,
            output_formats,
            reference_template,
            front_page_image,
            variables_files,
            docx_output_file,
            html_output_file,
            html_stylesheet,
            pdf_output_file,
            pdf_renderer,
            pdf_stylesheet,
            pdf_args,
        );
        self.variables.extend(other.variables);
        self.markers.merge(other.markers);
        self.styles.merge(other.styles);
    }

    fn finalize(self) -> Result<ResolvedSettings, ConfigValidationErrors> {
        let mut errors = Vec::new();

        let input_file = match &self.input_file {
            Some(located) => resolve_path(located),
            None => {
                errors.push(ConfigValidationError::new(
                    None,
                    "input_file is required".to_owned(),
                ));
                PathBuf::new()
            }
        };

        let title = match self.title {
            Some(located) if located.value.trim().is_empty() => {
                errors.push(ConfigValidationError::new(
                    Some(located.source),
                    "title must not be empty".to_owned(),
                ));
                String::new()
            }
            Some(located) => located.value,
            None => {
                errors.push(ConfigValidationError::new(None, "title is required".to_owned()));
                String::new()
            }
        };

        let document_type = match self.document_type {
            Some(located) => match located.value.parse::<DocumentType>() {
                Ok(kind) => kind,
                Err(()) => {
                    errors.push(ConfigValidationError::new(
                        Some(located.source.clone()),
                        format!(
                            "document_type must be 'document' or 'template' (received '{}')",
                            located.value
                        ),
                    ));
                    DocumentType::default()
                }
            },
            None => DocumentType::default(),
        };

        let errors_before_formats = errors.len();
        let output_formats = match self.output_formats {
            Some(located) => parse_formats(located, &mut errors),
            None => Vec::new(),
        };
        if output_formats.is_empty() && errors.len() == errors_before_formats {
            errors.push(ConfigValidationError::new(
                None,
                "output_formats must name at least one format".to_owned(),
            ));
        }

        let reference_template = resolve_optional(self.reference_template);
        if output_formats.contains(&OutputFormat::Docx) && reference_template.is_none() {
            errors.push(
                ConfigValidationError::new(
                    None,
                    "a reference_template is required to produce docx".to_owned(),
                )
                .with_context("output_formats"),
            );
        }

        let styles = self.styles.finalize(&mut errors);

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedSettings {
            input_file,
            output_path: resolve_optional(self.output_path).unwrap_or_else(|| "output".into()),
            build_path: resolve_optional(self.build_path).unwrap_or_else(|| "build".into()),
            image_path: resolve_optional(self.image_path).unwrap_or_else(|| ".".into()),
            title,
            subtitle: self.subtitle.filter(|subtitle| !subtitle.trim().is_empty()),
            document_type,
            version: self.version.unwrap_or_default(),
            date: self
                .date
                .unwrap_or_else(|| Local::now().format(DATE_FORMAT).to_string()),
            include_front_page: self.include_front_page.unwrap_or(true),
            include_markdown_source: self.include_markdown_source.unwrap_or(false),
            include_table_of_contents: self.include_table_of_contents.unwrap_or(true),
            toc_title: self.toc_title.unwrap_or_else(|| "Contents".to_owned()),
            output_formats,
            reference_template,
            front_page_image: resolve_optional(self.front_page_image),
            variables_files: self
                .variables_files
                .unwrap_or_default()
                .iter()
                .map(resolve_path)
                .collect(),
            variables: self.variables,
            markers: self.markers.finalize(),
            styles,
            docx: DocxSettings {
                output_file: self.docx_output_file,
            },
            html: HtmlSettings {
                output_file: self.html_output_file,
                stylesheet: resolve_optional(self.html_stylesheet),
            },
            pdf: PdfSettings {
                output_file: self.pdf_output_file,
                renderer: resolve_optional(self.pdf_renderer),
                stylesheet: resolve_optional(self.pdf_stylesheet),
                args: self.pdf_args.unwrap_or_default(),
            },
        })
    }
}

fn parse_formats(
    located: Located<Vec<String>>,
    errors: &mut Vec<ConfigValidationError>,
) -> Vec<OutputFormat> {
    let mut formats = Vec::new();
    for raw in &located.value {
        match raw.parse::<OutputFormat>() {
            Ok(format) if !formats.contains(&format) => formats.push(format),
            Ok(_) => {}
            Err(()) => errors.push(
                ConfigValidationError::new(
                    Some(located.source.clone()),
                    format!("unknown output format '{raw}'"),
                )
                .with_context("output_formats"),
            ),
        }
    }
    formats
}

#[derive(Clone, Debug, Default)]
struct MarkersPartial {
    toc: Option<String>,
    page_break: Option<String>,
    appendix: Option<String>,
}

impl MarkersPartial {
    fn merge(&mut self, other: MarkersPartial) {
        take_if_some!(self, other, toc, page_break, appendix);
    }

    fn finalize(self) -> MarkerSettings {
        let defaults = MarkerSettings::default();
        MarkerSettings {
            toc: self.toc.unwrap_or(defaults.toc),
            page_break: self.page_break.unwrap_or(defaults.page_break),
            appendix: self.appendix.unwrap_or(defaults.appendix),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct StylesPartial {
    heading: Option<Vec<String>>,
    appendix_heading: Option<Vec<String>>,
    bullet_list: Option<String>,
    numbered_list: Option<String>,
    table: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
    header: Option<String>,
    footer: Option<String>,
    measure: Option<String>,
    toc_heading: Option<String>,
}

impl StylesPartial {
    fn merge(&mut self, other: StylesPartial) {
        take_if_some!(
            self,
            other,
            heading,
            appendix_heading,
            bullet_list,
            numbered_list,
            table,
            title,
            subtitle,
            header,
            footer,
            measure,
            toc_heading,
        );
    }

    fn finalize(self, errors: &mut Vec<ConfigValidationError>) -> StyleNames {
        let defaults = StyleNames::default();
        let heading = self.heading.unwrap_or(defaults.heading);
        if heading.len() != 5 {
            errors.push(
                ConfigValidationError::new(
                    None,
                    format!("exactly 5 heading styles are required (received {})", heading.len()),
                )
                .with_context("styles.heading"),
            );
        }
        let appendix_heading = self.appendix_heading.unwrap_or(defaults.appendix_heading);
        if appendix_heading.is_empty() || appendix_heading.len() > 5 {
            errors.push(
                ConfigValidationError::new(
                    None,
                    format!(
                        "between 1 and 5 appendix heading styles are required (received {})",
                        appendix_heading.len()
                    ),
                )
                .with_context("styles.appendix_heading"),
            );
        }
        StyleNames {
            heading,
            appendix_heading,
            bullet_list: self.bullet_list.unwrap_or(defaults.bullet_list),
            numbered_list: self.numbered_list.unwrap_or(defaults.numbered_list),
            table: self.table.unwrap_or(defaults.table),
            title: self.title.unwrap_or(defaults.title),
            subtitle: self.subtitle.unwrap_or(defaults.subtitle),
            header: self.header.unwrap_or(defaults.header),
            footer: self.footer.unwrap_or(defaults.footer),
            measure: self.measure.unwrap_or(defaults.measure),
            toc_heading: self.toc_heading.unwrap_or(defaults.toc_heading),
        }
    }
}

#[derive(Clone, Debug)]
struct ResolvedSettings {
    input_file: PathBuf,
    output_path: PathBuf,
    build_path: PathBuf,
    image_path: PathBuf,
    title: String,
    subtitle: Option<String>,
    document_type: DocumentType,
    version: String,
    date: String,
    include_front_page: bool,
    include_markdown_source: bool,
    include_table_of_contents: bool,
    toc_title: String,
    output_formats: Vec<OutputFormat>,
    reference_template: Option<PathBuf>,
    front_page_image: Option<PathBuf>,
    variables_files: Vec<PathBuf>,
    variables: BTreeMap<String, String>,
    markers: MarkerSettings,
    styles: StyleNames,
    docx: DocxSettings,
    html: HtmlSettings,
    pdf: PdfSettings,
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    input_file: Option<PathBuf>,
    output_path: Option<PathBuf>,
    build_path: Option<PathBuf>,
    image_path: Option<PathBuf>,
    title: Option<String>,
    subtitle: Option<String>,
    document_type: Option<String>,
    version: Option<String>,
    date: Option<String>,
    include_front_page: Option<bool>,
    include_markdown_source: Option<bool>,
    include_table_of_contents: Option<bool>,
    toc_title: Option<String>,
    output_formats: Option<Vec<String>>,
    reference_template: Option<PathBuf>,
    front_page_image: Option<PathBuf>,
    variables_files: Option<Vec<PathBuf>>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    markers: Option<RawMarkers>,
    styles: Option<RawStyles>,
    docx: Option<RawDocx>,
    html: Option<RawHtml>,
    pdf: Option<RawPdf>,
}

impl RawSettings {
    fn into_partial(self, source: ConfigSource) -> SettingsPartial {
        let locate = |path: PathBuf| Located::new(path, source.clone());
        let markers = self.markers.unwrap_or_default();
        let styles = self.styles.unwrap_or_default();
        let docx = self.docx.unwrap_or_default();
        let html = self.html.unwrap_or_default();
        let pdf = self.pdf.unwrap_or_default();

        SettingsPartial {
            input_file: self.input_file.map(locate),
            output_path: self.output_path.map(locate),
            build_path: self.build_path.map(locate),
            image_path: self.image_path.map(locate),
            title: self.title.map(|title| Located::new(title, source.clone())),
            subtitle: self.subtitle,
            document_type: self
                .document_type
                .map(|kind| Located::new(kind, source.clone())),
            version: self.version,
            date: self.date,
            include_front_page: self.include_front_page,
            include_markdown_source: self.include_markdown_source,
            include_table_of_contents: self.include_table_of_contents,
            toc_title: self.toc_title,
            output_formats: self
                .output_formats
                .map(|formats| Located::new(formats, source.clone())),
            reference_template: self.reference_template.map(locate),
            front_page_image: self.front_page_image.map(locate),
            variables_files: self
                .variables_files
                .map(|files| files.into_iter().map(locate).collect()),
            variables: self.variables,
            markers: MarkersPartial {
                toc: markers.toc,
                page_break: markers.page_break,
                appendix: markers.appendix,
            },
            styles: StylesPartial {
                heading: styles.heading,
                appendix_heading: styles.appendix_heading,
                bullet_list: styles.bullet_list,
                numbered_list: styles.numbered_list,
                table: styles.table,
                title: styles.title,
                subtitle: styles.subtitle,
                header: styles.header,
                footer: styles.footer,
                measure: styles.measure,
                toc_heading: styles.toc_heading,
            },
            docx_output_file: docx.output_file,
            html_output_file: html.output_file,
            html_stylesheet: html.stylesheet.map(locate),
            pdf_output_file: pdf.output_file,
            pdf_renderer: pdf.renderer.map(locate),
            pdf_stylesheet: pdf.stylesheet.map(locate),
            pdf_args: pdf.args,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawMarkers {
    toc: Option<String>,
    page_break: Option<String>,
    appendix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStyles {
    heading: Option<Vec<String>>,
    appendix_heading: Option<Vec<String>>,
    bullet_list: Option<String>,
    numbered_list: Option<String>,
    table: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
    header: Option<String>,
    footer: Option<String>,
    measure: Option<String>,
    toc_heading: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDocx {
    output_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHtml {
    output_file: Option<PathBuf>,
    stylesheet: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPdf {
    output_file: Option<PathBuf>,
    renderer: Option<PathBuf>,
    stylesheet: Option<PathBuf>,
    args: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parsing_is_case_insensitive() {
        assert_eq!("DOCX".parse::<OutputFormat>(), Ok(OutputFormat::Docx));
        assert_eq!(" pdf ".parse::<OutputFormat>(), Ok(OutputFormat::Pdf));
        assert!("pptx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn missing_required_fields_are_reported_together() {
        let partial = SettingsPartial {
            output_formats: Some(Located::new(
                vec!["docx".into(), "rtf".into()],
                ConfigSource::default(PathBuf::from(".")),
            )),
            ..SettingsPartial::default()
        };

        let errors = partial.finalize().unwrap_err();
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert!(messages.iter().any(|m| m.contains("input_file is required")));
        assert!(messages.iter().any(|m| m.contains("title is required")));
        assert!(messages.iter().any(|m| m.contains("unknown output format 'rtf'")));
        assert!(messages.iter().any(|m| m.contains("reference_template")));
    }
}
