//! Standalone HTML output, also used as the source for PDF rendering.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use html_escape::{encode_double_quoted_attribute, encode_text};
use markdown_assemble_config::{OutputFormat, Settings};
use markdown_assemble_parser::{
    generate_anchor, plain_text, Alignment, Fragment, FragmentStyle, ParagraphContext, Table,
};
use markdown_assemble_utils::{atomic_write, atomic_write_bytes};
use tracing::{info, warn};

use crate::builder::Builder;
use crate::error::{BuildError, BuildResult};

/// Deepest heading level listed in the generated table of contents.
const TOC_DEPTH: u8 = 3;
/// Directory, relative to the HTML file, that pictures are copied into.
const IMAGE_DIR: &str = "images";

#[derive(Debug)]
struct TocEntry {
    level: u8,
    anchor: String,
    text: String,
}

/// A file copied next to the HTML output and linked by `target`.
#[derive(Debug)]
struct Asset {
    source: PathBuf,
    target: String,
}

#[derive(Debug)]
struct OpenList {
    numbered: bool,
    item_open: bool,
}

pub struct HtmlBuilder {
    output: PathBuf,
    stylesheet: Option<PathBuf>,
    stylesheet_href: Option<String>,
    assets: Vec<Asset>,
    toc_title: String,
    title: String,
    header: String,
    footer: String,
    body: String,
    lists: Vec<OpenList>,
    headings: Vec<TocEntry>,
    anchors: HashMap<String, usize>,
    /// Byte offset in `body` where the table of contents is spliced in.
    toc_at: Option<usize>,
}

impl HtmlBuilder {
    pub fn new(
        output: impl Into<PathBuf>,
        stylesheet: Option<PathBuf>,
        toc_title: impl Into<String>,
    ) -> Self {
        Self {
            output: output.into(),
            stylesheet,
            stylesheet_href: None,
            assets: Vec::new(),
            toc_title: toc_title.into(),
            title: String::new(),
            header: String::new(),
            footer: String::new(),
            body: String::new(),
            lists: Vec::new(),
            headings: Vec::new(),
            anchors: HashMap::new(),
            toc_at: None,
        }
    }

    /// Builder writing the configured HTML output file.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.output_file_for(OutputFormat::Html),
            settings.html.stylesheet.clone(),
            settings.toc_title.clone(),
        )
    }

    /// Unique anchor for a heading; repeats get the first free numeric
    /// suffix.
    fn anchor_for(&mut self, text: &str) -> String {
        let mut base = generate_anchor(text);
        if base.is_empty() {
            base = "section".to_string();
        }

        let mut suffix = self.anchors.get(&base).copied().unwrap_or(0);
        let mut candidate = base.clone();
        while self.anchors.contains_key(&candidate) {
            suffix += 1;
            candidate = format!("{base}-{suffix}");
        }
        self.anchors.insert(base.clone(), suffix);
        if candidate != base {
            self.anchors.insert(candidate.clone(), 0);
        }
        candidate
    }

    /// Relative link for `source` inside the output directory. Each source
    /// is copied once; clashing file names get a numeric suffix.
    fn stage_asset(&mut self, source: &Path, dir: Option<&str>) -> String {
        if let Some(asset) = self.assets.iter().find(|asset| asset.source == source) {
            return asset.target.clone();
        }

        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string());
        let extension = source
            .extension()
            .map(|extension| format!(".{}", extension.to_string_lossy()))
            .unwrap_or_default();
        let prefix = dir.map(|dir| format!("{dir}/")).unwrap_or_default();

        let mut target = format!("{prefix}{stem}{extension}");
        let mut suffix = 0;
        while self.assets.iter().any(|asset| asset.target == target) {
            suffix += 1;
            target = format!("{prefix}{stem}-{suffix}{extension}");
        }
        self.assets.push(Asset {
            source: source.to_path_buf(),
            target: target.clone(),
        });
        target
    }

    fn copy_assets(&self) -> BuildResult<()> {
        let root = self
            .output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        for asset in &self.assets {
            let destination = root.join(&asset.target);
            if destination == asset.source {
                continue;
            }
            let bytes = fs::read(&asset.source).map_err(|source| BuildError::Io {
                path: asset.source.clone(),
                source,
            })?;
            atomic_write_bytes(&destination, &bytes).map_err(|source| BuildError::Io {
                path: destination.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn render_toc(&self) -> String {
        let mut nav = String::from("<nav class=\"toc\">\n");
        nav.push_str(&format!("<h2>{}</h2>\n<ul>\n", encode_text(&self.toc_title)));
        for entry in self.headings.iter().filter(|entry| entry.level <= TOC_DEPTH) {
            nav.push_str(&format!(
                "<li class=\"toc-level-{}\"><a href=\"#{}\">{}</a></li>\n",
                entry.level,
                encode_double_quoted_attribute(&entry.anchor),
                encode_text(&entry.text),
            ));
        }
        nav.push_str("</ul>\n</nav>\n");
        nav
    }

    fn render_document(&self) -> String {
        let mut body = self.body.clone();
        if let Some(at) = self.toc_at {
            body.insert_str(at, &self.render_toc());
        }

        let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", encode_text(&self.title)));
        if let Some(href) = &self.stylesheet_href {
            html.push_str(&format!(
                "<link rel=\"stylesheet\" href=\"{}\">\n",
                encode_double_quoted_attribute(href)
            ));
        }
        html.push_str("</head>\n<body>\n");
        html.push_str(&self.header);
        html.push_str("<main>\n");
        html.push_str(&body);
        html.push_str("</main>\n");
        html.push_str(&self.footer);
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn inline_html(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        let text = encode_text(&fragment.text);
        match &fragment.style {
            FragmentStyle::Plain => out.push_str(&text),
            FragmentStyle::Bold => out.push_str(&format!("<strong>{text}</strong>")),
            FragmentStyle::Italic => out.push_str(&format!("<em>{text}</em>")),
            FragmentStyle::Strikethrough => out.push_str(&format!("<del>{text}</del>")),
            FragmentStyle::Instruction => {
                out.push_str(&format!("<mark class=\"instruction\">{text}</mark>"))
            }
            FragmentStyle::Link { target } => out.push_str(&format!(
                "<a href=\"{}\">{text}</a>",
                encode_double_quoted_attribute(target)
            )),
        }
    }
    out
}

fn align_attribute(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "",
        Alignment::Center => " style=\"text-align: center\"",
        Alignment::Right => " style=\"text-align: right\"",
    }
}

impl Builder for HtmlBuilder {
    fn name(&self) -> &'static str {
        "html"
    }

    fn start_document(&mut self, title: &str) -> BuildResult<()> {
        self.title = title.to_string();
        self.body.clear();
        self.lists.clear();
        self.headings.clear();
        self.anchors.clear();
        self.toc_at = None;
        self.assets.clear();
        self.stylesheet_href = None;

        if let Some(stylesheet) = self.stylesheet.clone() {
            if !stylesheet.is_file() {
                return Err(BuildError::MissingFile { path: stylesheet });
            }
            self.stylesheet_href = Some(self.stage_asset(&stylesheet, None));
        }
        info!(title, output = %self.output.display(), "building html");
        Ok(())
    }

    fn end_document(&mut self) -> BuildResult<()> {
        self.copy_assets()?;
        let html = self.render_document();
        atomic_write(&self.output, &html).map_err(|source| BuildError::Io {
            path: self.output.clone(),
            source,
        })?;
        info!(output = %self.output.display(), "html written");
        Ok(())
    }

    fn build_header(&mut self, fragments: &[Fragment]) -> BuildResult<()> {
        self.header = format!(
            "<header class=\"page-header\">{}</header>\n",
            inline_html(fragments)
        );
        Ok(())
    }

    fn build_footer(&mut self) -> BuildResult<()> {
        self.footer = format!(
            "<footer class=\"page-footer\">{}</footer>\n",
            encode_text(&self.title)
        );
        Ok(())
    }

    fn build_table_of_contents(&mut self) -> BuildResult<()> {
        if self.toc_at.is_some() {
            warn!("table of contents already placed; ignoring repeated request");
            return Ok(());
        }
        self.toc_at = Some(self.body.len());
        Ok(())
    }

    fn create_heading(
        &mut self,
        level: u8,
        fragments: &[Fragment],
        is_appendix: bool,
    ) -> BuildResult<()> {
        let level = level.clamp(1, 5);
        let text = plain_text(fragments);
        let anchor = self.anchor_for(&text);
        let class = if is_appendix { " class=\"appendix\"" } else { "" };
        self.body.push_str(&format!(
            "<h{level} id=\"{}\"{class}>{}</h{level}>\n",
            encode_double_quoted_attribute(&anchor),
            inline_html(fragments),
        ));
        self.headings.push(TocEntry {
            level,
            anchor,
            text,
        });
        Ok(())
    }

    fn start_list(&mut self, numbered: bool) -> BuildResult<()> {
        self.body.push_str(if numbered { "<ol>\n" } else { "<ul>\n" });
        self.lists.push(OpenList {
            numbered,
            item_open: false,
        });
        Ok(())
    }

    fn create_list_item(
        &mut self,
        _level: usize,
        _numbered: bool,
        fragments: &[Fragment],
    ) -> BuildResult<()> {
        if let Some(list) = self.lists.last_mut() {
            if list.item_open {
                self.body.push_str("</li>\n");
            }
            list.item_open = true;
        }
        self.body.push_str("<li>");
        self.body.push_str(&inline_html(fragments));
        Ok(())
    }

    fn end_list(&mut self) -> BuildResult<()> {
        if let Some(list) = self.lists.pop() {
            if list.item_open {
                self.body.push_str("</li>\n");
            }
            self.body
                .push_str(if list.numbered { "</ol>\n" } else { "</ul>\n" });
        }
        Ok(())
    }

    fn create_paragraph(
        &mut self,
        fragments: &[Fragment],
        context: ParagraphContext,
    ) -> BuildResult<()> {
        let class = match context {
            ParagraphContext::Body => "",
            ParagraphContext::Title => " class=\"title\"",
            ParagraphContext::Subtitle => " class=\"subtitle\"",
            ParagraphContext::Measure => " class=\"measure\"",
        };
        self.body
            .push_str(&format!("<p{class}>{}</p>\n", inline_html(fragments)));
        Ok(())
    }

    fn create_table(&mut self, table: &Table) -> BuildResult<()> {
        let mut html = String::from("<table>\n<thead>\n<tr>");
        for (column, cell) in table.header.iter().enumerate() {
            html.push_str(&format!(
                "<th{}>{}</th>",
                align_attribute(table.alignment(column)),
                inline_html(cell)
            ));
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");
        for row in &table.rows {
            html.push_str("<tr>");
            for (column, cell) in row.iter().enumerate() {
                html.push_str(&format!(
                    "<td{}>{}</td>",
                    align_attribute(table.alignment(column)),
                    inline_html(cell)
                ));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
        self.body.push_str(&html);
        Ok(())
    }

    fn insert_page_break(&mut self) -> BuildResult<()> {
        self.body
            .push_str("<div class=\"page-break\" style=\"page-break-after: always\"></div>\n");
        Ok(())
    }

    fn insert_picture(&mut self, path: &Path, alt: &str) -> BuildResult<()> {
        if !path.is_file() {
            return Err(BuildError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let src = self.stage_asset(path, Some(IMAGE_DIR));
        self.body.push_str(&format!(
            "<figure><img src=\"{}\" alt=\"{}\"></figure>\n",
            encode_double_quoted_attribute(&src),
            encode_double_quoted_attribute(alt),
        ));
        Ok(())
    }
}
