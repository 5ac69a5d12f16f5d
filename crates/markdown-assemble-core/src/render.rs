//! Walks a parsed document and drives one builder per output format.

use std::path::PathBuf;

use markdown_assemble_builders::{Builder, DocxBuilder, HtmlBuilder};
use markdown_assemble_config::{DocumentType, OutputFormat, Settings};
use markdown_assemble_parser::{Document, Fragment, Node, NodeKind, ParagraphContext};
use markdown_assemble_utils::parallel_map;
use tracing::{debug, info, trace};

use crate::error::{AssembleError, AssembleResult, RenderError, RenderResult};
use crate::pdf;

/// Fold state of one render pass.
#[derive(Debug, Default)]
struct WalkContext {
    /// Kinds of the open lists, outermost first; `true` is numbered.
    lists: Vec<bool>,
    appendix: bool,
    summary: RenderSummary,
}

impl WalkContext {
    /// Track list nesting, rejecting items and ends that have no open list.
    fn observe(&mut self, node: &Node) -> RenderResult<()> {
        match node {
            Node::ListStart { numbered } => self.lists.push(*numbered),
            Node::ListItem { .. } if self.lists.is_empty() => {
                return Err(RenderError::InvalidStructure(
                    "list item outside of a list".to_string(),
                ))
            }
            Node::ListItem { .. } => self.summary.list_items += 1,
            Node::ListEnd => {
                if self.lists.pop().is_none() {
                    return Err(RenderError::InvalidStructure(
                        "list end without a matching list start".to_string(),
                    ));
                }
            }
            Node::Heading { is_appendix, .. } => {
                if *is_appendix != self.appendix {
                    debug!(appendix = *is_appendix, "appendix mode switched");
                    self.appendix = *is_appendix;
                }
                self.summary.headings += 1;
                if self.appendix {
                    self.summary.appendix_headings += 1;
                }
            }
            Node::Image { .. } => self.summary.pictures += 1,
            _ => {}
        }
        Ok(())
    }
}

/// Counters reported after a pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub headings: usize,
    pub appendix_headings: usize,
    pub list_items: usize,
    pub pictures: usize,
    pub skipped: usize,
}

/// Run one complete pass of `document` through `builder`.
pub fn render(
    document: &Document,
    settings: &Settings,
    builder: &mut dyn Builder,
) -> RenderResult<RenderSummary> {
    builder.start_document(&settings.title)?;

    if settings.include_front_page {
        front_page(settings, builder)?;
    }
    if settings.include_table_of_contents
        && !document.has_table_of_contents()
        && builder.supports(NodeKind::TableOfContents)
    {
        builder.build_table_of_contents()?;
    }

    let mut context = WalkContext::default();
    for node in document.nodes() {
        context.observe(node)?;
        if !builder.supports(node.kind()) {
            trace!(builder = builder.name(), kind = ?node.kind(), "skipping unsupported node");
            context.summary.skipped += 1;
            continue;
        }
        dispatch(node, builder)?;
    }
    if !context.lists.is_empty() {
        return Err(RenderError::InvalidStructure(format!(
            "{} list(s) left open at end of document",
            context.lists.len()
        )));
    }

    builder.build_header(&[Fragment::plain(settings.title.clone())])?;
    builder.build_footer()?;
    builder.end_document()?;

    info!(
        builder = builder.name(),
        headings = context.summary.headings,
        appendix_headings = context.summary.appendix_headings,
        list_items = context.summary.list_items,
        pictures = context.summary.pictures,
        "render pass finished"
    );
    Ok(context.summary)
}

fn dispatch(node: &Node, builder: &mut dyn Builder) -> RenderResult<()> {
    match node {
        Node::Heading {
            level,
            is_appendix,
            fragments,
        } => builder.create_heading(*level, fragments, *is_appendix)?,
        Node::Paragraph { fragments, context } => builder.create_paragraph(fragments, *context)?,
        Node::ListStart { numbered } => builder.start_list(*numbered)?,
        Node::ListItem {
            level,
            numbered,
            fragments,
        } => builder.create_list_item(*level, *numbered, fragments)?,
        Node::ListEnd => builder.end_list()?,
        Node::Table(table) => builder.create_table(table)?,
        Node::Image { path, alt, .. } => builder.insert_picture(path, alt)?,
        Node::PageBreak => builder.insert_page_break()?,
        Node::TableOfContents => builder.build_table_of_contents()?,
    }
    Ok(())
}

fn front_page(settings: &Settings, builder: &mut dyn Builder) -> RenderResult<()> {
    builder.create_paragraph(
        &[Fragment::plain(settings.title.clone())],
        ParagraphContext::Title,
    )?;
    if let Some(subtitle) = &settings.subtitle {
        builder.create_paragraph(&[Fragment::plain(subtitle.clone())], ParagraphContext::Subtitle)?;
    }

    let (version, date) = match settings.document_type {
        DocumentType::Document => (
            Fragment::plain(settings.version.clone()),
            Fragment::plain(settings.date.clone()),
        ),
        DocumentType::Template => (
            Fragment::instruction("{version number}"),
            Fragment::instruction("{date}"),
        ),
    };
    builder.create_paragraph(
        &[Fragment::plain("Version "), version],
        ParagraphContext::Subtitle,
    )?;
    builder.create_paragraph(&[Fragment::plain("Date "), date], ParagraphContext::Subtitle)?;

    if let Some(image) = &settings.front_page_image {
        if builder.supports(NodeKind::Image) {
            builder.insert_picture(image, "")?;
        }
    }
    if builder.supports(NodeKind::PageBreak) {
        builder.insert_page_break()?;
    }
    Ok(())
}

/// Builder for `format`. PDF passes write HTML into the build directory for
/// the external renderer.
pub fn builder_for(
    format: OutputFormat,
    settings: &Settings,
) -> Result<Box<dyn Builder>, RenderError> {
    let builder: Box<dyn Builder> = match format {
        OutputFormat::Docx => Box::new(DocxBuilder::from_settings(settings)?),
        OutputFormat::Html => Box::new(HtmlBuilder::from_settings(settings)),
        OutputFormat::Pdf => Box::new(HtmlBuilder::new(
            pdf::source_path(settings),
            settings.pdf.stylesheet.clone(),
            settings.toc_title.clone(),
        )),
    };
    Ok(builder)
}

fn run_pass(document: &Document, settings: &Settings, format: OutputFormat) -> AssembleResult<PathBuf> {
    let wrap = |source| AssembleError::Render { format, source };

    let mut builder = builder_for(format, settings).map_err(wrap)?;
    render(document, settings, builder.as_mut()).map_err(wrap)?;

    let output = settings.output_file_for(format);
    if format == OutputFormat::Pdf {
        pdf::render_pdf(&pdf::source_path(settings), &output, settings)?;
    }
    Ok(output)
}

/// Render every requested format. Passes run in parallel and share only the
/// document and settings; the first failure is returned.
pub fn render_all(document: &Document, settings: &Settings) -> AssembleResult<Vec<PathBuf>> {
    let formats = settings.output_formats.clone();
    parallel_map(formats, |format| run_pass(document, settings, format))
        .into_iter()
        .collect()
}
