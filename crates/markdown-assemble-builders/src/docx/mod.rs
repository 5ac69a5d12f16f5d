//! DOCX output built on a copy of a reference template.
//!
//! The template supplies styles, numbering definitions, page setup and any
//! existing front matter parts. The builder replaces the body of
//! `word/document.xml`, appends numbering instances and relationships, adds
//! media plus header and footer parts, then writes a new package.

mod numbering;
mod package;
mod picture;
mod styles;
mod xml;

use std::path::{Path, PathBuf};

use markdown_assemble_config::{OutputFormat, Settings, StyleNames};
use markdown_assemble_parser::{Alignment, Fragment, ParagraphContext, Table};
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use regex::Regex;
use tracing::{debug, info};

use self::numbering::{Numbering, NUMBERING_PART};
use self::package::Package;
use self::styles::ResolvedStyles;
use self::xml::{
    ensure_namespace, field, paragraph, runs, ContentTypes, ParagraphProps, RelationshipKind,
    Relationships, CONTENT_TYPES_PART, NS_A, NS_PIC, NS_R, NS_W, NS_WP, RELS_PART,
};
use crate::builder::Builder;
use crate::error::{BuildError, BuildResult};

pub use self::picture::{
    extent_emu, read_image_info, ImageFormat, ImageInfo, DEFAULT_DPI, EMU_PER_INCH,
    MAX_PICTURE_WIDTH_EMU,
};
pub use self::styles::StyleMap;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

const REQUIRED_PARTS: &[&str] = &[
    DOCUMENT_PART,
    STYLES_PART,
    NUMBERING_PART,
    RELS_PART,
    CONTENT_TYPES_PART,
];

const HEADER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
const FOOTER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";

const TOC_INSTRUCTION: &str = r#"TOC \o "1-3" \h \z \u"#;
const TOC_PLACEHOLDER: &str = "Update the field to build the table of contents.";

static SECTION_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<w:(?:header|footer)Reference\b[^>]*/>").expect("reference pattern is valid")
});

pub struct DocxBuilder {
    output: PathBuf,
    package: Package,
    styles: ResolvedStyles,
    numbering: Numbering,
    bullet_abstract: u32,
    numbered_abstract: u32,
    relationships: Relationships,
    content_types: ContentTypes,
    toc_title: String,
    body: String,
    /// Numbering instance of each open list, outermost first.
    lists: Vec<u32>,
    section_references: Vec<String>,
    media_count: usize,
    drawing_id: u32,
}

impl DocxBuilder {
    /// Open `template` and resolve every style the builder writes.
    pub fn new(
        template: &Path,
        style_names: &StyleNames,
        toc_title: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> BuildResult<Self> {
        let package = Package::open(template)?;
        for part in REQUIRED_PARTS {
            if !package.contains(part) {
                return Err(BuildError::InvalidPart {
                    part: (*part).to_string(),
                });
            }
        }

        let style_map = StyleMap::from_xml(&package.text(STYLES_PART)?)?;
        let styles = style_map.resolve(style_names)?;
        let numbering = Numbering::parse(package.text(NUMBERING_PART)?)?;

        let bullet_abstract = list_binding(
            &style_map,
            &numbering,
            &styles.bullet_list,
            &style_names.bullet_list,
        )?;
        let numbered_abstract = list_binding(
            &style_map,
            &numbering,
            &styles.numbered_list,
            &style_names.numbered_list,
        )?;
        debug!(
            template = %package.source().display(),
            bullet_abstract,
            numbered_abstract,
            "reference template loaded"
        );

        Ok(Self {
            output: output.into(),
            relationships: Relationships::new(package.text(RELS_PART)?),
            content_types: ContentTypes::new(package.text(CONTENT_TYPES_PART)?),
            package,
            styles,
            numbering,
            bullet_abstract,
            numbered_abstract,
            toc_title: toc_title.into(),
            body: String::new(),
            lists: Vec::new(),
            section_references: Vec::new(),
            media_count: 0,
            drawing_id: 0,
        })
    }

    /// Builder for the run described by `settings`, writing to the configured
    /// DOCX output file.
    pub fn from_settings(settings: &Settings) -> BuildResult<Self> {
        let template = settings
            .reference_template
            .as_deref()
            .ok_or_else(|| BuildError::MissingFile {
                path: PathBuf::from("reference_template"),
            })?;
        Self::new(
            template,
            &settings.styles,
            settings.toc_title.clone(),
            settings.output_file_for(OutputFormat::Docx),
        )
    }

    fn linked_runs(&mut self, fragments: &[Fragment]) -> String {
        let relationships = &mut self.relationships;
        runs(fragments, |target| {
            Some(relationships.add(RelationshipKind::Hyperlink, target))
        })
    }

    fn push_paragraph(&mut self, props: ParagraphProps<'_>, fragments: &[Fragment]) {
        let runs = self.linked_runs(fragments);
        paragraph(&mut self.body, &props, &runs);
    }

    /// Write a header or footer part and remember its section reference.
    fn add_section_part(&mut self, kind: RelationshipKind, content: &str) {
        let (root, stem, content_type, reference) = match kind {
            RelationshipKind::Header => ("w:hdr", "header", HEADER_CONTENT_TYPE, "headerReference"),
            _ => ("w:ftr", "footer", FOOTER_CONTENT_TYPE, "footerReference"),
        };
        let target = format!("{stem}_asm.xml");
        let part_name = format!("word/{target}");
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><{root} xmlns:w="{NS_W}" xmlns:r="{NS_R}">{content}</{root}>"#
        );

        self.package.set(&part_name, xml.into_bytes());
        self.content_types.add_override(&part_name, content_type);
        let id = self.relationships.add(kind, &target);
        self.section_references
            .push(format!(r#"<w:{reference} w:type="default" r:id="{id}"/>"#));
    }

    fn assemble_document(&self) -> BuildResult<String> {
        let mut document = self.package.text(DOCUMENT_PART)?;
        ensure_namespace(DOCUMENT_PART, &mut document, "w:document", "r", NS_R)?;
        ensure_namespace(DOCUMENT_PART, &mut document, "w:document", "wp", NS_WP)?;

        let body_open = find_start_tag(&document, "w:body")
            .ok_or_else(|| BuildError::xml(DOCUMENT_PART, "missing <w:body>"))?;
        let body_close = document
            .rfind("</w:body>")
            .ok_or_else(|| BuildError::xml(DOCUMENT_PART, "missing </w:body>"))?;

        let section = document[body_open..body_close]
            .rfind("<w:sectPr")
            .map(|offset| &document[body_open + offset..body_close]);
        let section = self.section_properties(section);

        let mut assembled = String::with_capacity(document.len() + self.body.len());
        assembled.push_str(&document[..body_open]);
        assembled.push_str(&self.body);
        assembled.push_str(&section);
        assembled.push_str(&document[body_close..]);
        Ok(assembled)
    }

    /// Final section properties with the template's header and footer
    /// references swapped for ours.
    fn section_properties(&self, existing: Option<&str>) -> String {
        let references = self.section_references.concat();
        let Some(existing) = existing else {
            return format!("<w:sectPr>{references}</w:sectPr>");
        };
        if self.section_references.is_empty() {
            return existing.to_string();
        }

        let stripped = SECTION_REFERENCE.replace_all(existing, "");
        let Some(tag_end) = stripped.find('>') else {
            return format!("<w:sectPr>{references}</w:sectPr>");
        };
        if stripped[..tag_end].ends_with('/') {
            let open = &stripped[..tag_end - 1];
            return format!("{}>{references}</w:sectPr>", open.trim_end());
        }
        format!(
            "{}{references}{}",
            &stripped[..=tag_end],
            &stripped[tag_end + 1..]
        )
    }
}

/// Byte offset just past the opening tag `<name ...>`.
fn find_start_tag(xml: &str, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    let mut from = 0;
    while let Some(offset) = xml[from..].find(&needle) {
        let start = from + offset;
        let after = start + needle.len();
        match xml[after..].chars().next() {
            Some('>') | Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                return xml[start..].find('>').map(|end| start + end + 1);
            }
            _ => from = after,
        }
    }
    None
}

fn list_binding(
    style_map: &StyleMap,
    numbering: &Numbering,
    style_id: &str,
    style_name: &str,
) -> BuildResult<u32> {
    numbering
        .abstract_for_style(style_id, style_map.num_id_for(style_id))
        .ok_or_else(|| BuildError::MissingStyle {
            name: style_name.to_string(),
            role: "list numbering definition".to_string(),
        })
}

fn justification(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
    }
}

impl Builder for DocxBuilder {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn start_document(&mut self, title: &str) -> BuildResult<()> {
        self.body.clear();
        self.lists.clear();
        info!(title, output = %self.output.display(), "building docx");
        Ok(())
    }

    fn end_document(&mut self) -> BuildResult<()> {
        let document = self.assemble_document()?;

        let numbering = self.numbering.to_xml()?;
        let relationships = self.relationships.to_xml()?;
        let content_types = self.content_types.to_xml()?;

        self.package.set(DOCUMENT_PART, document.into_bytes());
        self.package.set(NUMBERING_PART, numbering.into_bytes());
        self.package.set(RELS_PART, relationships.into_bytes());
        self.package.set(CONTENT_TYPES_PART, content_types.into_bytes());

        self.package.write(&self.output)?;
        info!(output = %self.output.display(), "docx written");
        Ok(())
    }

    fn build_header(&mut self, fragments: &[Fragment]) -> BuildResult<()> {
        let mut content = String::new();
        let props = ParagraphProps {
            style: Some(self.styles.header.as_str()),
            justify: Some("right"),
            numbering: None,
        };
        paragraph(&mut content, &props, &runs(fragments, |_| None));
        self.add_section_part(RelationshipKind::Header, &content);
        Ok(())
    }

    fn build_footer(&mut self) -> BuildResult<()> {
        let mut content = String::new();
        let props = ParagraphProps {
            style: Some(self.styles.footer.as_str()),
            justify: Some("center"),
            numbering: None,
        };
        paragraph(&mut content, &props, &field("PAGE", "1"));
        self.add_section_part(RelationshipKind::Footer, &content);
        Ok(())
    }

    fn build_table_of_contents(&mut self) -> BuildResult<()> {
        let title = [Fragment::plain(self.toc_title.clone())];
        let heading_style = self.styles.toc_heading.clone();
        self.push_paragraph(
            ParagraphProps {
                style: heading_style.as_deref(),
                ..ParagraphProps::default()
            },
            &title,
        );
        paragraph(
            &mut self.body,
            &ParagraphProps::default(),
            &field(TOC_INSTRUCTION, TOC_PLACEHOLDER),
        );
        Ok(())
    }

    fn create_heading(
        &mut self,
        level: u8,
        fragments: &[Fragment],
        is_appendix: bool,
    ) -> BuildResult<()> {
        let style = self.styles.heading(level, is_appendix).to_string();
        self.push_paragraph(
            ParagraphProps {
                style: Some(style.as_str()),
                ..ParagraphProps::default()
            },
            fragments,
        );
        Ok(())
    }

    fn start_list(&mut self, numbered: bool) -> BuildResult<()> {
        let abstract_id = if numbered {
            self.numbered_abstract
        } else {
            self.bullet_abstract
        };
        let num_id = self.numbering.restart(abstract_id, self.lists.len());
        self.lists.push(num_id);
        Ok(())
    }

    fn create_list_item(
        &mut self,
        level: usize,
        numbered: bool,
        fragments: &[Fragment],
    ) -> BuildResult<()> {
        let style = self.styles.list(numbered).to_string();
        let numbering = self
            .lists
            .last()
            .map(|num_id| (level.saturating_sub(1), *num_id));
        self.push_paragraph(
            ParagraphProps {
                style: Some(style.as_str()),
                justify: None,
                numbering,
            },
            fragments,
        );
        Ok(())
    }

    fn end_list(&mut self) -> BuildResult<()> {
        self.lists.pop();
        Ok(())
    }

    fn create_paragraph(
        &mut self,
        fragments: &[Fragment],
        context: ParagraphContext,
    ) -> BuildResult<()> {
        let style = match context {
            ParagraphContext::Body => None,
            ParagraphContext::Title => Some(self.styles.title.clone()),
            ParagraphContext::Subtitle => self.styles.subtitle.clone(),
            ParagraphContext::Measure => self.styles.measure.clone(),
        };
        self.push_paragraph(
            ParagraphProps {
                style: style.as_deref(),
                ..ParagraphProps::default()
            },
            fragments,
        );
        Ok(())
    }

    fn create_table(&mut self, table: &Table) -> BuildResult<()> {
        let mut xml = format!(
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="{}"/><w:tblW w:w="5000" w:type="pct"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="1" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr><w:tblGrid>"#,
            escape(&self.styles.table)
        );
        for _ in 0..table.column_count() {
            xml.push_str("<w:gridCol/>");
        }
        xml.push_str("</w:tblGrid>");

        let rows = std::iter::once((true, &table.header))
            .chain(table.rows.iter().map(|row| (false, row)));
        for (is_header, row) in rows {
            xml.push_str("<w:tr>");
            if is_header {
                xml.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            for (column, cell) in row.iter().enumerate() {
                let cell_runs = self.linked_runs(cell);
                xml.push_str("<w:tc>");
                paragraph(
                    &mut xml,
                    &ParagraphProps {
                        justify: Some(justification(table.alignment(column))),
                        ..ParagraphProps::default()
                    },
                    &cell_runs,
                );
                xml.push_str("</w:tc>");
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");

        self.body.push_str(&xml);
        Ok(())
    }

    fn insert_page_break(&mut self) -> BuildResult<()> {
        self.body
            .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        Ok(())
    }

    fn insert_picture(&mut self, path: &Path, alt: &str) -> BuildResult<()> {
        let (info, bytes) = read_image_info(path)?;
        let (cx, cy) = extent_emu(&info);

        self.media_count += 1;
        self.drawing_id += 1;
        let extension = info.format.extension();
        let target = format!("media/asm_image{}.{extension}", self.media_count);
        self.package.set(&format!("word/{target}"), bytes);
        self.content_types
            .ensure_default(extension, info.format.content_type());
        let rel_id = self.relationships.add(RelationshipKind::Image, &target);

        let id = self.drawing_id;
        let name = escape(
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
                .as_str(),
        )
        .into_owned();
        let descr = escape(alt).into_owned();
        self.body.push_str(&format!(
            concat!(
                r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:drawing>"#,
                r#"<wp:inline distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
                r#"<wp:docPr id="{id}" name="Picture {id}" descr="{descr}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="{ns_a}" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic xmlns:a="{ns_a}"><a:graphicData uri="{ns_pic}">"#,
                r#"<pic:pic xmlns:pic="{ns_pic}">"#,
                r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
                r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
            ),
            cx = cx,
            cy = cy,
            id = id,
            descr = descr,
            name = name,
            rel_id = rel_id,
            ns_a = NS_A,
            ns_pic = NS_PIC,
        ));
        debug!(path = %path.display(), cx, cy, "embedded picture");
        Ok(())
    }
}
