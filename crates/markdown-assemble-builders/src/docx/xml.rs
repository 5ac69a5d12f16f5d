//! Small WordprocessingML writing helpers shared by the DOCX builder.

use std::collections::HashSet;

use markdown_assemble_parser::{Fragment, FragmentStyle};
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use quick_xml::events::BytesStart;
use regex::Regex;

use crate::error::{BuildError, BuildResult};

pub(crate) const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const NS_R: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const NS_WP: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(crate) const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/";
pub(crate) const RELS_PART: &str = "word/_rels/document.xml.rels";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

static RELATIONSHIP_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bId="([^"]+)""#).expect("relationship id pattern is valid"));
static DEFAULT_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<Default\s[^>]*Extension="([^"]+)""#).expect("default extension pattern is valid")
});

pub(crate) fn attribute(
    part: &str,
    element: &BytesStart<'_>,
    key: &[u8],
) -> BuildResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|err| BuildError::xml(part, err))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| BuildError::xml(part, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Add `xmlns:prefix` to the root element of `xml` when it is not declared.
pub(crate) fn ensure_namespace(
    part: &str,
    xml: &mut String,
    root: &str,
    prefix: &str,
    uri: &str,
) -> BuildResult<()> {
    let open = format!("<{root}");
    let start = xml
        .find(&open)
        .ok_or_else(|| BuildError::xml(part, format!("missing <{root}> element")))?;
    let end = xml[start..]
        .find('>')
        .map(|offset| start + offset)
        .ok_or_else(|| BuildError::xml(part, format!("unterminated <{root}> element")))?;
    if xml[start..end].contains(&format!("xmlns:{prefix}=")) {
        return Ok(());
    }
    xml.insert_str(end, &format!(r#" xmlns:{prefix}="{uri}""#));
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum RelationshipKind {
    Hyperlink,
    Image,
    Header,
    Footer,
}

impl RelationshipKind {
    fn type_name(self) -> &'static str {
        match self {
            RelationshipKind::Hyperlink => "hyperlink",
            RelationshipKind::Image => "image",
            RelationshipKind::Header => "header",
            RelationshipKind::Footer => "footer",
        }
    }
}

/// `document.xml.rels` with relationships appended during the run.
#[derive(Debug)]
pub(crate) struct Relationships {
    xml: String,
    taken: HashSet<String>,
    next: usize,
    added: Vec<String>,
}

impl Relationships {
    pub fn new(xml: String) -> Self {
        let taken = RELATIONSHIP_ID
            .captures_iter(&xml)
            .map(|captures| captures[1].to_string())
            .collect();
        Self {
            xml,
            taken,
            next: 1,
            added: Vec::new(),
        }
    }

    pub fn add(&mut self, kind: RelationshipKind, target: &str) -> String {
        let id = loop {
            let candidate = format!("rIdAsm{}", self.next);
            self.next += 1;
            if self.taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        let mode = match kind {
            RelationshipKind::Hyperlink => r#" TargetMode="External""#,
            _ => "",
        };
        self.added.push(format!(
            r#"<Relationship Id="{id}" Type="{REL_BASE}{}" Target="{}"{mode}/>"#,
            kind.type_name(),
            escape(target),
        ));
        id
    }

    pub fn to_xml(&self) -> BuildResult<String> {
        insert_before_close(RELS_PART, self.xml.clone(), "</Relationships>", &self.added)
    }
}

/// `[Content_Types].xml` with defaults and overrides appended during the run.
#[derive(Debug)]
pub(crate) struct ContentTypes {
    xml: String,
    extensions: HashSet<String>,
    added: Vec<String>,
}

impl ContentTypes {
    pub fn new(xml: String) -> Self {
        let extensions = DEFAULT_EXTENSION
            .captures_iter(&xml)
            .map(|captures| captures[1].to_lowercase())
            .collect();
        Self {
            xml,
            extensions,
            added: Vec::new(),
        }
    }

    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        if self.extensions.insert(extension.to_lowercase()) {
            self.added.push(format!(
                r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#
            ));
        }
    }

    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        self.added.push(format!(
            r#"<Override PartName="/{part_name}" ContentType="{content_type}"/>"#
        ));
    }

    pub fn to_xml(&self) -> BuildResult<String> {
        insert_before_close(CONTENT_TYPES_PART, self.xml.clone(), "</Types>", &self.added)
    }
}

fn insert_before_close(
    part: &str,
    mut xml: String,
    close: &str,
    added: &[String],
) -> BuildResult<String> {
    if added.is_empty() {
        return Ok(xml);
    }
    let at = xml
        .rfind(close)
        .ok_or_else(|| BuildError::xml(part, format!("missing {close}")))?;
    xml.insert_str(at, &added.concat());
    Ok(xml)
}

/// Paragraph properties: style, justification and optional numbering.
#[derive(Debug, Default)]
pub(crate) struct ParagraphProps<'a> {
    pub style: Option<&'a str>,
    pub justify: Option<&'a str>,
    pub numbering: Option<(usize, u32)>,
}

impl ParagraphProps<'_> {
    fn write(&self, out: &mut String) {
        if self.style.is_none() && self.justify.is_none() && self.numbering.is_none() {
            return;
        }
        out.push_str("<w:pPr>");
        if let Some(style) = self.style {
            out.push_str(&format!(r#"<w:pStyle w:val="{}"/>"#, escape(style)));
        }
        if let Some((level, num_id)) = self.numbering {
            out.push_str(&format!(
                r#"<w:numPr><w:ilvl w:val="{level}"/><w:numId w:val="{num_id}"/></w:numPr>"#
            ));
        }
        if let Some(justify) = self.justify {
            out.push_str(&format!(r#"<w:jc w:val="{justify}"/>"#));
        }
        out.push_str("</w:pPr>");
    }
}

pub(crate) fn paragraph(out: &mut String, props: &ParagraphProps<'_>, runs: &str) {
    out.push_str("<w:p>");
    props.write(out);
    out.push_str(runs);
    out.push_str("</w:p>");
}

pub(crate) fn text_run(text: &str, properties: &str) -> String {
    let mut run = String::from("<w:r>");
    if !properties.is_empty() {
        run.push_str("<w:rPr>");
        run.push_str(properties);
        run.push_str("</w:rPr>");
    }
    run.push_str(r#"<w:t xml:space="preserve">"#);
    run.push_str(&escape(text));
    run.push_str("</w:t></w:r>");
    run
}

/// Runs for `fragments`. Links get a relationship from `link` or, when it
/// returns `None`, are written as underlined text.
pub(crate) fn runs(
    fragments: &[Fragment],
    mut link: impl FnMut(&str) -> Option<String>,
) -> String {
    let mut out = String::new();
    for fragment in fragments {
        match &fragment.style {
            FragmentStyle::Plain => out.push_str(&text_run(&fragment.text, "")),
            FragmentStyle::Bold => out.push_str(&text_run(&fragment.text, "<w:b/>")),
            FragmentStyle::Italic => out.push_str(&text_run(&fragment.text, "<w:i/>")),
            FragmentStyle::Strikethrough => {
                out.push_str(&text_run(&fragment.text, "<w:strike/>"))
            }
            FragmentStyle::Instruction => out.push_str(&text_run(
                &fragment.text,
                r#"<w:highlight w:val="yellow"/>"#,
            )),
            FragmentStyle::Link { target } => {
                let run = text_run(
                    &fragment.text,
                    r#"<w:color w:val="0563C1"/><w:u w:val="single"/>"#,
                );
                match link(target) {
                    Some(id) => {
                        out.push_str(&format!(r#"<w:hyperlink r:id="{id}">"#));
                        out.push_str(&run);
                        out.push_str("</w:hyperlink>");
                    }
                    None => out.push_str(&run),
                }
            }
        }
    }
    out
}

pub(crate) fn field(instruction: &str, placeholder: &str) -> String {
    format!(
        concat!(
            r#"<w:r><w:fldChar w:fldCharType="begin" w:dirty="true"/></w:r>"#,
            r#"<w:r><w:instrText xml:space="preserve"> {} </w:instrText></w:r>"#,
            r#"<w:r><w:fldChar w:fldCharType="separate"/></w:r>"#,
            "{}",
            r#"<w:r><w:fldChar w:fldCharType="end"/></w:r>"#,
        ),
        escape(instruction),
        text_run(placeholder, ""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_runs_and_escapes_text() {
        let fragments = vec![
            Fragment::bold("a<b"),
            Fragment::instruction("{name}"),
            Fragment::link("site", "https://example.org/?a=1&b=2"),
        ];
        let out = runs(&fragments, |_| Some("rId9".to_string()));
        assert!(out.contains(r#"<w:rPr><w:b/></w:rPr><w:t xml:space="preserve">a&lt;b</w:t>"#));
        assert!(out.contains(r#"<w:highlight w:val="yellow"/>"#));
        assert!(out.contains(r#"<w:hyperlink r:id="rId9">"#));

        let unlinked = runs(&fragments[2..], |_| None);
        assert!(!unlinked.contains("w:hyperlink"));
    }

    #[test]
    fn relationship_ids_skip_existing() {
        let mut rels = Relationships::new(
            r#"<Relationships><Relationship Id="rIdAsm1" Type="x" Target="y"/></Relationships>"#
                .to_string(),
        );
        let id = rels.add(RelationshipKind::Hyperlink, "https://example.org/?a=1&b=2");
        assert_eq!(id, "rIdAsm2");
        let xml = rels.to_xml().unwrap();
        assert!(xml.contains(r#"Target="https://example.org/?a=1&amp;b=2" TargetMode="External"/></Relationships>"#));
    }

    #[test]
    fn namespace_is_added_once() {
        let mut xml = format!(r#"<?xml version="1.0"?><w:document xmlns:w="{NS_W}"><w:body/></w:document>"#);
        ensure_namespace("doc", &mut xml, "w:document", "wp", NS_WP).unwrap();
        ensure_namespace("doc", &mut xml, "w:document", "wp", NS_WP).unwrap();
        assert_eq!(xml.matches("xmlns:wp=").count(), 1);
        assert!(xml.contains(r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><w:body/>"#));
    }

    #[test]
    fn content_types_add_missing_defaults_only() {
        let mut types = ContentTypes::new(
            r#"<Types><Default Extension="png" ContentType="image/png"/></Types>"#.to_string(),
        );
        types.ensure_default("PNG", "image/png");
        types.ensure_default("jpeg", "image/jpeg");
        types.add_override("word/header1.xml", "application/x");
        let xml = types.to_xml().unwrap();
        assert_eq!(xml.matches("Extension=\"png\"").count(), 1);
        assert!(xml.contains(r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#));
        assert!(xml.contains(r#"<Override PartName="/word/header1.xml""#));
    }
}
