use std::path::Path;

use markdown_assemble_builders::{BuildResult, Builder};
use markdown_assemble_core::{render, RenderError};
use markdown_assemble_parser::{
    parse, plain_text, Document, Fragment, Node, NodeKind, ParagraphContext, ParseOptions, Table,
};
use markdown_assemble_test_support::load_settings;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Records every call as a short line of text.
#[derive(Default)]
struct RecordingBuilder {
    events: Vec<String>,
    unsupported: Vec<NodeKind>,
}

impl RecordingBuilder {
    fn without(kinds: &[NodeKind]) -> Self {
        Self {
            events: Vec::new(),
            unsupported: kinds.to_vec(),
        }
    }
}

impl Builder for RecordingBuilder {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn supports(&self, kind: NodeKind) -> bool {
        !self.unsupported.contains(&kind)
    }

    fn start_document(&mut self, title: &str) -> BuildResult<()> {
        self.events.push(format!("start {title}"));
        Ok(())
    }

    fn end_document(&mut self) -> BuildResult<()> {
        self.events.push("end".to_string());
        Ok(())
    }

    fn build_header(&mut self, fragments: &[Fragment]) -> BuildResult<()> {
        self.events.push(format!("header {}", plain_text(fragments)));
        Ok(())
    }

    fn build_footer(&mut self) -> BuildResult<()> {
        self.events.push("footer".to_string());
        Ok(())
    }

    fn build_table_of_contents(&mut self) -> BuildResult<()> {
        self.events.push("toc".to_string());
        Ok(())
    }

    fn create_heading(
        &mut self,
        level: u8,
        fragments: &[Fragment],
        is_appendix: bool,
    ) -> BuildResult<()> {
        let marker = if is_appendix { " appendix" } else { "" };
        self.events
            .push(format!("h{level}{marker} {}", plain_text(fragments)));
        Ok(())
    }

    fn start_list(&mut self, numbered: bool) -> BuildResult<()> {
        self.events.push(format!("list numbered={numbered}"));
        Ok(())
    }

    fn create_list_item(
        &mut self,
        level: usize,
        _numbered: bool,
        fragments: &[Fragment],
    ) -> BuildResult<()> {
        self.events
            .push(format!("item{level} {}", plain_text(fragments)));
        Ok(())
    }

    fn end_list(&mut self) -> BuildResult<()> {
        self.events.push("end list".to_string());
        Ok(())
    }

    fn create_paragraph(
        &mut self,
        fragments: &[Fragment],
        context: ParagraphContext,
    ) -> BuildResult<()> {
        self.events
            .push(format!("p {context:?} {}", plain_text(fragments)));
        Ok(())
    }

    fn create_table(&mut self, table: &Table) -> BuildResult<()> {
        self.events
            .push(format!("table {}x{}", table.rows.len(), table.column_count()));
        Ok(())
    }

    fn insert_page_break(&mut self) -> BuildResult<()> {
        self.events.push("page break".to_string());
        Ok(())
    }

    fn insert_picture(&mut self, path: &Path, _alt: &str) -> BuildResult<()> {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        self.events.push(format!("picture {name}"));
        Ok(())
    }
}

fn document(text: &str) -> Document {
    parse(text, &ParseOptions::default()).expect("parse fixture")
}

#[test]
fn front_page_toc_body_then_header_and_footer() {
    let temp = TempDir::new().expect("tempdir");
    let settings = load_settings(
        temp.path(),
        r#"
        input_file = "main.md"
        title = "Handbook"
        subtitle = "Operations"
        version = "2.1"
        date = "01-02-2026"
        output_formats = ["html"]
        "#,
    );
    let doc = document("## Scope\n- one\n- two\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");

    let mut builder = RecordingBuilder::default();
    let summary = render(&doc, &settings, &mut builder).expect("render");

    assert_eq!(
        builder.events,
        vec![
            "start Handbook",
            "p Title Handbook",
            "p Subtitle Operations",
            "p Subtitle Version 2.1",
            "p Subtitle Date 01-02-2026",
            "page break",
            "toc",
            "h1 Scope",
            "list numbered=false",
            "item1 one",
            "item1 two",
            "end list",
            "table 1x2",
            "header Handbook",
            "footer",
            "end",
        ]
    );
    assert_eq!(summary.headings, 1);
    assert_eq!(summary.appendix_headings, 0);
    assert_eq!(summary.list_items, 2);
}

#[test]
fn template_front_page_uses_placeholders_and_explicit_toc_wins() {
    let temp = TempDir::new().expect("tempdir");
    let settings = load_settings(
        temp.path(),
        r#"
        input_file = "main.md"
        title = "Plan"
        document_type = "template"
        output_formats = ["html"]
        "#,
    );
    let doc = document("# Intro\n<!-- toc -->\n## Body\n");

    let mut builder = RecordingBuilder::default();
    render(&doc, &settings, &mut builder).expect("render");

    assert!(builder
        .events
        .contains(&"p Subtitle Version {version number}".to_string()));
    assert!(builder.events.contains(&"p Subtitle Date {date}".to_string()));
    assert_eq!(builder.events.iter().filter(|e| *e == "toc").count(), 1);
    let toc = builder.events.iter().position(|e| e == "toc").unwrap();
    let intro = builder.events.iter().position(|e| e == "h1 Intro").unwrap();
    assert!(intro < toc);
}

#[test]
fn unsupported_kinds_are_skipped() {
    let temp = TempDir::new().expect("tempdir");
    let settings = load_settings(
        temp.path(),
        r#"
        input_file = "main.md"
        title = "Plain"
        include_front_page = false
        include_table_of_contents = false
        output_formats = ["html"]
        "#,
    );
    let doc = document("Text\n\n| a |\n|---|\n| 1 |\n![x](x.png)\n");

    let mut builder = RecordingBuilder::without(&[NodeKind::Table, NodeKind::Image]);
    let summary = render(&doc, &settings, &mut builder).expect("render");

    assert_eq!(
        builder.events,
        vec!["start Plain", "p Body Text", "header Plain", "footer", "end"]
    );
    assert_eq!(summary.skipped, 2);
}

#[test]
fn list_nodes_outside_lists_are_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let settings = load_settings(
        temp.path(),
        r#"
        input_file = "main.md"
        title = "Broken"
        include_front_page = false
        output_formats = ["html"]
        "#,
    );

    let stray_item = Document::new(vec![Node::ListItem {
        level: 1,
        numbered: false,
        fragments: vec![Fragment::plain("orphan")],
    }]);
    let err = render(&stray_item, &settings, &mut RecordingBuilder::default()).unwrap_err();
    assert!(matches!(err, RenderError::InvalidStructure(_)));

    let stray_end = Document::new(vec![Node::ListEnd]);
    let err = render(&stray_end, &settings, &mut RecordingBuilder::default()).unwrap_err();
    assert!(matches!(err, RenderError::InvalidStructure(_)));

    let unclosed = Document::new(vec![Node::ListStart { numbered: true }]);
    let err = render(&unclosed, &settings, &mut RecordingBuilder::default()).unwrap_err();
    assert!(matches!(err, RenderError::InvalidStructure(_)));
}

#[test]
fn passes_are_independent() {
    let temp = TempDir::new().expect("tempdir");
    let settings = load_settings(
        temp.path(),
        r#"
        input_file = "main.md"
        title = "Twice"
        output_formats = ["html"]
        "#,
    );
    let doc = document("1. a\n   - b\n2. c\n<!-- begin: appendix -->\n## Annex\n");

    let mut first = RecordingBuilder::default();
    let mut second = RecordingBuilder::default();
    let summary = render(&doc, &settings, &mut first).unwrap();
    let again = render(&doc, &settings, &mut second).unwrap();

    assert_eq!(first.events, second.events);
    assert_eq!(summary, again);
    assert!(first.events.contains(&"h1 appendix Annex".to_string()));
    assert_eq!(summary.appendix_headings, 1);
}
