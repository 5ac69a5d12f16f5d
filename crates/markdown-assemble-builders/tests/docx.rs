use std::fs;
use std::path::{Path, PathBuf};

use markdown_assemble_builders::{BuildError, Builder, DocxBuilder};
use markdown_assemble_config::StyleNames;
use markdown_assemble_parser::{Alignment, Fragment, ParagraphContext, Table};
use markdown_assemble_test_support::{
    package_entries, png_bytes, read_package_part, reference_template_parts, write_package,
    write_reference_template,
};
use tempfile::TempDir;

fn template_in(dir: &Path) -> PathBuf {
    let template = dir.join("reference.docx");
    write_reference_template(&template);
    template
}

fn builder(dir: &Path) -> (DocxBuilder, PathBuf) {
    let output = dir.join("out/report.docx");
    let builder = DocxBuilder::new(&template_in(dir), &StyleNames::default(), "Contents", &output)
        .expect("open reference template");
    (builder, output)
}

#[test]
fn writes_body_numbering_and_section_parts() {
    let temp = TempDir::new().expect("tempdir");
    let (mut docx, output) = builder(temp.path());

    docx.start_document("Report").unwrap();
    docx.build_table_of_contents().unwrap();
    docx.create_heading(1, &[Fragment::plain("Scope")], false).unwrap();
    docx.start_list(true).unwrap();
    docx.create_list_item(1, true, &[Fragment::plain("first")]).unwrap();
    docx.start_list(false).unwrap();
    docx.create_list_item(2, false, &[Fragment::bold("nested")]).unwrap();
    docx.end_list().unwrap();
    docx.end_list().unwrap();
    docx.create_paragraph(
        &[Fragment::link("site", "https://example.org")],
        ParagraphContext::Body,
    )
    .unwrap();
    docx.start_list(true).unwrap();
    docx.create_list_item(1, true, &[Fragment::plain("restart")]).unwrap();
    docx.end_list().unwrap();
    docx.create_table(&Table {
        header: vec![vec![Fragment::plain("A")], vec![Fragment::plain("B")]],
        rows: vec![vec![vec![Fragment::plain("1")], vec![Fragment::plain("2")]]],
        alignments: vec![Alignment::Left, Alignment::Right],
    })
    .unwrap();
    docx.build_header(&[Fragment::plain("Report")]).unwrap();
    docx.build_footer().unwrap();
    docx.end_document().unwrap();

    let document = read_package_part(&output, "word/document.xml").expect("document part");
    assert!(!document.contains("Template body"));
    assert!(document.contains(r#"<w:pStyle w:val="Heading1"/>"#));
    assert!(document.contains(r#"TOC \o &quot;1-3&quot; \h \z \u"#));
    assert!(document.contains(r#"<w:numPr><w:ilvl w:val="1"/><w:numId w:val="4"/></w:numPr>"#));
    assert!(document.contains(r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="5"/></w:numPr>"#));
    assert!(document.contains(r#"<w:tblW w:w="5000" w:type="pct"/>"#));
    assert!(document.contains("<w:tblHeader/>"));
    assert!(document.contains(r#"<w:jc w:val="right"/>"#));
    assert!(document.contains("xmlns:wp="));
    assert!(!document.contains(r#"r:id="rId7""#));
    assert!(document.contains(r#"<w:pgSz w:w="11906" w:h="16838"/>"#));

    let numbering = read_package_part(&output, "word/numbering.xml").expect("numbering part");
    assert!(numbering.contains(r#"<w:num w:numId="1"><w:abstractNumId w:val="1"/></w:num>"#));
    assert!(numbering.contains(r#"<w:num w:numId="3"><w:abstractNumId w:val="2"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/>"#));
    assert!(numbering.contains(r#"<w:num w:numId="4"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="1">"#));
    assert!(numbering.contains(r#"<w:num w:numId="5"><w:abstractNumId w:val="2"/>"#));

    let rels = read_package_part(&output, "word/_rels/document.xml.rels").expect("rels part");
    assert!(rels.contains(r#"Target="https://example.org" TargetMode="External""#));
    assert!(rels.contains(r#"Target="header_asm.xml""#));
    assert!(rels.contains(r#"Target="footer_asm.xml""#));

    let footer = read_package_part(&output, "word/footer_asm.xml").expect("footer part");
    assert!(footer.contains(" PAGE "));
    let types = read_package_part(&output, "[Content_Types].xml").expect("content types");
    assert!(types.contains(r#"PartName="/word/header_asm.xml""#));
}

#[test]
fn wide_picture_is_scaled_to_page_width() {
    let temp = TempDir::new().expect("tempdir");
    let image = temp.path().join("img/wide.png");
    fs::create_dir_all(image.parent().unwrap()).unwrap();
    fs::write(&image, png_bytes(4000, 2000, Some(200.0))).unwrap();

    let (mut docx, output) = builder(temp.path());
    docx.start_document("Pictures").unwrap();
    docx.insert_picture(&image, "Wide & tall").unwrap();
    docx.end_document().unwrap();

    let document = read_package_part(&output, "word/document.xml").unwrap();
    assert!(document.contains(r#"<wp:extent cx="7200000" cy="3600000"/>"#));
    assert!(document.contains(r#"descr="Wide &amp; tall""#));
    assert!(package_entries(&output).contains(&"word/media/asm_image1.png".to_string()));
    let types = read_package_part(&output, "[Content_Types].xml").unwrap();
    assert!(types.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
}

#[test]
fn missing_picture_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    let (mut docx, _) = builder(temp.path());
    docx.start_document("Pictures").unwrap();

    let err = docx
        .insert_picture(&temp.path().join("nope.png"), "")
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingFile { .. }));
}

#[test]
fn failed_run_leaves_no_output() {
    let temp = TempDir::new().expect("tempdir");
    let (mut docx, output) = builder(temp.path());
    docx.start_document("Draft").unwrap();
    docx.create_paragraph(&[Fragment::plain("text")], ParagraphContext::Body).unwrap();
    assert!(docx.insert_picture(&temp.path().join("gone.png"), "").is_err());
    assert!(!output.exists());
}

#[test]
fn appendix_headings_use_appendix_styles() {
    let temp = TempDir::new().expect("tempdir");
    let (mut docx, output) = builder(temp.path());
    docx.start_document("Appendix").unwrap();
    docx.create_heading(2, &[Fragment::plain("Annex")], true).unwrap();
    docx.create_heading(4, &[Fragment::plain("Deep annex")], true).unwrap();
    docx.end_document().unwrap();

    let document = read_package_part(&output, "word/document.xml").unwrap();
    assert!(document.contains(r#"<w:pStyle w:val="Kop2Bijlage"/>"#));
    assert!(document.contains(r#"<w:pStyle w:val="Kop4Bijlage"/>"#));
    assert!(!document.contains(r#"<w:pStyle w:val="Heading4"/>"#));
}

#[test]
fn appendix_heading_beyond_configured_styles_falls_back() {
    let temp = TempDir::new().expect("tempdir");
    let names = StyleNames {
        appendix_heading: vec!["Kop 1 Bijlage".to_owned(), "Kop 2 Bijlage".to_owned()],
        ..StyleNames::default()
    };
    let output = temp.path().join("out/report.docx");
    let mut docx = DocxBuilder::new(&template_in(temp.path()), &names, "Contents", &output)
        .expect("open reference template");
    docx.start_document("Appendix").unwrap();
    docx.create_heading(4, &[Fragment::plain("Deep annex")], true).unwrap();
    docx.end_document().unwrap();

    let document = read_package_part(&output, "word/document.xml").unwrap();
    assert!(document.contains(r#"<w:pStyle w:val="Heading4"/>"#));
}

#[test]
fn sibling_bullet_lists_restart_numbering() {
    let temp = TempDir::new().expect("tempdir");
    let (mut docx, output) = builder(temp.path());
    docx.start_document("Lists").unwrap();
    docx.start_list(false).unwrap();
    docx.create_list_item(1, false, &[Fragment::plain("roads")]).unwrap();
    docx.end_list().unwrap();
    docx.create_paragraph(&[Fragment::plain("between")], ParagraphContext::Body)
        .unwrap();
    docx.start_list(false).unwrap();
    docx.create_list_item(1, false, &[Fragment::plain("bridges")]).unwrap();
    docx.end_list().unwrap();
    docx.end_document().unwrap();

    let document = read_package_part(&output, "word/document.xml").unwrap();
    assert!(document.contains(r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="3"/></w:numPr>"#));
    assert!(document.contains(r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="4"/></w:numPr>"#));

    let numbering = read_package_part(&output, "word/numbering.xml").unwrap();
    for num_id in [3, 4] {
        assert!(numbering.contains(&format!(
            r#"<w:num w:numId="{num_id}"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/></w:lvlOverride></w:num>"#
        )));
    }
}

#[test]
fn missing_table_style_fails_initialization() {
    let temp = TempDir::new().expect("tempdir");
    let mut parts = reference_template_parts();
    let styles = parts["word/styles.xml"].replace("Tabelraster1", "PlainGrid");
    parts.insert("word/styles.xml".to_string(), styles);
    let template = temp.path().join("broken.docx");
    write_package(&template, &parts);

    let result = DocxBuilder::new(
        &template,
        &StyleNames::default(),
        "Contents",
        temp.path().join("out.docx"),
    );
    match result {
        Err(BuildError::MissingStyle { name, .. }) => assert_eq!(name, "Tabelraster1"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("template without table style was accepted"),
    }
}

#[test]
fn missing_numbering_part_is_invalid() {
    let temp = TempDir::new().expect("tempdir");
    let mut parts = reference_template_parts();
    parts.remove("word/numbering.xml");
    let template = temp.path().join("no-numbering.docx");
    write_package(&template, &parts);

    let result = DocxBuilder::new(
        &template,
        &StyleNames::default(),
        "Contents",
        temp.path().join("out.docx"),
    );
    match result {
        Err(BuildError::InvalidPart { part }) => assert_eq!(part, "word/numbering.xml"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("template without numbering was accepted"),
    }
}

#[test]
fn missing_template_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    let result = DocxBuilder::new(
        &temp.path().join("absent.docx"),
        &StyleNames::default(),
        "Contents",
        temp.path().join("out.docx"),
    );
    assert!(matches!(result, Err(BuildError::MissingFile { .. })));
}
