use std::fs;

use markdown_assemble_builders::{BuildError, Builder, HtmlBuilder};
use markdown_assemble_parser::{Alignment, Fragment, ParagraphContext, Table};
use pretty_assertions::assert_eq;
use markdown_assemble_test_support::png_bytes;
use tempfile::TempDir;

#[test]
fn nested_lists_are_well_formed() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("doc.html");
    let mut html = HtmlBuilder::new(&output, None, "Contents");

    html.start_document("Lists").unwrap();
    html.start_list(false).unwrap();
    html.create_list_item(1, false, &[Fragment::plain("a")]).unwrap();
    html.start_list(true).unwrap();
    html.create_list_item(2, true, &[Fragment::plain("b")]).unwrap();
    html.end_list().unwrap();
    html.create_list_item(1, false, &[Fragment::plain("c")]).unwrap();
    html.end_list().unwrap();
    html.end_document().unwrap();

    let written = fs::read_to_string(&output).unwrap();
    let compact: String = written.split('\n').collect();
    assert!(compact.contains("<ul><li>a<ol><li>b</li></ol></li><li>c</li></ul>"));
}

#[test]
fn toc_is_spliced_where_requested_with_later_headings() {
    let temp = TempDir::new().expect("tempdir");
    let stylesheet = temp.path().join("theme/style.css");
    fs::create_dir_all(stylesheet.parent().unwrap()).unwrap();
    fs::write(&stylesheet, "body { margin: 0 }").unwrap();
    let output = temp.path().join("site/doc.html");
    let mut html = HtmlBuilder::new(&output, Some(stylesheet), "Contents");

    html.start_document("Report").unwrap();
    html.create_paragraph(&[Fragment::plain("Report")], ParagraphContext::Title)
        .unwrap();
    html.build_table_of_contents().unwrap();
    html.create_heading(1, &[Fragment::plain("Scope")], false).unwrap();
    html.create_heading(4, &[Fragment::plain("Too deep")], false).unwrap();
    html.create_heading(1, &[Fragment::plain("Annex A")], true).unwrap();
    html.build_header(&[Fragment::plain("Report")]).unwrap();
    html.build_footer().unwrap();
    html.end_document().unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("<link rel=\"stylesheet\" href=\"style.css\">"));
    assert_eq!(
        fs::read_to_string(temp.path().join("site/style.css")).unwrap(),
        "body { margin: 0 }"
    );
    assert!(written.contains("<header class=\"page-header\">Report</header>"));
    assert!(written.contains("<footer class=\"page-footer\">Report</footer>"));
    assert!(written.contains("<h1 id=\"annex-a\" class=\"appendix\">Annex A</h1>"));

    let title = written.find("<p class=\"title\">").unwrap();
    let nav = written.find("<nav class=\"toc\">").unwrap();
    let scope = written.find("<h1 id=\"scope\">").unwrap();
    assert!(title < nav && nav < scope);
    assert!(written.contains("<li class=\"toc-level-1\"><a href=\"#scope\">Scope</a></li>"));
    assert!(written.contains("<a href=\"#annex-a\">Annex A</a>"));
    assert!(!written.contains("<a href=\"#too-deep\">"));
}

#[test]
fn tables_and_pictures() {
    let temp = TempDir::new().expect("tempdir");
    let image = temp.path().join("plan.png");
    fs::write(&image, png_bytes(10, 10, None)).unwrap();
    let output = temp.path().join("doc.html");
    let mut html = HtmlBuilder::new(&output, None, "Contents");

    html.start_document("Tables").unwrap();
    html.create_table(&Table {
        header: vec![vec![Fragment::plain("Name")], vec![Fragment::plain("Qty")]],
        rows: vec![vec![vec![Fragment::italic("bolt")], vec![Fragment::plain("4")]]],
        alignments: vec![Alignment::Left, Alignment::Right],
    })
    .unwrap();
    html.insert_picture(&image, "Plan").unwrap();
    html.insert_page_break().unwrap();
    html.end_document().unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("<thead>\n<tr><th>Name</th><th style=\"text-align: right\">Qty</th></tr>"));
    assert!(written.contains("<td><em>bolt</em></td>"));
    assert!(written.contains("<img src=\"images/plan.png\" alt=\"Plan\">"));
    assert!(temp.path().join("images/plan.png").is_file());
    assert!(written.contains("class=\"page-break\""));

    let err = html
        .insert_picture(&temp.path().join("missing.png"), "")
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingFile { .. }));
}

#[test]
fn pictures_are_copied_beside_the_output_with_unique_names() {
    let temp = TempDir::new().expect("tempdir");
    for dir in ["north", "south"] {
        fs::create_dir_all(temp.path().join(dir)).unwrap();
        fs::write(temp.path().join(dir).join("map.png"), png_bytes(4, 4, None)).unwrap();
    }
    let output = temp.path().join("dist/doc.html");
    let mut html = HtmlBuilder::new(&output, None, "Contents");

    html.start_document("Maps").unwrap();
    html.insert_picture(&temp.path().join("north/map.png"), "North").unwrap();
    html.insert_picture(&temp.path().join("south/map.png"), "South").unwrap();
    html.insert_picture(&temp.path().join("north/map.png"), "North again").unwrap();
    html.end_document().unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written.matches("src=\"images/map.png\"").count(), 2);
    assert_eq!(written.matches("src=\"images/map-1.png\"").count(), 1);
    assert!(!written.contains(&temp.path().display().to_string()));
    assert!(temp.path().join("dist/images/map.png").is_file());
    assert!(temp.path().join("dist/images/map-1.png").is_file());
}

#[test]
fn missing_stylesheet_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    let mut html = HtmlBuilder::new(
        temp.path().join("doc.html"),
        Some(temp.path().join("absent.css")),
        "Contents",
    );

    let err = html.start_document("Doc").unwrap_err();
    assert!(matches!(err, BuildError::MissingFile { .. }));
}

#[test]
fn repeated_and_numbered_headings_keep_distinct_ids() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("doc.html");
    let mut html = HtmlBuilder::new(&output, None, "Contents");

    html.start_document("Doc").unwrap();
    html.build_table_of_contents().unwrap();
    for text in ["Scope", "Scope", "Scope 1"] {
        html.create_heading(1, &[Fragment::plain(text)], false).unwrap();
    }
    html.end_document().unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written.matches("id=\"scope-1\"").count(), 1);
    assert!(written.contains("<h1 id=\"scope-1-1\">Scope 1</h1>"));
    assert!(written.contains("<a href=\"#scope-1-1\">Scope 1</a>"));
}

#[test]
fn only_the_first_toc_request_places_the_contents() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("doc.html");
    let mut html = HtmlBuilder::new(&output, None, "Contents");

    html.start_document("Doc").unwrap();
    html.build_table_of_contents().unwrap();
    html.create_heading(1, &[Fragment::plain("First")], false).unwrap();
    html.build_table_of_contents().unwrap();
    html.create_heading(1, &[Fragment::plain("Second")], false).unwrap();
    html.end_document().unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written.matches("<nav class=\"toc\">").count(), 1);
    let nav = written.find("<nav class=\"toc\">").unwrap();
    let first = written.find("<h1 id=\"first\">").unwrap();
    assert!(nav < first);
}
