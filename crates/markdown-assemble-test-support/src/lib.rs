//! Shared fixtures for markdown-assemble tests.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use markdown_assemble_config::{LoadOptions, Settings, StyleNames};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

/// Write `files` (relative path, contents) under `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture directory");
        }
        fs::write(&path, contents).expect("write fixture file");
    }
}

/// Write `settings.toml` into `dir` and load it with `dir` as working directory.
pub fn load_settings(dir: &Path, toml: &str) -> Settings {
    let path = dir.join("settings.toml");
    fs::write(&path, toml).expect("write settings file");
    Settings::load(
        LoadOptions::default()
            .with_working_dir(dir)
            .with_settings_path(&path),
    )
    .expect("load settings")
}

/// Style id Word would derive for a display name.
pub fn style_id(name: &str) -> String {
    let mut id: String = name.chars().filter(|ch| ch.is_alphanumeric()).collect();
    if let Some(first) = id.get(0..1) {
        let upper = first.to_uppercase();
        id.replace_range(0..1, &upper);
    }
    id
}

/// Parts of a minimal reference template that defines every default style.
pub fn reference_template_parts() -> BTreeMap<String, String> {
    let names = StyleNames::default();
    let mut paragraph_styles: Vec<&str> = Vec::new();
    paragraph_styles.extend(names.heading.iter().map(String::as_str));
    paragraph_styles.extend(names.appendix_heading.iter().map(String::as_str));
    paragraph_styles.extend([
        names.bullet_list.as_str(),
        names.numbered_list.as_str(),
        names.title.as_str(),
        names.subtitle.as_str(),
        names.header.as_str(),
        names.footer.as_str(),
        names.measure.as_str(),
        names.toc_heading.as_str(),
    ]);

    let mut styles = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles {NS}>"#);
    for name in paragraph_styles {
        styles.push_str(&format!(
            r#"<w:style w:type="paragraph" w:styleId="{}"><w:name w:val="{name}"/></w:style>"#,
            style_id(name)
        ));
    }
    styles.push_str(&format!(
        r#"<w:style w:type="table" w:styleId="{}"><w:name w:val="{}"/></w:style></w:styles>"#,
        style_id(&names.table),
        names.table
    ));

    let numbering = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:numbering {}>"#,
            r#"<w:abstractNum w:abstractNumId="1"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:pStyle w:val="{}"/></w:lvl></w:abstractNum>"#,
            r#"<w:abstractNum w:abstractNumId="2"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:pStyle w:val="{}"/></w:lvl></w:abstractNum>"#,
            r#"<w:num w:numId="1"><w:abstractNumId w:val="1"/></w:num>"#,
            r#"<w:num w:numId="2"><w:abstractNumId w:val="2"/></w:num>"#,
            "</w:numbering>"
        ),
        NS,
        style_id(&names.bullet_list),
        style_id(&names.numbered_list),
    );

    let document = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {}><w:body>"#,
            r#"<w:p><w:r><w:t>Template body</w:t></w:r></w:p>"#,
            r#"<w:sectPr><w:headerReference w:type="default" r:id="rId7"/><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#,
            "</w:body></w:document>"
        ),
        NS
    );

    let rels = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>"#,
        r#"<Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>"#,
        "</Relationships>"
    );

    let root_rels = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
        "</Relationships>"
    );

    let content_types = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
        r#"<Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>"#,
        r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#,
        "</Types>"
    );

    let header = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr {NS}><w:p><w:r><w:t>Old header</w:t></w:r></w:p></w:hdr>"#
    );

    let mut parts = BTreeMap::new();
    parts.insert("[Content_Types].xml".to_string(), content_types.to_string());
    parts.insert("_rels/.rels".to_string(), root_rels.to_string());
    parts.insert("word/document.xml".to_string(), document);
    parts.insert("word/styles.xml".to_string(), styles);
    parts.insert("word/numbering.xml".to_string(), numbering);
    parts.insert("word/_rels/document.xml.rels".to_string(), rels.to_string());
    parts.insert("word/header1.xml".to_string(), header);
    parts
}

/// Zip `parts` into a package at `path`.
pub fn write_package(path: &Path, parts: &BTreeMap<String, String>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create template directory");
    }
    let file = File::create(path).expect("create package");
    let mut writer = ZipWriter::new(file);
    for (name, contents) in parts {
        writer
            .start_file(name.as_str(), SimpleFileOptions::default())
            .expect("start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish package");
}

/// Write the default reference template to `path`.
pub fn write_reference_template(path: &Path) {
    write_package(path, &reference_template_parts());
}

/// Read one part of a zip package as text, if present.
pub fn read_package_part(path: &Path, part: &str) -> Option<String> {
    let file = File::open(path).expect("open package");
    let mut archive = ZipArchive::new(file).expect("read package");
    let mut entry = archive.by_name(part).ok()?;
    let mut contents = String::new();
    entry.read_to_string(&mut contents).expect("read package part");
    Some(contents)
}

/// Names of every entry in a zip package.
pub fn package_entries(path: &Path) -> Vec<String> {
    let file = File::open(path).expect("open package");
    let archive = ZipArchive::new(file).expect("read package");
    archive.file_names().map(str::to_string).collect()
}

/// Header-only PNG: signature, `IHDR`, optional `pHYs` in dots per inch, `IEND`.
/// Checksums are zeroed; only the size sniffing reads these files.
pub fn png_bytes(width: u32, height: u32, dpi: Option<f64>) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    let mut chunk = |kind: &[u8], data: &[u8]| {
        bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(kind);
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
    };

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    chunk(b"IHDR", &ihdr);

    if let Some(dpi) = dpi {
        let per_meter = (dpi / 0.0254).round() as u32;
        let mut phys = Vec::with_capacity(9);
        phys.extend_from_slice(&per_meter.to_be_bytes());
        phys.extend_from_slice(&per_meter.to_be_bytes());
        phys.push(1);
        chunk(b"pHYs", &phys);
    }

    chunk(b"IEND", &[]);
    bytes
}
