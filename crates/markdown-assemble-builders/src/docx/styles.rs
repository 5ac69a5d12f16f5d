//! Style name to style id lookup for the reference template.
//!
//! Word addresses styles by id in the document body while templates are
//! authored against display names, and the two differ per locale. The map is
//! built once per builder from `word/styles.xml`.

use std::collections::HashMap;

use markdown_assemble_config::StyleNames;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use super::xml::attribute;
use crate::error::{BuildError, BuildResult};

const STYLES_PART: &str = "word/styles.xml";

#[derive(Debug, Clone)]
struct StyleEntry {
    id: String,
    num_id: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    by_name: HashMap<String, StyleEntry>,
    by_id: HashMap<String, StyleEntry>,
}

impl StyleMap {
    pub fn from_xml(xml: &str) -> BuildResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut map = StyleMap::default();
        let mut current: Option<(StyleEntry, Option<String>)> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"w:style" => {
                        if let Some(id) = attribute(STYLES_PART, &e, b"w:styleId")? {
                            current = Some((StyleEntry { id, num_id: None }, None));
                        }
                    }
                    b"w:name" => {
                        if let Some((_, name)) = current.as_mut() {
                            *name = attribute(STYLES_PART, &e, b"w:val")?;
                        }
                    }
                    b"w:numId" => {
                        if let Some((entry, _)) = current.as_mut() {
                            entry.num_id = attribute(STYLES_PART, &e, b"w:val")?
                                .and_then(|value| value.parse().ok());
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => {
                    if let Some((entry, name)) = current.take() {
                        map.insert(entry, name);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(BuildError::xml(STYLES_PART, err)),
            }
        }

        Ok(map)
    }

    fn insert(&mut self, entry: StyleEntry, name: Option<String>) {
        if let Some(name) = name {
            self.by_name.insert(name.to_lowercase(), entry.clone());
        }
        self.by_id.insert(entry.id.to_lowercase(), entry);
    }

    fn entry(&self, name: &str) -> Option<&StyleEntry> {
        let key = name.to_lowercase();
        self.by_name.get(&key).or_else(|| self.by_id.get(&key))
    }

    /// Style id for a display name (or id), compared case-insensitively.
    pub fn id_for(&self, name: &str) -> Option<&str> {
        self.entry(name).map(|entry| entry.id.as_str())
    }

    /// Numbering instance a style is linked to through its own `w:numPr`.
    pub(crate) fn num_id_for(&self, style_id: &str) -> Option<u32> {
        self.by_id
            .get(&style_id.to_lowercase())
            .and_then(|entry| entry.num_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub(crate) fn resolve(&self, names: &StyleNames) -> BuildResult<ResolvedStyles> {
        let required = |name: &str, role: &str| -> BuildResult<String> {
            self.id_for(name)
                .map(str::to_string)
                .ok_or_else(|| BuildError::MissingStyle {
                    name: name.to_string(),
                    role: role.to_string(),
                })
        };
        let optional = |name: &str| self.id_for(name).map(str::to_string);

        let heading = names
            .heading
            .iter()
            .map(|name| required(name, "heading"))
            .collect::<BuildResult<Vec<_>>>()?;
        let appendix_heading = names
            .appendix_heading
            .iter()
            .map(|name| required(name, "appendix heading"))
            .collect::<BuildResult<Vec<_>>>()?;

        let resolved = ResolvedStyles {
            heading,
            appendix_heading,
            bullet_list: required(&names.bullet_list, "bulleted list")?,
            numbered_list: required(&names.numbered_list, "numbered list")?,
            table: required(&names.table, "table")?,
            title: required(&names.title, "title")?,
            header: required(&names.header, "header")?,
            footer: required(&names.footer, "footer")?,
            subtitle: optional(&names.subtitle),
            measure: optional(&names.measure),
            toc_heading: optional(&names.toc_heading),
        };
        debug!(styles = self.len(), "resolved reference template styles");
        Ok(resolved)
    }
}

/// Style ids for every role the builder writes.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedStyles {
    pub heading: Vec<String>,
    pub appendix_heading: Vec<String>,
    pub bullet_list: String,
    pub numbered_list: String,
    pub table: String,
    pub title: String,
    pub header: String,
    pub footer: String,
    pub subtitle: Option<String>,
    pub measure: Option<String>,
    pub toc_heading: Option<String>,
}

impl ResolvedStyles {
    /// Appendix levels without a dedicated style use the regular heading.
    pub fn heading(&self, level: u8, is_appendix: bool) -> &str {
        let index = usize::from(level.max(1)) - 1;
        if is_appendix {
            if let Some(id) = self.appendix_heading.get(index) {
                return id;
            }
        }
        let last = self.heading.len().saturating_sub(1);
        self.heading
            .get(index.min(last))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn list(&self, numbered: bool) -> &str {
        if numbered {
            &self.numbered_list
        } else {
            &self.bullet_list
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Kop1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="Lijstopsomteken1">
    <w:name w:val="Lijst opsom.teken1"/>
    <w:pPr><w:numPr><w:numId w:val="7"/></w:numPr></w:pPr>
  </w:style>
</w:styles>"#;

    #[test]
    fn looks_up_by_name_case_insensitively() {
        let map = StyleMap::from_xml(STYLES).unwrap();
        assert_eq!(map.id_for("Heading 1"), Some("Kop1"));
        assert_eq!(map.id_for("lijst opsom.teken1"), Some("Lijstopsomteken1"));
        assert_eq!(map.id_for("kop1"), Some("Kop1"));
        assert_eq!(map.id_for("Heading 2"), None);
        assert_eq!(map.num_id_for("Lijstopsomteken1"), Some(7));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn missing_required_style_names_role() {
        let map = StyleMap::from_xml(STYLES).unwrap();
        let err = map.resolve(&StyleNames::default()).unwrap_err();
        match err {
            BuildError::MissingStyle { name, role } => {
                assert_eq!(name, "heading 2");
                assert_eq!(role, "heading");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
