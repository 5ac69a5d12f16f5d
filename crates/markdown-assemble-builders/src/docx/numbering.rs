//! List numbering instances layered on top of the template's definitions.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use super::xml::attribute;
use crate::error::{BuildError, BuildResult};

pub(crate) const NUMBERING_PART: &str = "word/numbering.xml";

/// Parsed view of `word/numbering.xml` plus the instances added during a run.
#[derive(Debug)]
pub(crate) struct Numbering {
    xml: String,
    /// Paragraph style id -> abstract numbering id, from `w:lvl/w:pStyle`.
    style_bindings: HashMap<String, u32>,
    /// Existing `w:num` id -> abstract numbering id.
    instances: HashMap<u32, u32>,
    next_num_id: u32,
    added: Vec<String>,
}

impl Numbering {
    pub fn parse(xml: String) -> BuildResult<Self> {
        let (style_bindings, instances, max_num_id) = scan(&xml)?;
        Ok(Self {
            xml,
            style_bindings,
            instances,
            next_num_id: max_num_id + 1,
            added: Vec::new(),
        })
    }

    /// Abstract numbering definition bound to `style_id`, either through a
    /// level's `w:pStyle` or through the numbering instance the style links.
    pub fn abstract_for_style(&self, style_id: &str, linked_num: Option<u32>) -> Option<u32> {
        self.style_bindings
            .get(&style_id.to_lowercase())
            .copied()
            .or_else(|| linked_num.and_then(|num| self.instances.get(&num).copied()))
    }

    /// Allocate a fresh `w:num` that restarts `abstract_id` at 1 on `level`.
    pub fn restart(&mut self, abstract_id: u32, level: usize) -> u32 {
        let num_id = self.next_num_id;
        self.next_num_id += 1;
        self.added.push(format!(
            r#"<w:num w:numId="{num_id}"><w:abstractNumId w:val="{abstract_id}"/><w:lvlOverride w:ilvl="{level}"><w:startOverride w:val="1"/></w:lvlOverride></w:num>"#
        ));
        debug!(num_id, abstract_id, level, "allocated numbering instance");
        num_id
    }

    /// Template xml with the added instances appended after the existing ones.
    /// `w:numIdMacAtCleanup` must stay the last child, so new instances go
    /// in front of it when the template carries one.
    pub fn to_xml(&self) -> BuildResult<String> {
        let mut xml = self.xml.clone();
        if self.added.is_empty() {
            return Ok(xml);
        }
        let at = xml
            .find("<w:numIdMacAtCleanup")
            .or_else(|| xml.rfind("</w:numbering>"))
            .ok_or_else(|| BuildError::xml(NUMBERING_PART, "missing </w:numbering>"))?;
        xml.insert_str(at, &self.added.concat());
        Ok(xml)
    }
}

type Scan = (HashMap<String, u32>, HashMap<u32, u32>, u32);

fn scan(xml: &str) -> BuildResult<Scan> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut style_bindings = HashMap::new();
    let mut instances = HashMap::new();
    let mut current_abstract: Option<u32> = None;
    let mut current_num: Option<u32> = None;
    let mut max_num_id = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:abstractNum" => {
                    current_abstract = number_attribute(&e, b"w:abstractNumId")?;
                }
                b"w:pStyle" => {
                    if let (Some(abstract_id), Some(style)) =
                        (current_abstract, attribute(NUMBERING_PART, &e, b"w:val")?)
                    {
                        style_bindings.entry(style.to_lowercase()).or_insert(abstract_id);
                    }
                }
                b"w:num" => {
                    current_num = number_attribute(&e, b"w:numId")?;
                    if let Some(id) = current_num {
                        max_num_id = max_num_id.max(id);
                    }
                }
                b"w:abstractNumId" => {
                    if let (Some(num_id), Some(abstract_id)) =
                        (current_num, number_attribute(&e, b"w:val")?)
                    {
                        instances.insert(num_id, abstract_id);
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:abstractNum" => current_abstract = None,
                b"w:num" => current_num = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(BuildError::xml(NUMBERING_PART, err)),
        }
    }

    Ok((style_bindings, instances, max_num_id))
}

fn number_attribute(
    element: &quick_xml::events::BytesStart<'_>,
    key: &[u8],
) -> BuildResult<Option<u32>> {
    Ok(attribute(NUMBERING_PART, element, key)?.and_then(|value| value.parse().ok()))
}
