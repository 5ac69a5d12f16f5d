/// Deepest heading style a reference template is expected to provide.
pub const MAX_HEADING_LEVEL: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtxHeading<'a> {
    /// Number of leading `#` characters.
    pub depth: usize,
    pub content: &'a str,
}

impl AtxHeading<'_> {
    /// Style level for this heading.
    ///
    /// `#` and `##` share level 1: the single-`#` line is the document-level
    /// heading of a fragment tree and is styled like a chapter. Deeper
    /// headings shift down by one and cap at [`MAX_HEADING_LEVEL`].
    pub fn style_level(&self) -> u8 {
        let shifted = self.depth.saturating_sub(1).max(1);
        shifted.min(MAX_HEADING_LEVEL as usize) as u8
    }
}

pub fn detect_atx_heading(line: &str) -> Option<AtxHeading<'_>> {
    if crate::line::indent_width(line) > 3 {
        return None;
    }
    let trimmed_start = line.trim_start();

    let pound_count = trimmed_start.chars().take_while(|ch| *ch == '#').count();
    if pound_count == 0 {
        return None;
    }

    let after_hashes = &trimmed_start[pound_count..];
    if !after_hashes.starts_with(char::is_whitespace) {
        return None;
    }

    let mut content = after_hashes.trim();
    let stripped_hashes = content.trim_end_matches('#');
    if stripped_hashes.len() < content.len() {
        let candidate = &content[..stripped_hashes.len()];
        if candidate.ends_with(char::is_whitespace) {
            content = candidate.trim_end();
        }
    }

    if content.is_empty() {
        return None;
    }

    Some(AtxHeading {
        depth: pound_count,
        content,
    })
}
