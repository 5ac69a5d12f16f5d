//! Line-oriented structural parser for the extended markdown dialect.

use std::path::PathBuf;

use markdown_assemble_config::Settings;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{ParseError, ParseResult};
use crate::heading::detect_atx_heading;
use crate::inline::parse_inline;
use crate::line::{indent_width, split_lines, LineRecord};
use crate::model::{Alignment, Cell, Document, Node, ParagraphContext, Table};

const MEASURE_START: &str = "@{";
const MEASURE_END: &str = "}@";
const LATEX_PAGE_BREAK: &str = "\\pagebreak";

static BULLET_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[*+-]\s+(\S.*)$").expect("bullet pattern is valid"));
static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+|[A-Za-z])\.\s+(\S.*)$").expect("numbered pattern is valid")
});
static IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^!\[([^\]]*)\]\(([^)\s]+)(?:\s+"([^"]*)")?\)$"#).expect("image pattern is valid")
});
static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<!--\s*(begin|end):\s*(\S+?)(?:\s+[^>]*)?\s*-->$").expect("marker pattern is valid")
});
static SEPARATOR_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:?-+:?$").expect("separator pattern is valid"));

/// Marker strings and paths the parser needs from the run settings.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub image_dir: PathBuf,
    pub toc_marker: String,
    pub page_break_marker: String,
    pub appendix_marker: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        let markers = markdown_assemble_config::MarkerSettings::default();
        Self {
            image_dir: PathBuf::from("."),
            toc_marker: markers.toc,
            page_break_marker: markers.page_break,
            appendix_marker: markers.appendix,
        }
    }
}

impl ParseOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            image_dir: settings.image_path.clone(),
            toc_marker: settings.markers.toc.clone(),
            page_break_marker: settings.markers.page_break.clone(),
            appendix_marker: settings.markers.appendix.clone(),
        }
    }

    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = dir.into();
        self
    }
}

/// Parse expanded markdown into a flat structural document.
pub fn parse(text: &str, options: &ParseOptions) -> ParseResult<Document> {
    let lines = split_lines(text);
    let mut state = ParseState::new(options);

    let mut idx = 0;
    while idx < lines.len() {
        idx += state.consume(&lines, idx)?;
    }

    Ok(state.finish())
}

struct ParseState<'a> {
    options: &'a ParseOptions,
    nodes: Vec<Node>,
    lists: ListTracker,
    appendix: bool,
    in_measure: bool,
}

impl<'a> ParseState<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            lists: ListTracker::default(),
            appendix: false,
            in_measure: false,
        }
    }

    /// Consume the line at `idx` (and any continuation lines), returning how
    /// many lines were used.
    fn consume(&mut self, lines: &[LineRecord], idx: usize) -> ParseResult<usize> {
        let line = &lines[idx];
        if line.is_blank() {
            self.lists.close_all(&mut self.nodes);
            return Ok(1);
        }

        let trimmed = line.trimmed();
        if trimmed == self.options.toc_marker {
            self.push_block(Node::TableOfContents);
            return Ok(1);
        }
        if trimmed == self.options.page_break_marker || trimmed == LATEX_PAGE_BREAK {
            self.push_block(Node::PageBreak);
            return Ok(1);
        }
        if let Some(captures) = MARKER.captures(trimmed) {
            self.lists.close_all(&mut self.nodes);
            self.apply_marker(&captures[1], &captures[2]);
            return Ok(1);
        }

        let mut content = line.text.clone();
        if let Some(rest) = content.trim_start().strip_prefix(MEASURE_START) {
            self.in_measure = true;
            content = rest.to_string();
        }
        let mut leaving_measure = false;
        if self.in_measure && content.contains(MEASURE_END) {
            leaving_measure = true;
            content = content.replace(MEASURE_END, "");
        }

        let consumed = if content.trim().is_empty() {
            self.lists.close_all(&mut self.nodes);
            1
        } else {
            self.classify(&content, lines, idx)?
        };

        if leaving_measure {
            self.in_measure = false;
        }
        Ok(consumed)
    }

    fn classify(&mut self, content: &str, lines: &[LineRecord], idx: usize) -> ParseResult<usize> {
        let trimmed = content.trim();

        if let Some(heading) = detect_atx_heading(content) {
            let node = Node::Heading {
                level: heading.style_level(),
                is_appendix: self.appendix,
                fragments: parse_inline(heading.content),
            };
            self.push_block(node);
            return Ok(1);
        }

        if trimmed.starts_with('|') {
            if let Some(separator) = lines.get(idx + 1).filter(|next| is_separator_row(next.trimmed())) {
                self.lists.close_all(&mut self.nodes);
                let parsed = parse_table(content, lines, idx, separator)?;
                if parsed.closes_measure {
                    self.in_measure = false;
                }
                self.nodes.push(Node::Table(parsed.table));
                return Ok(parsed.consumed);
            }
        }

        if let Some(captures) = IMAGE.captures(trimmed) {
            let node = Node::Image {
                path: self.options.image_dir.join(&captures[2]),
                alt: captures[1].to_string(),
                title: captures.get(3).map(|title| title.as_str().to_string()),
            };
            self.push_block(node);
            return Ok(1);
        }

        let item = BULLET_ITEM
            .captures(trimmed)
            .map(|captures| (false, captures))
            .or_else(|| NUMBERED_ITEM.captures(trimmed).map(|captures| (true, captures)));
        if let Some((numbered, captures)) = item {
            let requested = 1 + indent_width(content) / 2;
            self.lists.item(
                &mut self.nodes,
                requested,
                numbered,
                parse_inline(&captures[1]),
            );
            return Ok(1);
        }

        let context = if self.in_measure {
            ParagraphContext::Measure
        } else {
            ParagraphContext::Body
        };
        self.push_block(Node::Paragraph {
            fragments: parse_inline(trimmed),
            context,
        });
        Ok(1)
    }

    fn apply_marker(&mut self, kind: &str, name: &str) {
        if name != self.options.appendix_marker {
            debug!(marker = name, kind, "ignoring unknown section marker");
            return;
        }
        self.appendix = kind == "begin";
        debug!(appendix = self.appendix, "appendix mode switched");
    }

    /// Any block other than a list item ends the open lists first.
    fn push_block(&mut self, node: Node) {
        self.lists.close_all(&mut self.nodes);
        self.nodes.push(node);
    }

    fn finish(mut self) -> Document {
        self.lists.close_all(&mut self.nodes);
        Document::new(self.nodes)
    }
}

/// Stack of open lists; `true` entries are numbered.
#[derive(Default)]
struct ListTracker {
    open: Vec<bool>,
}

impl ListTracker {
    fn item(
        &mut self,
        nodes: &mut Vec<Node>,
        requested_level: usize,
        numbered: bool,
        fragments: Vec<crate::model::Fragment>,
    ) {
        let level = requested_level.clamp(1, self.open.len() + 1);

        while self.open.len() > level {
            self.open.pop();
            nodes.push(Node::ListEnd);
        }

        if self.open.len() == level && self.open.last() != Some(&numbered) {
            self.open.pop();
            nodes.push(Node::ListEnd);
        }

        if self.open.len() < level {
            self.open.push(numbered);
            nodes.push(Node::ListStart { numbered });
        }

        nodes.push(Node::ListItem {
            level,
            numbered,
            fragments,
        });
    }

    fn close_all(&mut self, nodes: &mut Vec<Node>) {
        while self.open.pop().is_some() {
            nodes.push(Node::ListEnd);
        }
    }
}

fn split_row(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

fn is_separator_row(line: &str) -> bool {
    line.starts_with('|')
        && line.contains('-')
        && split_row(line)
            .iter()
            .all(|cell| SEPARATOR_CELL.is_match(cell))
}

fn alignment_of(cell: &str) -> Alignment {
    match (cell.starts_with(':'), cell.ends_with(':')) {
        (true, true) => Alignment::Center,
        (false, true) => Alignment::Right,
        _ => Alignment::Left,
    }
}

fn parse_cells(line: &str) -> Vec<Cell> {
    split_row(line).into_iter().map(parse_inline).collect()
}

struct ParsedTable {
    table: Table,
    consumed: usize,
    closes_measure: bool,
}

/// Text of a table line with a trailing measure-block terminator removed.
fn without_measure_end(text: &str) -> (String, bool) {
    if text.contains(MEASURE_END) {
        (text.replace(MEASURE_END, ""), true)
    } else {
        (text.to_string(), false)
    }
}

/// Parse the table whose header is `header` (line `idx`, already stripped
/// of any measure opener) and whose separator is the next line.
fn parse_table(
    header: &str,
    lines: &[LineRecord],
    idx: usize,
    separator: &LineRecord,
) -> ParseResult<ParsedTable> {
    let header = parse_cells(header);
    let expected = header.len();

    let (separator_text, mut closes_measure) = without_measure_end(&separator.text);
    let separator_cells = split_row(&separator_text);
    if separator_cells.len() != expected {
        return Err(ParseError::MalformedTable {
            line: separator.number,
            expected,
            found: separator_cells.len(),
        });
    }
    let alignments = separator_cells.into_iter().map(alignment_of).collect();

    let mut rows = Vec::new();
    let mut next = idx + 2;
    while let Some(line) = lines.get(next) {
        if closes_measure || !line.trimmed().starts_with('|') {
            break;
        }
        let (text, closes) = without_measure_end(&line.text);
        closes_measure = closes;
        let cells = parse_cells(&text);
        if cells.len() != expected {
            return Err(ParseError::MalformedTable {
                line: line.number,
                expected,
                found: cells.len(),
            });
        }
        rows.push(cells);
        next += 1;
    }

    Ok(ParsedTable {
        table: Table {
            header,
            rows,
            alignments,
        },
        consumed: next - idx,
        closes_measure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_rows_with_and_without_outer_pipes() {
        assert_eq!(split_row("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_row("|a|b"), vec!["a", "b"]);
        assert_eq!(split_row("| a |  |"), vec!["a", ""]);
    }

    #[test]
    fn recognises_separator_rows_and_alignment() {
        assert!(is_separator_row("|---|:--:|--:|"));
        assert!(!is_separator_row("| a | b |"));
        assert!(!is_separator_row("|   |   |"));
        assert_eq!(alignment_of(":--:"), Alignment::Center);
        assert_eq!(alignment_of("--:"), Alignment::Right);
        assert_eq!(alignment_of(":--"), Alignment::Left);
    }
}
