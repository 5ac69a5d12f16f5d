//! Inline span scanning: emphasis, strikethrough, links and instruction text.
//!
//! Spans are flat. A marker only opens a span when its closing marker follows
//! with non-blank content; otherwise it is kept as literal text. Scanning
//! never fails.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Fragment, FragmentStyle};

static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\(([^)\s]+)\)").expect("link pattern is valid"));

const INSTRUCTION_START: char = '{';
const INSTRUCTION_END: char = '}';

/// Delimited spans, longest markers first so `**` wins over `*`.
const DELIMITERS: &[(&str, Emphasis)] = &[
    ("**", Emphasis::Bold),
    ("__", Emphasis::Bold),
    ("~~", Emphasis::Strikethrough),
    ("*", Emphasis::Italic),
    ("_", Emphasis::Italic),
];

#[derive(Clone, Copy)]
enum Emphasis {
    Bold,
    Italic,
    Strikethrough,
}

impl Emphasis {
    fn style(self) -> FragmentStyle {
        match self {
            Emphasis::Bold => FragmentStyle::Bold,
            Emphasis::Italic => FragmentStyle::Italic,
            Emphasis::Strikethrough => FragmentStyle::Strikethrough,
        }
    }
}

pub fn parse_inline(text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut buffer = String::new();
    let mut rest = text;
    let mut previous: Option<char> = None;

    while let Some(ch) = rest.chars().next() {
        if let Some((fragment, consumed)) = match_span(rest, previous) {
            flush(&mut buffer, &mut fragments);
            fragments.push(fragment);
            previous = rest[..consumed].chars().next_back();
            rest = &rest[consumed..];
            continue;
        }

        buffer.push(ch);
        previous = Some(ch);
        rest = &rest[ch.len_utf8()..];
    }

    flush(&mut buffer, &mut fragments);
    fragments
}

fn flush(buffer: &mut String, fragments: &mut Vec<Fragment>) {
    if !buffer.is_empty() {
        fragments.push(Fragment::plain(std::mem::take(buffer)));
    }
}

fn match_span(rest: &str, previous: Option<char>) -> Option<(Fragment, usize)> {
    if rest.starts_with('[') {
        return match_link(rest);
    }

    if rest.starts_with(INSTRUCTION_START) {
        return match_instruction(rest);
    }

    for (marker, emphasis) in DELIMITERS {
        if !rest.starts_with(marker) {
            continue;
        }
        // snake_case and similar words never open emphasis.
        if marker.starts_with('_') && previous.is_some_and(char::is_alphanumeric) {
            return None;
        }
        if let Some(span) = match_delimited(rest, marker, *emphasis) {
            return Some(span);
        }
    }

    None
}

fn match_link(rest: &str) -> Option<(Fragment, usize)> {
    let captures = LINK.captures(rest)?;
    let whole = captures.get(0)?;
    Some((
        Fragment::link(&captures[1], &captures[2]),
        whole.end(),
    ))
}

fn match_instruction(rest: &str) -> Option<(Fragment, usize)> {
    let end = rest[1..].find(INSTRUCTION_END)? + 1;
    if rest[1..end].trim().is_empty() {
        return None;
    }
    let consumed = end + INSTRUCTION_END.len_utf8();
    Some((Fragment::instruction(&rest[..consumed]), consumed))
}

fn match_delimited(rest: &str, marker: &str, emphasis: Emphasis) -> Option<(Fragment, usize)> {
    let inner = &rest[marker.len()..];
    let close = inner.find(marker)?;
    let content = &inner[..close];

    if content.is_empty()
        || content.starts_with(char::is_whitespace)
        || content.ends_with(char::is_whitespace)
    {
        return None;
    }

    let consumed = marker.len() + close + marker.len();
    Some((Fragment::new(content, emphasis.style()), consumed))
}
