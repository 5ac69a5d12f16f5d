/// One source line with its 1-based number and terminator stripped.
#[derive(Debug, Clone)]
pub struct LineRecord {
    pub number: usize,
    pub text: String,
    /// Leading indentation in columns (tab = 4).
    pub indent: usize,
}

impl LineRecord {
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub fn split_lines(text: &str) -> Vec<LineRecord> {
    let mut lines = Vec::new();

    for (idx, segment) in text.split_inclusive('\n').enumerate() {
        let mut line = segment;

        if let Some(stripped) = line.strip_suffix('\n') {
            line = stripped;

            if let Some(stripped) = line.strip_suffix('\r') {
                line = stripped;
            }
        }

        lines.push(LineRecord {
            number: idx + 1,
            text: line.to_string(),
            indent: indent_width(line),
        });
    }

    lines
}

pub fn indent_width(line: &str) -> usize {
    let mut width = 0usize;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_crlf_and_counts_indent() {
        let lines = split_lines("a\r\n\t- b\n  c");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "a");
        assert_eq!(lines[1].indent, 4);
        assert_eq!(lines[2].number, 3);
        assert_eq!(lines[2].indent, 2);
    }
}
