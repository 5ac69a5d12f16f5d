//! Structural document tree produced by the parser and consumed by builders.
//!
//! The tree is flat: headings do not own children, and hierarchy is implied by
//! consecutive heading levels. Node order is the only structural invariant.

use std::path::PathBuf;

/// Inline styling carried by a [`Fragment`]. Styles do not nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentStyle {
    Plain,
    Bold,
    Italic,
    Strikethrough,
    /// Placeholder text the reader is expected to replace; rendered highlighted.
    Instruction,
    Link { target: String },
}

/// Smallest unit of inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub style: FragmentStyle,
}

impl Fragment {
    pub fn new(text: impl Into<String>, style: FragmentStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, FragmentStyle::Plain)
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(text, FragmentStyle::Bold)
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self::new(text, FragmentStyle::Italic)
    }

    pub fn instruction(text: impl Into<String>) -> Self {
        Self::new(text, FragmentStyle::Instruction)
    }

    pub fn link(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            text,
            FragmentStyle::Link {
                target: target.into(),
            },
        )
    }
}

/// Concatenated text of `fragments`, ignoring styling.
pub fn plain_text(fragments: &[Fragment]) -> String {
    fragments.iter().map(|fragment| fragment.text.as_str()).collect()
}

/// Role of a paragraph within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphContext {
    Body,
    Title,
    Subtitle,
    /// Paragraph inside a `@{ … }@` measure block.
    Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Cell content: a left-to-right run of fragments.
pub type Cell = Vec<Fragment>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
    pub alignments: Vec<Alignment>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn alignment(&self, column: usize) -> Alignment {
        self.alignments.get(column).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Heading {
        level: u8,
        is_appendix: bool,
        fragments: Vec<Fragment>,
    },
    Paragraph {
        fragments: Vec<Fragment>,
        context: ParagraphContext,
    },
    ListStart {
        numbered: bool,
    },
    ListItem {
        level: usize,
        numbered: bool,
        fragments: Vec<Fragment>,
    },
    ListEnd,
    Table(Table),
    Image {
        path: PathBuf,
        alt: String,
        title: Option<String>,
    },
    PageBreak,
    TableOfContents,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Heading { .. } => NodeKind::Heading,
            Node::Paragraph { .. } => NodeKind::Paragraph,
            Node::ListStart { .. } | Node::ListItem { .. } | Node::ListEnd => NodeKind::List,
            Node::Table(_) => NodeKind::Table,
            Node::Image { .. } => NodeKind::Image,
            Node::PageBreak => NodeKind::PageBreak,
            Node::TableOfContents => NodeKind::TableOfContents,
        }
    }
}

/// Coarse node categories; builders declare which ones they can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Heading,
    Paragraph,
    List,
    Table,
    Image,
    PageBreak,
    TableOfContents,
}

/// Parsed document: nodes in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_table_of_contents(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node, Node::TableOfContents))
    }
}
