//! Markdown fragment parsing for the assembler.
//!
//! Fragments are stitched together by [`expand`], optionally run through
//! [`substitute_variables`], and turned into a flat [`Document`] by [`parse`].
//! Builders walk that document; they never see markdown.

mod anchor;
mod error;
mod heading;
mod include;
mod inline;
mod line;
mod model;
mod parse;
mod variables;

pub use anchor::generate_anchor;
pub use error::{ParseError, ParseResult};
pub use heading::{detect_atx_heading, AtxHeading, MAX_HEADING_LEVEL};
pub use include::{expand, include_target};
pub use inline::parse_inline;
pub use model::{
    plain_text, Alignment, Cell, Document, Fragment, FragmentStyle, Node, NodeKind,
    ParagraphContext, Table,
};
pub use parse::{parse, ParseOptions};
pub use variables::substitute_variables;
