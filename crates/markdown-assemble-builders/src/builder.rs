use std::path::Path;

use markdown_assemble_parser::{Fragment, NodeKind, ParagraphContext, Table};

use crate::error::BuildResult;

/// Receiver of structural document events for one output format.
///
/// The render driver calls these in document order. Builders keep their own
/// output state and never hand content back; everything is flushed by
/// [`Builder::end_document`].
pub trait Builder {
    /// Short format name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this builder can render nodes of `kind`. Unsupported kinds are
    /// skipped by the driver.
    fn supports(&self, _kind: NodeKind) -> bool {
        true
    }

    fn start_document(&mut self, title: &str) -> BuildResult<()>;

    fn end_document(&mut self) -> BuildResult<()>;

    fn build_header(&mut self, fragments: &[Fragment]) -> BuildResult<()>;

    fn build_footer(&mut self) -> BuildResult<()>;

    fn build_table_of_contents(&mut self) -> BuildResult<()>;

    fn create_heading(
        &mut self,
        level: u8,
        fragments: &[Fragment],
        is_appendix: bool,
    ) -> BuildResult<()>;

    fn start_list(&mut self, numbered: bool) -> BuildResult<()>;

    fn create_list_item(
        &mut self,
        level: usize,
        numbered: bool,
        fragments: &[Fragment],
    ) -> BuildResult<()>;

    fn end_list(&mut self) -> BuildResult<()>;

    fn create_paragraph(
        &mut self,
        fragments: &[Fragment],
        context: ParagraphContext,
    ) -> BuildResult<()>;

    fn create_table(&mut self, table: &Table) -> BuildResult<()>;

    fn insert_page_break(&mut self) -> BuildResult<()>;

    fn insert_picture(&mut self, path: &Path, alt: &str) -> BuildResult<()>;
}
