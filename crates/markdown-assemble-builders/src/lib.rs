//! Output builders for assembled documents.
//!
//! A [`Builder`] receives structural events from the render driver and owns
//! everything format specific. [`DocxBuilder`] fills a copy of a reference
//! Word template; [`HtmlBuilder`] writes a standalone HTML page that also
//! feeds the PDF hand-off.

mod builder;
mod docx;
mod error;
mod html;

pub use builder::Builder;
pub use docx::{
    extent_emu, read_image_info, DocxBuilder, ImageFormat, ImageInfo, StyleMap, DEFAULT_DPI,
    EMU_PER_INCH, MAX_PICTURE_WIDTH_EMU,
};
pub use error::{BuildError, BuildResult};
pub use html::HtmlBuilder;
