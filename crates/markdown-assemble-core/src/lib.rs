//! Orchestration for markdown-assemble: the render driver, the parallel
//! per-format passes and the PDF hand-off.

mod assemble;
mod error;
pub mod pdf;
mod render;

pub use assemble::{AssembleOutcome, Assembler};
pub use error::{AssembleError, AssembleResult, ExitCode, RenderError, RenderResult};
pub use render::{builder_for, render, render_all, RenderSummary};
