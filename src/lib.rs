pub mod result;

pub mod cli;
pub mod compiler;
pub mod diagnostics;

pub use cli::*;
pub use compiler::compiler::{compile, parse_unit, Emit, Format, Options, Output, PipelineError};
