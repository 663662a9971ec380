//! Pipeline-level errors shared by the library surface and the driver.
//!
//! Lexer and parser diagnostics are callback-driven with running counters
//! (see their modules); this type covers the boundaries where a caller needs
//! an error as a value: driver I/O, an aborted parse, a failed lowering.

use snafu::Snafu;

use crate::lower::LowerError;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("could not read {path}: {source}"))]
  ReadInput {
    path: String,
    source: std::io::Error,
  },

  #[snafu(display("parsing failed with {errors} error(s)"))]
  ParseFailed { errors: u32 },

  #[snafu(display("{source}"))]
  #[snafu(context(false))]
  Lower { source: LowerError },
}
