//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `lexer` turns the raw byte buffer into a stream of classified tokens.
//! - `ast` holds the tagged expression/statement tree the parser builds.
//! - `parser` owns all syntactic knowledge, driven by pluggable
//!   prefix/infix handler tables.
//! - `ir` and `lower` flatten the tree into three-address instructions.
//! - `codegen` renders the IR as flat-assembler x86-64 Linux text.
//! - `error` centralises the pipeline-level error type.
//!
//! Data flows one way through the stages; each stage fully consumes its
//! input before the next begins.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod parser;

pub use error::{CompileError, CompileResult};

/// Compile a single source buffer into flat-assembler x86-64 Linux text.
///
/// Lexer and parser diagnostics go to their default stdout callbacks; if any
/// were reported the compilation stops before lowering.
pub fn compile_to_assembly(source: &[u8], file_name: &str) -> CompileResult<String> {
  let lexer = lexer::Lexer::new(source, file_name);
  let mut parser = parser::Parser::new(lexer);
  let program = parser.parse_program();

  let errors = parser.errors() + parser.lexer().errors();
  if errors > 0 {
    return Err(CompileError::ParseFailed { errors });
  }

  let ir = lower::Lowerer::new().emit_program(&program)?;
  Ok(codegen::generate(&ir))
}
