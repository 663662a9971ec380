//! The linear intermediate representation: one flat instruction list per
//! function, three-address style.
//!
//! Values are boxed so they can be moved individually between instruction
//! operand slots; an instruction exclusively owns whatever values sit in its
//! slots. Cloning a constant is a cheap copy, cloning a temporary duplicates
//! its generated name. The `Display` impls produce the text form used by
//! `--print=ir` and the test suite:
//!
//! ```text
//! function main:
//!   %t0 = ADD 1, 2
//!   RET %t0
//! ```

use std::fmt;

/// An IR operand: either an embedded constant or a named temporary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Constant(i64),
  Temp(String),
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Constant(value) => write!(f, "{value}"),
      Value::Temp(name) => write!(f, "%{name}"),
    }
  }
}

/// Instruction kinds in the IR's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstKind {
  Ret,
  Add,
  Sub,
  Mul,
  Div,
}

impl InstKind {
  pub fn mnemonic(&self) -> &'static str {
    match self {
      InstKind::Ret => "RET",
      InstKind::Add => "ADD",
      InstKind::Sub => "SUB",
      InstKind::Mul => "MUL",
      InstKind::Div => "DIV",
    }
  }
}

/// A single instruction with up to three operand slots. Slots the kind does
/// not use stay `None`; every `Some` value is exclusively owned.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
  pub kind: InstKind,
  pub lhs: Option<Box<Value>>,
  pub rhs: Option<Box<Value>>,
  pub dst: Option<Box<Value>>,
}

impl Instruction {
  /// Convenience constructor to keep the emitter readable.
  pub fn new(
    kind: InstKind,
    lhs: Option<Box<Value>>,
    rhs: Option<Box<Value>>,
    dst: Option<Box<Value>>,
  ) -> Self {
    Self {
      kind,
      lhs,
      rhs,
      dst,
    }
  }
}

fn fmt_operand(f: &mut fmt::Formatter<'_>, operand: Option<&Value>) -> fmt::Result {
  match operand {
    Some(value) => write!(f, "{value}"),
    None => write!(f, "(invalid operand)"),
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      InstKind::Ret => {
        write!(f, "  RET ")?;
        fmt_operand(f, self.lhs.as_deref())
      }
      InstKind::Add | InstKind::Sub | InstKind::Mul | InstKind::Div => {
        write!(f, "  ")?;
        fmt_operand(f, self.dst.as_deref())?;
        write!(f, " = {} ", self.kind.mnemonic())?;
        fmt_operand(f, self.lhs.as_deref())?;
        write!(f, ", ")?;
        fmt_operand(f, self.rhs.as_deref())
      }
    }
  }
}

/// A lowered function: an owned name and a frozen flat instruction list.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub name: String,
  pub instructions: Box<[Instruction]>,
}

impl fmt::Display for Function {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "function {}:", self.name)?;
    for inst in self.instructions.iter() {
      writeln!(f, "{inst}")?;
    }
    Ok(())
  }
}

/// A lowered program: a single owned main function.
#[derive(Debug, Clone, PartialEq)]
pub struct IrProgram {
  pub main_function: Box<Function>,
}

impl fmt::Display for IrProgram {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.main_function)
  }
}
