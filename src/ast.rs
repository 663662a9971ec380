//! The abstract syntax tree: closed sum types for expressions and statements.
//!
//! Every node exclusively owns its children through `Box`, so dropping a node
//! tears down its whole subtree exactly once. Each expression also carries a
//! clone of the token that introduced it, for diagnostics. The `Display`
//! impls produce the compact single-line form used by `--print=ast` and the
//! test suite, e.g. `program(stmt_function(name = main, body =
//! expr_constant(42)))`.

use std::fmt;

use crate::lexer::Token;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOperator {
  pub fn symbol(&self) -> &'static str {
    match self {
      BinaryOperator::Add => "+",
      BinaryOperator::Sub => "-",
      BinaryOperator::Mul => "*",
      BinaryOperator::Div => "/",
    }
  }
}

impl fmt::Display for BinaryOperator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.symbol())
  }
}

/// An expression node. The token is the one that introduced the expression
/// and is owned by the node (an independent clone, never a shared reference).
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
  pub token: Token,
  pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
  /// A string literal; the content is decoded (quotes stripped) and owned.
  StringLit { content: String },
  /// A signed 64-bit integer constant.
  Constant { value: i64 },
  /// A function call with an ordered, frozen argument list.
  FunctionCall { params: ExprList },
  /// A binary operation owning both operand subtrees.
  Binary {
    op: BinaryOperator,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
}

impl Expr {
  pub fn string(token: Token, content: String) -> Box<Self> {
    Box::new(Self {
      token,
      kind: ExprKind::StringLit { content },
    })
  }

  pub fn constant(token: Token, value: i64) -> Box<Self> {
    Box::new(Self {
      token,
      kind: ExprKind::Constant { value },
    })
  }

  pub fn function_call(token: Token, params: ExprList) -> Box<Self> {
    Box::new(Self {
      token,
      kind: ExprKind::FunctionCall { params },
    })
  }

  pub fn binary(token: Token, op: BinaryOperator, lhs: Box<Expr>, rhs: Box<Expr>) -> Box<Self> {
    Box::new(Self {
      token,
      kind: ExprKind::Binary { op, lhs, rhs },
    })
  }
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.kind {
      ExprKind::StringLit { content } => write!(f, "expr_string(\"{content}\")"),
      ExprKind::Constant { value } => write!(f, "expr_constant({value})"),
      ExprKind::FunctionCall { params } => write!(f, "expr_function_call({params})"),
      ExprKind::Binary { op, lhs, rhs } => write!(f, "expr_binary({lhs} {op} {rhs})"),
    }
  }
}

/// An immutable, fixed-size list of owned expressions, frozen from a growable
/// staging buffer. The buffer is consumed; ownership of every element moves
/// into the list.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprList {
  items: Box<[Box<Expr>]>,
}

impl ExprList {
  /// Freeze a staging buffer into a fixed-size list. Freezing an empty
  /// buffer is a usage error.
  pub fn freeze(buffer: Vec<Box<Expr>>) -> Self {
    assert!(!buffer.is_empty(), "cannot freeze an empty expression list");
    Self {
      items: buffer.into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Box<Expr>> {
    self.items.iter()
  }
}

impl fmt::Display for ExprList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, expr) in self.items.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{expr}")?;
    }
    Ok(())
  }
}

/// A statement. The language currently has exactly one statement form.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  /// A function definition: `fn NAME() = EXPR;`
  Function {
    name: String,
    body: Option<Box<Expr>>,
  },
}

impl fmt::Display for Stmt {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Stmt::Function { name, body } => {
        write!(f, "stmt_function(name = {name}, body = ")?;
        match body {
          Some(expr) => write!(f, "{expr}")?,
          None => write!(f, "null")?,
        }
        write!(f, ")")
      }
    }
  }
}

/// A whole program: at most one top-level function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub main_function: Option<Box<Stmt>>,
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "program(")?;
    match &self.main_function {
      Some(stmt) => write!(f, "{stmt}")?,
      None => write!(f, "null")?,
    }
    write!(f, ")")
  }
}
