//! IR emission: walks the AST bottom-up, producing temporaries and flat
//! instruction lists.
//!
//! The `Lowerer` owns the temporary-name counter, so temporaries are unique
//! for the duration of one compilation and two lowerers never interfere.
//! Constant expressions emit no instructions at all; binary expressions
//! lower their left operand before their right one and never constant-fold.
//!
//! String literals and function calls have no lowering yet. What happens
//! when one reaches the emitter is a policy decision: the default degrades
//! to a zero-constant placeholder with a warning so a partial compile still
//! produces output, while `Strict` turns it into a hard error.

use snafu::Snafu;

use crate::ast::{BinaryOperator, Expr, ExprKind, Program, Stmt};
use crate::ir::{Function, InstKind, Instruction, IrProgram, Value};

#[derive(Debug, Snafu)]
pub enum LowerError {
  #[snafu(display("unsupported expression at {line}:{column} reached IR lowering"))]
  UnsupportedExpr { line: u32, column: u32 },

  #[snafu(display("program contains no function to lower"))]
  MissingFunction,

  #[snafu(display("function \"{name}\" has no body expression"))]
  MissingBody { name: String },
}

/// What to do when an expression kind without a lowering is encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedExprPolicy {
  /// Warn and substitute a zero constant with no instructions.
  #[default]
  Placeholder,
  /// Fail the compilation with a structured error.
  Strict,
}

/// Result of lowering one expression: the instructions that must execute, in
/// order, before `result` is usable.
#[derive(Debug, PartialEq)]
pub struct LoweredExpr {
  pub instructions: Box<[Instruction]>,
  pub result: Box<Value>,
}

pub struct Lowerer {
  next_temp: u64,
  policy: UnsupportedExprPolicy,
}

impl Default for Lowerer {
  fn default() -> Self {
    Self::new()
  }
}

fn inst_kind(op: BinaryOperator) -> InstKind {
  match op {
    BinaryOperator::Add => InstKind::Add,
    BinaryOperator::Sub => InstKind::Sub,
    BinaryOperator::Mul => InstKind::Mul,
    BinaryOperator::Div => InstKind::Div,
  }
}

impl Lowerer {
  pub fn new() -> Self {
    Self::with_policy(UnsupportedExprPolicy::default())
  }

  pub fn with_policy(policy: UnsupportedExprPolicy) -> Self {
    Self {
      next_temp: 0,
      policy,
    }
  }

  /// Allocate a fresh uniquely-named temporary.
  fn make_temp(&mut self) -> Box<Value> {
    let name = format!("t{}", self.next_temp);
    self.next_temp += 1;
    Box::new(Value::Temp(name))
  }

  /// Lower a whole program. The emitter performs no semantic validation
  /// beyond requiring that the program actually has a function with a body.
  pub fn emit_program(&mut self, program: &Program) -> Result<IrProgram, LowerError> {
    let stmt = program
      .main_function
      .as_deref()
      .ok_or(LowerError::MissingFunction)?;
    Ok(IrProgram {
      main_function: Box::new(self.emit_function(stmt)?),
    })
  }

  /// Lower one function: the body expression's instructions followed by a
  /// single RET of its result.
  pub fn emit_function(&mut self, stmt: &Stmt) -> Result<Function, LowerError> {
    let Stmt::Function { name, body } = stmt;
    let body = body.as_deref().ok_or_else(|| LowerError::MissingBody {
      name: name.clone(),
    })?;

    let lowered = self.emit_expr(body)?;
    let mut buffer = lowered.instructions.into_vec();
    buffer.push(Instruction::new(
      InstKind::Ret,
      Some(lowered.result),
      None,
      None,
    ));

    Ok(Function {
      name: name.clone(),
      instructions: buffer.into_boxed_slice(),
    })
  }

  /// Lower one expression bottom-up.
  pub fn emit_expr(&mut self, expr: &Expr) -> Result<LoweredExpr, LowerError> {
    match &expr.kind {
      ExprKind::Constant { value } => Ok(LoweredExpr {
        instructions: Box::default(),
        result: Box::new(Value::Constant(*value)),
      }),
      ExprKind::Binary { op, lhs, rhs } => {
        let mut buffer = Vec::new();

        // Left-to-right evaluation: the lhs instruction list runs first.
        let lhs = self.emit_expr(lhs)?;
        buffer.extend(lhs.instructions.into_vec());
        let rhs = self.emit_expr(rhs)?;
        buffer.extend(rhs.instructions.into_vec());

        let dst = self.make_temp();
        let result = dst.clone();
        buffer.push(Instruction::new(
          inst_kind(*op),
          Some(lhs.result),
          Some(rhs.result),
          Some(dst),
        ));

        Ok(LoweredExpr {
          instructions: buffer.into_boxed_slice(),
          result,
        })
      }
      ExprKind::StringLit { .. } | ExprKind::FunctionCall { .. } => match self.policy {
        UnsupportedExprPolicy::Placeholder => {
          log::warn!(
            "skipping unsupported expression at {}:{} during IR lowering",
            expr.token.loc.line,
            expr.token.loc.column
          );
          Ok(LoweredExpr {
            instructions: Box::default(),
            result: Box::new(Value::Constant(0)),
          })
        }
        UnsupportedExprPolicy::Strict => Err(LowerError::UnsupportedExpr {
          line: expr.token.loc.line,
          column: expr.token.loc.column,
        }),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::ExprList;
  use crate::lexer::{Loc, Token, TokenKind};

  fn tok(kind: TokenKind) -> Token {
    Token::new(
      kind,
      Loc {
        pos: 0,
        line: 1,
        column: 1,
      },
      0,
      None,
    )
  }

  fn constant(value: i64) -> Box<Expr> {
    Expr::constant(tok(TokenKind::Constant), value)
  }

  fn binary(op: BinaryOperator, lhs: Box<Expr>, rhs: Box<Expr>) -> Box<Expr> {
    Expr::binary(tok(TokenKind::Plus), op, lhs, rhs)
  }

  fn render(function: &Function) -> String {
    function.to_string()
  }

  #[test]
  fn constant_emits_no_instructions() {
    let mut lowerer = Lowerer::new();
    let lowered = lowerer.emit_expr(&constant(42)).unwrap();
    assert!(lowered.instructions.is_empty());
    assert_eq!(*lowered.result, Value::Constant(42));
  }

  #[test]
  fn function_body_gets_a_trailing_ret() {
    let mut lowerer = Lowerer::new();
    let stmt = Stmt::Function {
      name: "main".to_string(),
      body: Some(constant(42)),
    };
    let function = lowerer.emit_function(&stmt).unwrap();
    assert_eq!(render(&function), "function main:\n  RET 42\n");
  }

  #[test]
  fn binary_lowering_is_left_to_right_without_folding() {
    // 1 + 2 * 3
    let expr = binary(
      BinaryOperator::Add,
      constant(1),
      binary(BinaryOperator::Mul, constant(2), constant(3)),
    );
    let mut lowerer = Lowerer::new();
    let stmt = Stmt::Function {
      name: "main".to_string(),
      body: Some(expr),
    };
    let function = lowerer.emit_function(&stmt).unwrap();
    assert_eq!(
      render(&function),
      "function main:\n  %t0 = MUL 2, 3\n  %t1 = ADD 1, %t0\n  RET %t1\n"
    );
  }

  #[test]
  fn left_chain_materializes_intermediate_temps() {
    // (1 + 2) + 3
    let expr = binary(
      BinaryOperator::Add,
      binary(BinaryOperator::Add, constant(1), constant(2)),
      constant(3),
    );
    let mut lowerer = Lowerer::new();
    let lowered = lowerer.emit_expr(&expr).unwrap();
    assert_eq!(lowered.instructions.len(), 2);
    assert_eq!(lowered.instructions[0].to_string(), "  %t0 = ADD 1, 2");
    assert_eq!(lowered.instructions[1].to_string(), "  %t1 = ADD %t0, 3");
    assert_eq!(*lowered.result, Value::Temp("t1".to_string()));
  }

  #[test]
  fn temporaries_are_unique_within_one_compilation() {
    let expr = binary(
      BinaryOperator::Add,
      binary(BinaryOperator::Sub, constant(1), constant(2)),
      binary(BinaryOperator::Mul, constant(3), constant(4)),
    );
    let mut lowerer = Lowerer::new();
    let lowered = lowerer.emit_expr(&expr).unwrap();
    let mut temps: Vec<String> = lowered
      .instructions
      .iter()
      .filter_map(|inst| inst.dst.as_deref())
      .map(|dst| dst.to_string())
      .collect();
    temps.sort();
    temps.dedup();
    assert_eq!(temps.len(), lowered.instructions.len());
  }

  #[test]
  fn unsupported_expression_degrades_to_placeholder() {
    let expr = Expr::function_call(
      tok(TokenKind::Ident),
      ExprList::freeze(vec![constant(1)]),
    );
    let mut lowerer = Lowerer::new();
    let lowered = lowerer.emit_expr(&expr).unwrap();
    assert!(lowered.instructions.is_empty());
    assert_eq!(*lowered.result, Value::Constant(0));
  }

  #[test]
  fn strict_policy_turns_unsupported_into_an_error() {
    let expr = Expr::string(tok(TokenKind::String), "hi".to_string());
    let mut lowerer = Lowerer::with_policy(UnsupportedExprPolicy::Strict);
    let result = lowerer.emit_expr(&expr);
    assert!(matches!(
      result,
      Err(LowerError::UnsupportedExpr { line: 1, column: 1 })
    ));
  }

  #[test]
  fn lowering_an_empty_program_fails() {
    let program = Program {
      main_function: None,
    };
    let mut lowerer = Lowerer::new();
    assert!(matches!(
      lowerer.emit_program(&program),
      Err(LowerError::MissingFunction)
    ));
  }
}
