//! Pratt parser building the AST from the token stream.
//!
//! Expression parsing is table-driven: each token kind may register a prefix
//! handler (how to *start* an expression) and an infix handler (how to
//! *extend* one), and binary operators bind through precedence climbing.
//! The tables live on the parser instance and are populated at construction;
//! `register_prefix`/`register_infix` stay public so new expression forms can
//! be bolted on without touching the core loop.
//!
//! Grammar violations go through the same pluggable callback-and-counter
//! scheme as the lexer. A failed required-token check makes the enclosing
//! parse function return `None` immediately, which propagates upward as an
//! absent node; callers must check for it and stop building dependent
//! structure.

use std::collections::HashMap;

use crate::ast::{BinaryOperator, Expr, Program, Stmt};
use crate::lexer::{token_text, Lexer, Token, TokenKind};

/// Handler that begins an expression at the current token.
pub type PrefixFn = for<'src> fn(&mut Parser<'src>) -> Option<Box<Expr>>;

/// Handler that extends the given left-hand expression; invoked with the
/// operator as the current token.
pub type InfixFn = for<'src> fn(&mut Parser<'src>, Box<Expr>) -> Option<Box<Expr>>;

/// Callback invoked for every reported parser error or warning: file name,
/// the offending token and the already-formatted message.
pub type DiagnosticCallback = Box<dyn FnMut(&str, &Token, &str)>;

/// Binding strength of infix operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
  Lowest,
  Sum,
  Product,
}

/// Infix binding strength of a token kind; non-operators bind lowest.
pub fn token_precedence(kind: TokenKind) -> Precedence {
  match kind {
    TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
    TokenKind::Star | TokenKind::Slash => Precedence::Product,
    _ => Precedence::Lowest,
  }
}

fn default_error_callback(file: &str, token: &Token, msg: &str) {
  println!(
    "{file}[{}:{}] Parser Error {msg}",
    token.loc.line, token.loc.column
  );
}

fn default_warning_callback(file: &str, token: &Token, msg: &str) {
  println!(
    "{file}[{}:{}] Parser Warning {msg}",
    token.loc.line, token.loc.column
  );
}

pub struct Parser<'src> {
  lexer: Lexer<'src>,
  cur_token: Token,
  peek_token: Token,

  errors: u32,
  warnings: u32,
  ec: Option<DiagnosticCallback>,
  wc: Option<DiagnosticCallback>,

  prefix_fns: HashMap<TokenKind, PrefixFn>,
  infix_fns: HashMap<TokenKind, InfixFn>,
}

impl<'src> Parser<'src> {
  /// Create a parser with the default stdout diagnostics.
  pub fn new(lexer: Lexer<'src>) -> Self {
    Self::with_callbacks(
      lexer,
      Some(Box::new(default_error_callback)),
      Some(Box::new(default_warning_callback)),
    )
  }

  /// Create a parser with custom diagnostic callbacks. `None` suppresses
  /// output for that channel; the counts still increment.
  pub fn with_callbacks(
    mut lexer: Lexer<'src>,
    ec: Option<DiagnosticCallback>,
    wc: Option<DiagnosticCallback>,
  ) -> Self {
    // Fill both lookahead slots before any parsing call.
    let cur_token = lexer.scan_token();
    let peek_token = lexer.scan_token();

    let mut parser = Self {
      lexer,
      cur_token,
      peek_token,
      errors: 0,
      warnings: 0,
      ec,
      wc,
      prefix_fns: HashMap::new(),
      infix_fns: HashMap::new(),
    };

    parser.register_prefix(TokenKind::Constant, parse_constant);
    parser.register_prefix(TokenKind::String, parse_string_literal);
    parser.register_infix(TokenKind::Plus, parse_binary_expr);
    parser.register_infix(TokenKind::Minus, parse_binary_expr);
    parser.register_infix(TokenKind::Star, parse_binary_expr);
    parser.register_infix(TokenKind::Slash, parse_binary_expr);

    parser
  }

  /// Register how to begin an expression at a token kind.
  pub fn register_prefix(&mut self, kind: TokenKind, handler: PrefixFn) {
    self.prefix_fns.insert(kind, handler);
  }

  /// Register how to extend an expression at a token kind.
  pub fn register_infix(&mut self, kind: TokenKind, handler: InfixFn) {
    self.infix_fns.insert(kind, handler);
  }

  /// Number of errors reported so far.
  pub fn errors(&self) -> u32 {
    self.errors
  }

  /// Number of warnings reported so far.
  pub fn warnings(&self) -> u32 {
    self.warnings
  }

  /// The lexer this parser draws tokens from; useful for its error count.
  pub fn lexer(&self) -> &Lexer<'src> {
    &self.lexer
  }

  pub fn error(&mut self, token: &Token, msg: &str) {
    if let Some(ec) = self.ec.as_mut() {
      ec(self.lexer.file(), token, msg);
    }
    self.errors += 1;
  }

  pub fn warning(&mut self, token: &Token, msg: &str) {
    if let Some(wc) = self.wc.as_mut() {
      wc(self.lexer.file(), token, msg);
    }
    self.warnings += 1;
  }

  fn next_token(&mut self) {
    self.cur_token = std::mem::replace(&mut self.peek_token, self.lexer.scan_token());
  }

  fn expect(&mut self, kind: TokenKind) -> Option<()> {
    if self.cur_token.kind == kind {
      Some(())
    } else {
      let token = self.cur_token.clone();
      let msg = format!("expected token kind {}, got {}", kind, token.kind);
      self.error(&token, &msg);
      None
    }
  }

  fn expect_peek(&mut self, kind: TokenKind) -> Option<()> {
    if self.peek_token.kind == kind {
      self.next_token();
      Some(())
    } else {
      let token = self.peek_token.clone();
      let msg = format!("expected peek token kind {}, got {}", kind, token.kind);
      self.error(&token, &msg);
      None
    }
  }

  fn cur_literal_string(&self) -> String {
    token_text(&self.cur_token, self.lexer.source()).into_owned()
  }

  /// Parse a whole program: one function definition, or an absent one if
  /// parsing failed at any required token.
  pub fn parse_program(&mut self) -> Program {
    Program {
      main_function: self.parse_function(),
    }
  }

  // fn IDENT ( ) = EXPR ;
  fn parse_function(&mut self) -> Option<Box<Stmt>> {
    self.expect(TokenKind::Fn)?;
    self.expect_peek(TokenKind::Ident)?;
    let name = self.cur_literal_string();
    self.expect_peek(TokenKind::OpenParen)?;
    self.expect_peek(TokenKind::CloseParen)?;
    self.expect_peek(TokenKind::Equal)?;
    self.next_token();
    let body = self.parse_expression(Precedence::Lowest)?;
    self.expect_peek(TokenKind::Semicolon)?;
    Some(Box::new(Stmt::Function {
      name,
      body: Some(body),
    }))
  }

  /// Precedence-climbing core loop. The current token must start an
  /// expression; infix handlers fold in operators while the next token binds
  /// tighter than `min`.
  pub fn parse_expression(&mut self, min: Precedence) -> Option<Box<Expr>> {
    let prefix = match self.prefix_fns.get(&self.cur_token.kind) {
      Some(handler) => *handler,
      None => {
        let token = self.cur_token.clone();
        let msg = format!("no prefix parse handler for token kind {}", token.kind);
        self.error(&token, &msg);
        return None;
      }
    };
    let mut left = prefix(self)?;

    while self.peek_token.kind != TokenKind::Semicolon
      && min < token_precedence(self.peek_token.kind)
    {
      // A token that binds tighter but has no infix handler simply ends the
      // expression; that is not an error.
      let infix = match self.infix_fns.get(&self.peek_token.kind) {
        Some(handler) => *handler,
        None => return Some(left),
      };
      self.next_token();
      left = infix(self, left)?;
    }

    Some(left)
  }
}

fn parse_constant(p: &mut Parser<'_>) -> Option<Box<Expr>> {
  let token = p.cur_token.clone();
  let Some(value) = token.value else {
    p.error(&token, "internal error: constant token missing value");
    return None;
  };
  Some(Expr::constant(token, value))
}

fn parse_string_literal(p: &mut Parser<'_>) -> Option<Box<Expr>> {
  let token = p.cur_token.clone();
  let text = token_text(&token, p.lexer.source());
  // The literal span keeps the quote characters; the node owns the decoded
  // content without them.
  let content = text.strip_prefix('"').unwrap_or(&text);
  let content = content.strip_suffix('"').unwrap_or(content);
  let content = content.to_string();
  Some(Expr::string(token, content))
}

fn parse_binary_expr(p: &mut Parser<'_>, lhs: Box<Expr>) -> Option<Box<Expr>> {
  let token = p.cur_token.clone();
  let op = match token.kind {
    TokenKind::Plus => BinaryOperator::Add,
    TokenKind::Minus => BinaryOperator::Sub,
    TokenKind::Star => BinaryOperator::Mul,
    TokenKind::Slash => BinaryOperator::Div,
    _ => {
      p.error(&token, "internal error: token has no binary operator");
      return None;
    }
  };
  let precedence = token_precedence(token.kind);
  p.next_token();
  let rhs = p.parse_expression(precedence)?;
  Some(Expr::binary(token, op, lhs, rhs))
}
