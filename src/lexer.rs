//! Lexical analysis: turns a raw UTF-8 byte buffer into a token stream.
//!
//! The lexer hands out one token per `scan_token` call, tracking the byte
//! offset, 1-based line and 1-based column as it goes. Anomalies (malformed
//! UTF-8, a misplaced byte-order mark, unrecognized characters) are reported
//! through a pluggable callback and counted, but never abort the scan – the
//! caller looks at the error count and decides whether to keep going.

use std::borrow::Cow;
use std::collections::HashMap;

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Eof,
  Invalid,
  Ident,
  // Literals
  Constant,
  String,
  // Punctuation
  OpenParen,
  CloseParen,
  Equal,
  Semicolon,
  Plus,
  Minus,
  Star,
  Slash,
  // Keywords
  Fn,
}

impl std::fmt::Display for TokenKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      TokenKind::Eof => "EOF",
      TokenKind::Invalid => "INVALID",
      TokenKind::Ident => "IDENT",
      TokenKind::Constant => "CONSTANT",
      TokenKind::String => "STRING",
      TokenKind::OpenParen => "OPEN_PAREN",
      TokenKind::CloseParen => "CLOSE_PAREN",
      TokenKind::Equal => "EQUAL",
      TokenKind::Semicolon => "SEMICOLON",
      TokenKind::Plus => "PLUS",
      TokenKind::Minus => "MINUS",
      TokenKind::Star => "STAR",
      TokenKind::Slash => "SLASH",
      TokenKind::Fn => "FN",
    })
  }
}

/// Position of a token in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
  /// Absolute byte offset.
  pub pos: u32,
  /// 1-based line number.
  pub line: u32,
  /// 1-based column, measured in bytes from the start of the line.
  pub column: u32,
}

/// Thin wrapper for lexical information needed by later stages. The literal
/// text is the `len`-byte span of the source starting at `loc.pos`; resolve
/// it with [`token_text`] or [`Lexer::literal`].
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: Loc,
  pub len: u32,
  /// Parsed numeric value, present on `Constant` tokens only.
  pub value: Option<i64>,
}

impl Token {
  /// Convenience constructor to keep the scanning code readable.
  pub fn new(kind: TokenKind, loc: Loc, len: u32, value: Option<i64>) -> Self {
    Self {
      kind,
      loc,
      len,
      value,
    }
  }
}

/// Return the slice of the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a [u8]) -> Cow<'a, str> {
  let start = token.loc.pos as usize;
  let end = start + token.len as usize;
  String::from_utf8_lossy(&source[start..end])
}

/// Callback invoked for every reported lexer error: file name, location and
/// the already-formatted message.
pub type LexerErrorCallback = Box<dyn FnMut(&str, Loc, &str)>;

fn default_error_callback(file: &str, loc: Loc, msg: &str) {
  println!("{file}[{}:{}] Lexer Error {msg}", loc.line, loc.column);
}

/// Streaming tokenizer over a byte buffer.
///
/// The cursor keeps one decoded code point of lookahead in `ch`; `pos` is the
/// byte offset of that code point, `read_pos` the offset of the next one.
pub struct Lexer<'src> {
  input: &'src [u8],
  file: String,

  pos: u32,
  read_pos: u32,
  pos_since_line: u32,
  line: u32,
  ch: Option<char>,
  /// Whether `ch` is a replacement character substituted for malformed
  /// input, as opposed to a literal U+FFFD present in the source.
  ch_substituted: bool,

  errors: u32,
  ec: Option<LexerErrorCallback>,
  keywords: HashMap<&'static str, TokenKind>,
}

/// Length of the maximal invalid sequence at the start of `bytes`: the lead
/// byte plus any continuation bytes that follow it. Skipping the whole
/// sequence keeps one reported error per invalid unit.
fn invalid_seq_len(bytes: &[u8]) -> u32 {
  let tail = bytes[1..]
    .iter()
    .take(3)
    .take_while(|&&b| matches!(b, 0x80..=0xbf))
    .count();
  (1 + tail) as u32
}

/// Decode the first code point of `bytes`. On malformed input the error
/// carries the number of bytes to skip so the caller can resynchronise.
fn decode_utf8(bytes: &[u8]) -> Result<(char, u32), u32> {
  let width = match bytes[0] {
    0x00..=0x7f => 1,
    0xc2..=0xdf => 2,
    0xe0..=0xef => 3,
    0xf0..=0xf4 => 4,
    _ => return Err(invalid_seq_len(bytes)),
  };
  if bytes.len() < width {
    return Err(bytes.len() as u32);
  }
  match std::str::from_utf8(&bytes[..width]) {
    Ok(s) => s
      .chars()
      .next()
      .map(|ch| (ch, width as u32))
      .ok_or_else(|| invalid_seq_len(bytes)),
    Err(_) => Err(invalid_seq_len(bytes)),
  }
}

fn is_letter(ch: char) -> bool {
  ch.is_alphabetic()
}

impl<'src> Lexer<'src> {
  /// Create a lexer with the default stdout error callback.
  pub fn new(input: &'src [u8], file: impl Into<String>) -> Self {
    Self::with_callback(input, file, Some(Box::new(default_error_callback)))
  }

  /// Create a lexer with a custom error callback. Passing `None` suppresses
  /// diagnostic output; the error count still increments.
  pub fn with_callback(
    input: &'src [u8],
    file: impl Into<String>,
    ec: Option<LexerErrorCallback>,
  ) -> Self {
    let mut keywords = HashMap::new();
    keywords.insert("fn", TokenKind::Fn);

    let mut lexer = Self {
      input,
      file: file.into(),
      pos: 0,
      read_pos: 0,
      pos_since_line: 0,
      line: 1,
      ch: None,
      ch_substituted: false,
      errors: 0,
      ec,
      keywords,
    };

    lexer.read_ch();
    // A byte-order mark is accepted only as the very first character.
    if lexer.ch == Some('\u{feff}') {
      lexer.read_ch();
    }

    lexer
  }

  /// Number of errors reported so far.
  pub fn errors(&self) -> u32 {
    self.errors
  }

  /// Name of the file being lexed, as given to the constructor.
  pub fn file(&self) -> &str {
    &self.file
  }

  /// The full source buffer this lexer scans.
  pub fn source(&self) -> &'src [u8] {
    self.input
  }

  /// Literal bytes of a token produced by this lexer.
  pub fn literal(&self, token: &Token) -> &'src [u8] {
    let start = token.loc.pos as usize;
    &self.input[start..start + token.len as usize]
  }

  fn pos_to_loc(&self, pos: u32) -> Loc {
    Loc {
      pos,
      line: self.line,
      column: pos - self.pos_since_line + 1,
    }
  }

  fn error(&mut self, msg: &str) {
    let loc = self.pos_to_loc(self.pos);
    if let Some(ec) = self.ec.as_mut() {
      ec(&self.file, loc, msg);
    }
    self.errors += 1;
  }

  /// Advance the cursor by one code point, keeping line bookkeeping in sync.
  fn read_ch(&mut self) {
    if (self.read_pos as usize) < self.input.len() {
      self.pos = self.read_pos;
      if self.ch == Some('\n') {
        self.pos_since_line = self.pos;
        self.line += 1;
      }

      let (ch, width, substituted) = match decode_utf8(&self.input[self.pos as usize..]) {
        Ok((ch, width)) => (ch, width, false),
        Err(skip) => {
          self.error("invalid utf8 character");
          (char::REPLACEMENT_CHARACTER, skip, true)
        }
      };

      if ch == '\u{feff}' && self.pos > 0 {
        self.error("illegal byte order mark");
      }

      self.ch = Some(ch);
      self.ch_substituted = substituted;
      self.read_pos += width;
    } else {
      self.pos = self.input.len() as u32;
      if self.ch == Some('\n') {
        self.pos_since_line = self.pos;
        self.line += 1;
      }
      self.ch = None;
      self.ch_substituted = false;
    }
  }

  /// Peek at the code point after the current one without advancing.
  fn peek_ch(&self) -> Option<char> {
    let rest = self.input.get(self.read_pos as usize..)?;
    if rest.is_empty() {
      return None;
    }
    decode_utf8(rest).ok().map(|(ch, _)| ch)
  }

  fn skip_whitespace(&mut self) {
    while matches!(self.ch, Some(' ') | Some('\t') | Some('\n')) {
      self.read_ch();
    }
  }

  fn scan_ident(&mut self) {
    while self
      .ch
      .is_some_and(|ch| is_letter(ch) || ch.is_ascii_digit())
    {
      self.read_ch();
    }
  }

  // self.ch == '"' on entry. The literal span keeps both quote characters;
  // an unterminated string simply runs to the end of input.
  fn scan_string(&mut self) {
    self.read_ch();
    while self.ch != Some('"') && self.ch.is_some() {
      self.read_ch();
    }
    self.read_ch();
  }

  fn scan_constant(&mut self) -> i64 {
    let minus = self.ch == Some('-');
    if minus {
      self.read_ch();
    }

    let mut value: i64 = 0;
    while let Some(digit) = self.ch.and_then(|ch| ch.to_digit(10)) {
      value = value.wrapping_mul(10).wrapping_add(digit as i64);
      self.read_ch();
    }

    if minus { value.wrapping_neg() } else { value }
  }

  fn constant_token(&mut self, start: u32, loc: Loc) -> Token {
    let value = self.scan_constant();
    Token::new(TokenKind::Constant, loc, self.pos - start, Some(value))
  }

  /// Consume and classify exactly one token.
  pub fn scan_token(&mut self) -> Token {
    self.skip_whitespace();

    let start = self.pos;
    let loc = self.pos_to_loc(start);

    match self.ch {
      Some(ch) if is_letter(ch) => {
        self.scan_ident();
        let len = self.pos - start;
        let text = &self.input[start as usize..self.pos as usize];
        // An exact keyword match overrides the identifier classification.
        let kind = std::str::from_utf8(text)
          .ok()
          .and_then(|ident| self.keywords.get(ident).copied())
          .unwrap_or(TokenKind::Ident);
        Token::new(kind, loc, len, None)
      }
      Some('"') => {
        self.scan_string();
        Token::new(TokenKind::String, loc, self.pos - start, None)
      }
      Some(ch) if ch.is_ascii_digit() => self.constant_token(start, loc),
      Some('-') if self.peek_ch().is_some_and(|ch| ch.is_ascii_digit()) => {
        self.constant_token(start, loc)
      }
      other => {
        let kind = match other {
          None => TokenKind::Eof,
          Some('(') => TokenKind::OpenParen,
          Some(')') => TokenKind::CloseParen,
          Some('=') => TokenKind::Equal,
          Some(';') => TokenKind::Semicolon,
          Some('+') => TokenKind::Plus,
          Some('-') => TokenKind::Minus,
          Some('*') => TokenKind::Star,
          Some('/') => TokenKind::Slash,
          Some(_) => TokenKind::Invalid,
        };
        // Substituted replacement characters and misplaced byte-order marks
        // were already reported when the code point was decoded.
        let already_reported = self.ch_substituted || other == Some('\u{feff}');
        if kind == TokenKind::Invalid && !already_reported {
          let msg = format!("unrecognized character '{}'", other.unwrap_or('\0'));
          self.error(&msg);
        }
        self.read_ch();
        Token::new(kind, loc, self.pos - start, None)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::rc::Rc;

  fn lex_all(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::with_callback(input.as_bytes(), "test.fnc", None);
    let mut tokens = Vec::new();
    loop {
      let token = lexer.scan_token();
      let done = token.kind == TokenKind::Eof;
      tokens.push(token);
      if done {
        break;
      }
    }
    tokens
  }

  fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
    tokens.iter().map(|token| token.kind).collect()
  }

  #[test]
  fn single_function_token_sequence() {
    let source = "fn main() = 42;";
    let tokens = lex_all(source);
    assert_eq!(
      kinds(&tokens),
      vec![
        TokenKind::Fn,
        TokenKind::Ident,
        TokenKind::OpenParen,
        TokenKind::CloseParen,
        TokenKind::Equal,
        TokenKind::Constant,
        TokenKind::Semicolon,
        TokenKind::Eof,
      ]
    );
    assert_eq!(token_text(&tokens[1], source.as_bytes()), "main");
    assert_eq!(tokens[5].value, Some(42));
  }

  #[test]
  fn negative_constant_literal() {
    let source = "-324;";
    let tokens = lex_all(source);
    assert_eq!(tokens[0].kind, TokenKind::Constant);
    assert_eq!(tokens[0].value, Some(-324));
    assert_eq!(token_text(&tokens[0], source.as_bytes()), "-324");
    assert_eq!(tokens[1].kind, TokenKind::Semicolon);
  }

  #[test]
  fn minus_not_followed_by_digit_is_punctuation() {
    let tokens = lex_all("1 - 2");
    assert_eq!(
      kinds(&tokens),
      vec![
        TokenKind::Constant,
        TokenKind::Minus,
        TokenKind::Constant,
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn keyword_overrides_identifier() {
    assert_eq!(lex_all("fn")[0].kind, TokenKind::Fn);
    assert_eq!(lex_all("fnx")[0].kind, TokenKind::Ident);
  }

  #[test]
  fn string_literal_span_includes_quotes() {
    let source = "\"hello\"";
    let tokens = lex_all(source);
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(token_text(&tokens[0], source.as_bytes()), "\"hello\"");
  }

  #[test]
  fn unrecognized_character_is_reported_but_not_fatal() {
    let source = "fn @ main";
    let mut lexer = Lexer::with_callback(source.as_bytes(), "test.fnc", None);
    assert_eq!(lexer.scan_token().kind, TokenKind::Fn);
    assert_eq!(lexer.scan_token().kind, TokenKind::Invalid);
    assert_eq!(lexer.scan_token().kind, TokenKind::Ident);
    assert_eq!(lexer.scan_token().kind, TokenKind::Eof);
    assert_eq!(lexer.errors(), 1);
  }

  #[test]
  fn null_callback_still_counts_errors() {
    let mut lexer = Lexer::with_callback("@".as_bytes(), "test.fnc", None);
    lexer.scan_token();
    assert_eq!(lexer.errors(), 1);
  }

  #[test]
  fn error_callback_receives_location_and_message() {
    let messages = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&messages);
    let mut lexer = Lexer::with_callback(
      "@".as_bytes(),
      "test.fnc",
      Some(Box::new(move |file, loc, msg| {
        sink
          .borrow_mut()
          .push(format!("{file}[{}:{}] {msg}", loc.line, loc.column));
      })),
    );
    lexer.scan_token();
    assert_eq!(
      messages.borrow().as_slice(),
      ["test.fnc[1:1] unrecognized character '@'"]
    );
  }

  #[test]
  fn leading_bom_is_skipped_silently() {
    let source = "\u{feff}fn";
    let mut lexer = Lexer::with_callback(source.as_bytes(), "test.fnc", None);
    assert_eq!(lexer.scan_token().kind, TokenKind::Fn);
    assert_eq!(lexer.errors(), 0);
  }

  #[test]
  fn late_bom_is_an_error() {
    let source = "f\u{feff}n";
    let mut lexer = Lexer::with_callback(source.as_bytes(), "test.fnc", None);
    lexer.scan_token();
    while lexer.scan_token().kind != TokenKind::Eof {}
    assert_eq!(lexer.errors(), 1);
  }

  #[test]
  fn malformed_utf8_is_reported_and_skipped() {
    let source = b"fn \xff main";
    let mut lexer = Lexer::with_callback(source, "test.fnc", None);
    assert_eq!(lexer.scan_token().kind, TokenKind::Fn);
    assert_eq!(lexer.scan_token().kind, TokenKind::Invalid);
    assert_eq!(lexer.scan_token().kind, TokenKind::Ident);
    assert_eq!(lexer.errors(), 1);
  }

  #[test]
  fn malformed_multi_byte_sequence_is_one_error() {
    // Invalid lead byte followed by two continuation bytes: one unit.
    let source = b"fn \xff\x80\x80 main";
    let mut lexer = Lexer::with_callback(source, "test.fnc", None);
    assert_eq!(lexer.scan_token().kind, TokenKind::Fn);
    assert_eq!(lexer.scan_token().kind, TokenKind::Invalid);
    assert_eq!(lexer.scan_token().kind, TokenKind::Ident);
    assert_eq!(lexer.scan_token().kind, TokenKind::Eof);
    assert_eq!(lexer.errors(), 1);
  }

  #[test]
  fn truncated_sequence_at_end_of_input_is_one_error() {
    // A three-byte lead with only one continuation byte before EOF.
    let source = b"fn \xe2\x82";
    let mut lexer = Lexer::with_callback(source, "test.fnc", None);
    assert_eq!(lexer.scan_token().kind, TokenKind::Fn);
    assert_eq!(lexer.scan_token().kind, TokenKind::Invalid);
    assert_eq!(lexer.scan_token().kind, TokenKind::Eof);
    assert_eq!(lexer.errors(), 1);
  }

  #[test]
  fn literal_replacement_character_is_reported() {
    // U+FFFD appearing verbatim in well-formed input is unrecognized, not a
    // decoder substitution.
    let source = "fn \u{fffd} main";
    let mut lexer = Lexer::with_callback(source.as_bytes(), "test.fnc", None);
    assert_eq!(lexer.scan_token().kind, TokenKind::Fn);
    assert_eq!(lexer.scan_token().kind, TokenKind::Invalid);
    assert_eq!(lexer.scan_token().kind, TokenKind::Ident);
    assert_eq!(lexer.errors(), 1);
  }

  #[test]
  fn line_and_column_tracking() {
    let source = "fn\nmain";
    let mut lexer = Lexer::with_callback(source.as_bytes(), "test.fnc", None);
    let first = lexer.scan_token();
    assert_eq!((first.loc.line, first.loc.column), (1, 1));
    let second = lexer.scan_token();
    assert_eq!((second.loc.line, second.loc.column), (2, 1));
  }
}
