use tracing::trace;

use crate::error::{LexError, LexErrorKind};
use crate::position::Position;
use crate::token::{Kind, Token};

const SINGLE_QUOTE: char = '\'';

/// A lexical scanner that converts raw SQL text into positioned [Token]s.
///
/// The lexer holds one token of lookahead: [Lexer::scan] advances to the next
/// token and [Lexer::token] returns it. Errors are sticky; once [Lexer::err]
/// reports one, further scans do nothing and return `false`.
pub struct Lexer {
    /// The input stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current offset in the character vector.
    position: usize,
    /// Current line number, 1-based.
    line: usize,
    /// Offset in `input` of the first character of the current line.
    line_start: usize,
    /// The last scanned token.
    token: Token,
    err: Option<LexError>,
}

impl Lexer {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            line_start: 0,
            token: Token::new(Kind::Eof, Position::default()),
            err: None,
        }
    }

    /// Lexes the entire input, returning every token followed by a final
    /// [Kind::Eof] token.
    ///
    /// # Example
    /// ```
    /// # use toysql::lexer::Lexer;
    /// # use toysql::token::Kind;
    /// let tokens = Lexer::tokenize("SELECT *").unwrap();
    /// assert_eq!(tokens[0].kind, Kind::Select);
    /// assert_eq!(tokens[1].kind, Kind::Mul);
    /// assert_eq!(tokens[2].kind, Kind::Eof);
    /// ```
    pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Self::new(input);
        let mut tokens = Vec::new();
        while lexer.scan() {
            tokens.push(lexer.token().clone());
        }
        if let Some(err) = lexer.err() {
            return Err(err.clone());
        }
        tokens.push(lexer.token().clone());
        Ok(tokens)
    }

    /// Advances to the next token. Returns `false` when the input is exhausted
    /// or an error occurs; use [Lexer::err] to tell the two apart.
    pub fn scan(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        if !self.skip_whitespace() {
            self.token = Token::new(Kind::Eof, self.current_pos());
            return false;
        }
        match self.next_token() {
            Ok(token) => {
                trace!(token = %token, pos = %token.pos, "scanned token");
                self.token = token;
                true
            }
            Err(err) => {
                self.token = Token::new(Kind::Eof, err.pos);
                self.err = Some(err);
                false
            }
        }
    }

    /// Returns the last scanned token.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Returns the lexing error, if any.
    pub fn err(&self) -> Option<&LexError> {
        self.err.as_ref()
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token, LexError> {
        let ch = self.input[self.position];

        let token = match ch {
            ',' => self.punct(Kind::Comma, 1),
            '|' if self.peek_at(1) == Some('|') => self.punct(Kind::Concat, 2),
            '/' => self.punct(Kind::Div, 1),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                return self.read_number();
            }
            '.' => self.punct(Kind::Dot, 1),
            '=' => self.punct(Kind::Equal, 1),
            '>' if self.peek_at(1) == Some('=') => self.punct(Kind::GreaterThanOrEqualTo, 2),
            '>' => self.punct(Kind::GreaterThan, 1),
            '(' => self.punct(Kind::LeftParen, 1),
            '<' if self.peek_at(1) == Some('=') => self.punct(Kind::LessThanOrEqualTo, 2),
            '<' => self.punct(Kind::LessThan, 1),
            '-' => self.punct(Kind::Minus, 1),
            '*' => self.punct(Kind::Mul, 1),
            '!' if self.peek_at(1) == Some('=') => self.punct(Kind::NotEqual, 2),
            '+' => self.punct(Kind::Plus, 1),
            ')' => self.punct(Kind::RightParen, 1),
            ';' => self.punct(Kind::Semicolon, 1),
            SINGLE_QUOTE => return self.read_string(),
            c if c.is_ascii_digit() => return self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c => return Err(self.error(self.current_pos(), LexErrorKind::UnexpectedChar(c))),
        };
        Ok(token)
    }

    // --- Navigation Helpers ---

    /// Returns the character `offset` places after the current one, if any.
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn current_pos(&self) -> Position {
        Position::new(self.line, self.position - self.line_start)
    }

    /// Records that the line ending at offset `line_end` is finished.
    fn new_line(&mut self, line_end: usize) {
        self.line += 1;
        self.line_start = line_end + 1;
    }

    /// Consumes whitespace, counting `\n`, `\r\n` and a lone `\r` as one line
    /// break each. Returns `true` if any input remains.
    fn skip_whitespace(&mut self) -> bool {
        while let Some(ch) = self.peek_at(0) {
            match ch {
                '\n' => self.new_line(self.position),
                '\r' => {
                    if self.peek_at(1) == Some('\n') {
                        self.position += 1;
                    }
                    self.new_line(self.position);
                }
                c if c.is_whitespace() => {}
                _ => return true,
            }
            self.position += 1;
        }
        false
    }

    fn error(&self, pos: Position, kind: LexErrorKind) -> LexError {
        LexError { pos, kind }
    }

    // --- Extraction Logic ---

    /// Emits a punctuation token spanning `len` characters.
    fn punct(&mut self, kind: Kind, len: usize) -> Token {
        let token = Token::new(kind, self.current_pos());
        self.position += len;
        token
    }

    /// Reads a word and determines if it's a reserved SQL keyword or a
    /// user-defined identifier. Keywords are matched case-insensitively and
    /// identifiers are folded to lowercase.
    fn read_identifier(&mut self) -> Token {
        let pos = self.current_pos();
        let mut word = String::new();

        while let Some(c) = self.peek_at(0) {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            word.push(c);
            self.position += 1;
        }

        let word = word.to_lowercase();
        match Kind::keyword(&word) {
            Some(kind) => Token::new(kind, pos),
            None => Token::with_lit(Kind::Ident, pos, word),
        }
    }

    /// Reads a numeric literal. The scan is greedy over `[0-9.e]` and the
    /// floating-point parse is what decides whether the shape is valid; the
    /// parser later tells integers from numbers by the literal text.
    fn read_number(&mut self) -> Result<Token, LexError> {
        let pos = self.current_pos();
        let mut number = String::new();

        while let Some(c) = self.peek_at(0) {
            if !(c.is_ascii_digit() || c == '.' || c == 'e') {
                break;
            }
            number.push(c);
            self.position += 1;
        }

        if let Err(e) = number.parse::<f64>() {
            return Err(self.error(
                pos,
                LexErrorKind::InvalidNumber {
                    literal: number,
                    reason: e.to_string(),
                },
            ));
        }

        Ok(Token::with_lit(Kind::NumberLiteral, pos, number))
    }

    /// Reads a string literal enclosed in single quotes. A doubled quote is an
    /// escaped quote, and line breaks are allowed (`\r\n` is stored as `\n`).
    fn read_string(&mut self) -> Result<Token, LexError> {
        let pos = self.current_pos();
        self.position += 1; // Skip the opening quote

        let mut string = String::new();
        while let Some(c) = self.peek_at(0) {
            match c {
                SINGLE_QUOTE if self.peek_at(1) == Some(SINGLE_QUOTE) => {
                    string.push(SINGLE_QUOTE);
                    self.position += 2;
                    continue;
                }
                SINGLE_QUOTE => {
                    self.position += 1; // Skip the closing quote
                    return Ok(Token::with_lit(Kind::StringLiteral, pos, string));
                }
                '\r' if self.peek_at(1) == Some('\n') => {
                    string.push('\n');
                    self.position += 1;
                    self.new_line(self.position);
                }
                '\n' | '\r' => {
                    string.push(c);
                    self.new_line(self.position);
                }
                _ => string.push(c),
            }
            self.position += 1;
        }

        Err(self.error(pos, LexErrorKind::UnterminatedString))
    }
}
