use std::fmt;

use crate::position::Position;

/// The closed set of lexical categories of the SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    // --- Special ---
    /// The kind of the current token once the input is exhausted.
    Eof,

    // --- Punctuation & Operators ---
    Comma,
    /// String concatenation `||`
    Concat,
    Div,
    Dot,
    Equal,
    GreaterThan,
    GreaterThanOrEqualTo,
    LeftParen,
    LessThan,
    LessThanOrEqualTo,
    Minus,
    /// Multiplication, or the `*` wildcard of a projection list.
    Mul,
    NotEqual,
    Plus,
    RightParen,
    Semicolon,

    // --- SQL Keywords ---
    And,
    AutoIncrement,
    Create,
    Default,
    Delete,
    False,
    From,
    Insert,
    Into,
    Not,
    Null,
    Or,
    Select,
    Set,
    Table,
    True,
    Update,
    Values,
    Where,

    // --- Data Types ---
    Boolean,
    Integer,
    Number,
    Timestamp,
    Varchar,

    // --- Identifiers & Literals ---
    /// A table, column or function name; the literal is lowercased.
    Ident,
    /// A numeric literal; the literal is the raw source text.
    NumberLiteral,
    /// A single-quoted string; the literal is the unescaped contents.
    StringLiteral,
}

impl Kind {
    /// Binding strength of a binary operator. Non-operators return 0, which
    /// is below the minimum precedence the expression parser accepts.
    pub fn precedence(self) -> u8 {
        match self {
            Kind::Or => 1,
            Kind::And => 2,
            Kind::Equal
            | Kind::NotEqual
            | Kind::LessThan
            | Kind::LessThanOrEqualTo
            | Kind::GreaterThan
            | Kind::GreaterThanOrEqualTo => 3,
            Kind::Plus | Kind::Minus | Kind::Concat => 4,
            Kind::Mul | Kind::Div => 5,
            _ => 0,
        }
    }

    /// Matches an already-lowercased word against the keyword table.
    pub fn keyword(word: &str) -> Option<Kind> {
        let kind = match word {
            "and" => Kind::And,
            "autoincrement" => Kind::AutoIncrement,
            "boolean" => Kind::Boolean,
            "create" => Kind::Create,
            "default" => Kind::Default,
            "delete" => Kind::Delete,
            "false" => Kind::False,
            "from" => Kind::From,
            "insert" => Kind::Insert,
            "integer" => Kind::Integer,
            "into" => Kind::Into,
            "not" => Kind::Not,
            "null" => Kind::Null,
            "number" => Kind::Number,
            "or" => Kind::Or,
            "select" => Kind::Select,
            "set" => Kind::Set,
            "table" => Kind::Table,
            "timestamp" => Kind::Timestamp,
            "true" => Kind::True,
            "update" => Kind::Update,
            "values" => Kind::Values,
            "varchar" => Kind::Varchar,
            "where" => Kind::Where,
            _ => return None,
        };
        Some(kind)
    }

    fn as_str(self) -> &'static str {
        match self {
            Kind::Eof => "EOF",
            Kind::Comma => ",",
            Kind::Concat => "||",
            Kind::Div => "/",
            Kind::Dot => ".",
            Kind::Equal => "=",
            Kind::GreaterThan => ">",
            Kind::GreaterThanOrEqualTo => ">=",
            Kind::LeftParen => "(",
            Kind::LessThan => "<",
            Kind::LessThanOrEqualTo => "<=",
            Kind::Minus => "-",
            Kind::Mul => "*",
            Kind::NotEqual => "!=",
            Kind::Plus => "+",
            Kind::RightParen => ")",
            Kind::Semicolon => ";",
            Kind::And => "AND",
            Kind::AutoIncrement => "AUTOINCREMENT",
            Kind::Create => "CREATE",
            Kind::Default => "DEFAULT",
            Kind::Delete => "DELETE",
            Kind::False => "FALSE",
            Kind::From => "FROM",
            Kind::Insert => "INSERT",
            Kind::Into => "INTO",
            Kind::Not => "NOT",
            Kind::Null => "NULL",
            Kind::Or => "OR",
            Kind::Select => "SELECT",
            Kind::Set => "SET",
            Kind::Table => "TABLE",
            Kind::True => "TRUE",
            Kind::Update => "UPDATE",
            Kind::Values => "VALUES",
            Kind::Where => "WHERE",
            Kind::Boolean => "BOOLEAN",
            Kind::Integer => "INTEGER",
            Kind::Number => "NUMBER",
            Kind::Timestamp => "TIMESTAMP",
            Kind::Varchar => "VARCHAR",
            Kind::Ident => "Ident",
            Kind::NumberLiteral => "NumberLiteral",
            Kind::StringLiteral => "StringLiteral",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lexeme: its kind, where it starts, and its literal text (empty for
/// punctuation and keywords).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: Kind,
    pub pos: Position,
    pub lit: String,
}

impl Token {
    pub fn new(kind: Kind, pos: Position) -> Self {
        Self {
            kind,
            pos,
            lit: String::new(),
        }
    }

    pub fn with_lit(kind: Kind, pos: Position, lit: impl Into<String>) -> Self {
        Self {
            kind,
            pos,
            lit: lit.into(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Ident => write!(f, "Ident({})", self.lit),
            Kind::NumberLiteral => write!(f, "NumberLiteral({})", self.lit),
            Kind::StringLiteral => write!(f, "StringLiteral({:?})", self.lit),
            kind => write!(f, "{kind}"),
        }
    }
}
