//! Error types for every stage of the pipeline.
//!
//! Each stage reports a positioned error: [LexError] and [ParseError] abort a
//! whole batch, while an [EvalError] only fails the statement that raised it.

use std::any::Any;

use thiserror::Error;

use crate::data_type::DataType;
use crate::position::Position;
use crate::token::Kind;

/// Top-level error returned by the public entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("expected exactly one SELECT statement")]
    NotAQuery,

    /// A panic caught at a public boundary. Never produced by well-formed
    /// control flow.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error raised while turning characters into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("lexer:{pos}: {kind}")]
pub struct LexError {
    pub pos: Position,
    pub kind: LexErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    #[error("unexpected character: {0}")]
    UnexpectedChar(char),

    #[error("invalid numeric literal: {literal:?}: {reason}")]
    InvalidNumber { literal: String, reason: String },

    #[error("unterminated string")]
    UnterminatedString,
}

/// Error raised while building the AST from tokens.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse error at {pos}: {kind}")]
pub struct ParseError {
    pub pos: Position,
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// The current token is not one of the kinds the grammar allows here.
    #[error("current token is \"{found}\", want one of [{}]", kind_list(.expected))]
    Unexpected { found: Kind, expected: Vec<Kind> },

    #[error("integer literal out of range: {0}")]
    IntegerOutOfRange(String),

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

fn kind_list(kinds: &[Kind]) -> String {
    kinds
        .iter()
        .map(Kind::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Error raised while evaluating one statement.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("eval:{pos}: {kind}")]
pub struct EvalError {
    pub pos: Position,
    pub kind: EvalErrorKind,
}

impl EvalError {
    pub fn new(pos: Position, kind: impl Into<EvalErrorKind>) -> Self {
        Self {
            pos,
            kind: kind.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalErrorKind {
    // === Catalog ===
    #[error("relation \"{0}\" does not exist")]
    UnknownTable(String),

    #[error("relation \"{0}\" already exists")]
    DuplicateTable(String),

    #[error("column \"{0}\" specified more than once")]
    DuplicateColumn(String),

    #[error("column \"{0}\" does not exist")]
    UnknownColumn(String),

    #[error("column \"{column}\" of relation \"{table}\" does not exist")]
    UnknownTableColumn { column: String, table: String },

    #[error("AUTOINCREMENT requires an INTEGER column, but \"{column}\" is {data_type}")]
    InvalidAutoIncrement { column: String, data_type: DataType },

    #[error("table subexpressions not supported")]
    TableSubexpression,

    // === Constraints ===
    #[error("INSERT has {values} expressions but {targets} target columns")]
    InsertArity { values: usize, targets: usize },

    #[error("null value in column \"{0}\" violates not-null constraint")]
    NotNullViolation(String),

    // === Functions ===
    #[error("wrong number of arguments to {function}: got {got}, want {want}")]
    AggregateArity {
        function: String,
        got: usize,
        want: usize,
    },

    #[error("aggregate function calls cannot be nested")]
    NestedAggregate,

    #[error("column \"{0}\" must appear in the GROUP BY clause or be used in an aggregate function")]
    UngroupedColumn(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("non-aggregate functions are not implemented: {0}")]
    ScalarFunction(String),

    #[error("cannot compute {function} of {value}")]
    InvalidAggregateInput { function: String, value: String },

    #[error("\"*\" is only valid in a projection list or as the argument of COUNT")]
    MisplacedStar,

    // === Operators ===
    #[error("invalid comparison: {lhs} {op} {rhs}")]
    InvalidComparison { lhs: String, op: Kind, rhs: String },

    #[error("invalid arithmetic expression: {lhs} {op} {rhs}")]
    InvalidArithmetic { lhs: String, op: Kind, rhs: String },

    #[error("invalid value for unary {op}: {value}")]
    InvalidUnary { op: Kind, value: String },

    #[error("NULL is not a valid operand of {0}")]
    NullOperand(Kind),

    #[error("divide by zero")]
    DivideByZero,

    #[error("integer out of range")]
    IntegerOverflow,

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A failed conversion between value variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CastError {
    #[error("cannot convert {from} to {to}")]
    Unsupported { from: DataType, to: DataType },

    #[error("invalid {to} value: {text:?}")]
    Parse { text: String, to: DataType },
}

/// Extracts the message of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
