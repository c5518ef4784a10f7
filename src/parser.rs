use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::ast::*;
use crate::data_type::DataType;
use crate::error::{Error, ParseError, ParseErrorKind, panic_message};
use crate::lexer::Lexer;
use crate::position::Position;
use crate::token::{Kind, Token};

/// Lowest binding strength accepted by [Parser::parse_expression].
const LOWEST: u8 = 1;

/// Deepest expression tree the parser builds. Evaluation and printing
/// recurse over the tree, so the bound keeps them within the stack.
pub const MAX_DEPTH: usize = 256;

/// Kinds that can start a primary expression, reported when none is found.
const PRIMARY_START: [Kind; 9] = [
    Kind::LeftParen,
    Kind::Ident,
    Kind::Plus,
    Kind::Minus,
    Kind::NumberLiteral,
    Kind::StringLiteral,
    Kind::True,
    Kind::False,
    Kind::Null,
];

/// Parses a batch of statements.
///
/// # Errors
/// Returns the first lexing or parse error; the batch is rejected as a whole.
///
/// # Example
/// ```
/// use toysql::{lexer::Lexer, parser, ast::Statement};
/// let stmts = parser::parse(Lexer::new("SELECT a FROM t; DELETE FROM t")).unwrap();
/// assert!(matches!(stmts[0], Statement::Select(_)));
/// assert!(matches!(stmts[1], Statement::Delete(_)));
/// ```
pub fn parse(lexer: Lexer) -> Result<Vec<Statement>, Error> {
    panic::catch_unwind(AssertUnwindSafe(move || Parser::new(lexer).parse()))
        .unwrap_or_else(|payload| Err(Error::Internal(panic_message(payload.as_ref()))))
}

/// Recursive-descent parser over a [Lexer], with one token of lookahead.
pub struct Parser {
    lexer: Lexer,
    token: Token,
    depth: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            token: Token::new(Kind::Eof, Position::default()),
            depth: 0,
        }
    }

    /// Parses every `;`-separated statement up to the end of input.
    pub fn parse(&mut self) -> Result<Vec<Statement>, Error> {
        self.advance()?;
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);

            // the last semicolon is optional
            match self.current_kind() {
                Kind::Semicolon => self.advance()?,
                Kind::Eof => {}
                _ => return Err(self.unexpected(&[Kind::Semicolon])),
            }
        }
        debug!(statements = statements.len(), "parsed batch");
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement, Error> {
        match self.current_kind() {
            Kind::Create => self.parse_create_table(),
            Kind::Select => self.parse_select(),
            Kind::Insert => self.parse_insert(),
            Kind::Update => self.parse_update(),
            Kind::Delete => self.parse_delete(),
            _ => Err(self.unexpected(&[
                Kind::Create,
                Kind::Select,
                Kind::Insert,
                Kind::Update,
                Kind::Delete,
            ])),
        }
    }

    // helpers

    fn current_kind(&self) -> Kind {
        self.token.kind
    }

    fn is_at_end(&self) -> bool {
        self.current_kind() == Kind::Eof
    }

    /// Moves to the next token, surfacing any lexing error.
    fn advance(&mut self) -> Result<(), Error> {
        if !self.lexer.scan() {
            if let Some(err) = self.lexer.err() {
                return Err(err.clone().into());
            }
        }
        self.token = self.lexer.token().clone();
        Ok(())
    }

    /// Advances past the current token if it has the given kind.
    fn accept(&mut self, kind: Kind) -> Result<bool, Error> {
        if self.current_kind() == kind {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Takes the current token, which must have the given kind.
    fn consume(&mut self, kind: Kind) -> Result<Token, Error> {
        if self.current_kind() != kind {
            return Err(self.unexpected(&[kind]));
        }
        let token = self.token.clone();
        self.advance()?;
        Ok(token)
    }

    fn consume_ident(&mut self) -> Result<Ident, Error> {
        let token = self.consume(Kind::Ident)?;
        Ok(Ident::new(token.pos, token.lit))
    }

    /// Goes one level deeper into the expression tree at `pos`.
    fn descend(&mut self, pos: Position) -> Result<(), Error> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError {
                pos,
                kind: ParseErrorKind::TooDeep(MAX_DEPTH),
            }
            .into());
        }
        self.depth += 1;
        Ok(())
    }

    fn unexpected(&self, expected: &[Kind]) -> Error {
        ParseError {
            pos: self.token.pos,
            kind: ParseErrorKind::Unexpected {
                found: self.current_kind(),
                expected: expected.to_vec(),
            },
        }
        .into()
    }

    fn parse_where(&mut self) -> Result<Option<Expr>, Error> {
        if self.accept(Kind::Where)? {
            return Ok(Some(self.parse_expression(LOWEST)?));
        }
        Ok(None)
    }

    // statements

    fn parse_create_table(&mut self) -> Result<Statement, Error> {
        let pos = self.consume(Kind::Create)?.pos;
        self.consume(Kind::Table)?;
        let name = self.consume_ident()?;
        self.consume(Kind::LeftParen)?;
        let mut columns = vec![];
        loop {
            columns.push(self.parse_column_definition()?);
            match self.current_kind() {
                Kind::Comma => self.advance()?,
                Kind::RightParen => {
                    self.advance()?;
                    break;
                }
                _ => return Err(self.unexpected(&[Kind::Comma, Kind::RightParen])),
            }
        }
        Ok(Statement::CreateTable(CreateTable { pos, name, columns }))
    }

    fn parse_column_definition(&mut self) -> Result<ColumnDefinition, Error> {
        let name = self.consume_ident()?;
        let data_type = DataType::from_keyword(self.current_kind())
            .ok_or_else(|| self.unexpected(&DataType::KEYWORDS))?;
        self.advance()?;

        let mut nullable = true;
        if self.accept(Kind::Not)? {
            self.consume(Kind::Null)?;
            nullable = false;
        } else {
            self.accept(Kind::Null)?;
        }

        let mut default = None;
        let mut auto_increment = false;
        loop {
            match self.current_kind() {
                Kind::Default if default.is_none() => {
                    self.advance()?;
                    default = Some(self.parse_expression(LOWEST)?);
                }
                Kind::AutoIncrement if !auto_increment => {
                    self.advance()?;
                    auto_increment = true;
                }
                _ => break,
            }
        }

        Ok(ColumnDefinition {
            name,
            data_type,
            nullable,
            default,
            auto_increment,
        })
    }

    fn parse_select(&mut self) -> Result<Statement, Error> {
        let pos = self.consume(Kind::Select)?.pos;
        let projections = self.parse_projection_list()?;
        self.consume(Kind::From)?;
        let table = self.parse_expression(LOWEST)?;
        let where_clause = self.parse_where()?;
        Ok(Statement::Select(Select {
            pos,
            projections,
            table,
            where_clause,
        }))
    }

    /// `item [, item]*` where an item is `*` or an expression.
    fn parse_projection_list(&mut self) -> Result<Vec<Expr>, Error> {
        let mut items = vec![];
        loop {
            if self.current_kind() == Kind::Mul {
                items.push(Expr::SelectStar(self.token.pos));
                self.advance()?;
            } else {
                items.push(self.parse_expression(LOWEST)?);
            }
            if !self.accept(Kind::Comma)? {
                return Ok(items);
            }
        }
    }

    fn parse_expression_list(&mut self) -> Result<Vec<Expr>, Error> {
        let mut items = vec![self.parse_expression(LOWEST)?];
        while self.accept(Kind::Comma)? {
            items.push(self.parse_expression(LOWEST)?);
        }
        Ok(items)
    }

    fn parse_insert(&mut self) -> Result<Statement, Error> {
        let pos = self.consume(Kind::Insert)?.pos;
        self.consume(Kind::Into)?;
        let table = self.consume_ident()?;

        let mut columns = vec![];
        if self.accept(Kind::LeftParen)? {
            columns.push(self.consume_ident()?);
            while self.accept(Kind::Comma)? {
                columns.push(self.consume_ident()?);
            }
            self.consume(Kind::RightParen)?;
        }

        self.consume(Kind::Values)?;
        self.consume(Kind::LeftParen)?;
        let values = self.parse_expression_list()?;
        self.consume(Kind::RightParen)?;

        Ok(Statement::Insert(Insert {
            pos,
            table,
            columns,
            values,
        }))
    }

    fn parse_update(&mut self) -> Result<Statement, Error> {
        let pos = self.consume(Kind::Update)?.pos;
        let table = self.consume_ident()?;
        self.consume(Kind::Set)?;

        let parenthesized = self.accept(Kind::LeftParen)?;
        let mut assignments = vec![];
        loop {
            let column = self.consume_ident()?;
            self.consume(Kind::Equal)?;
            let value = self.parse_expression(LOWEST)?;
            assignments.push(Assignment { column, value });
            if !self.accept(Kind::Comma)? {
                break;
            }
        }
        if parenthesized {
            self.consume(Kind::RightParen)?;
        }

        let where_clause = self.parse_where()?;
        Ok(Statement::Update(Update {
            pos,
            table,
            assignments,
            where_clause,
        }))
    }

    fn parse_delete(&mut self) -> Result<Statement, Error> {
        let pos = self.consume(Kind::Delete)?.pos;
        self.consume(Kind::From)?;
        let table = self.consume_ident()?;
        let where_clause = self.parse_where()?;
        Ok(Statement::Delete(Delete {
            pos,
            table,
            where_clause,
        }))
    }

    // expressions

    /// Precedence climbing: binary operators binding at least as tightly as
    /// `min_precedence` are folded left-associatively onto the primary.
    fn parse_expression(&mut self, min_precedence: u8) -> Result<Expr, Error> {
        let mut lhs = self.parse_primary()?;
        let mut folded = 0;
        loop {
            let op = self.current_kind();
            let precedence = op.precedence();
            if precedence == 0 || precedence < min_precedence {
                self.depth -= folded;
                return Ok(lhs);
            }
            // each fold puts the tree built so far one level down
            self.descend(self.token.pos)?;
            folded += 1;
            self.advance()?;
            let rhs = self.parse_expression(precedence + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let pos = self.token.pos;
        let expr = match self.current_kind() {
            Kind::LeftParen => {
                self.descend(pos)?;
                self.advance()?;
                let expr = self.parse_expression(LOWEST)?;
                self.consume(Kind::RightParen)?;
                self.depth -= 1;
                return Ok(expr);
            }
            Kind::Ident => {
                let name = self.consume_ident()?;
                if !self.accept(Kind::LeftParen)? {
                    return Ok(Expr::Ident(name));
                }
                let args = if self.current_kind() == Kind::RightParen {
                    vec![]
                } else {
                    self.parse_projection_list()?
                };
                self.consume(Kind::RightParen)?;
                return Ok(Expr::FunctionCall { name, args });
            }
            // the sign takes a primary, not a whole expression: -1 + 2 is (-1) + 2
            op @ (Kind::Plus | Kind::Minus) => {
                self.descend(pos)?;
                self.advance()?;
                let operand = Box::new(self.parse_primary()?);
                self.depth -= 1;
                return Ok(Expr::Unary { pos, op, operand });
            }
            Kind::NumberLiteral => self.number_literal()?,
            Kind::StringLiteral => Expr::StringLiteral {
                pos,
                value: self.token.lit.clone(),
            },
            Kind::True => Expr::BooleanLiteral { pos, value: true },
            Kind::False => Expr::BooleanLiteral { pos, value: false },
            Kind::Null => Expr::Null(pos),
            _ => return Err(self.unexpected(&PRIMARY_START)),
        };
        self.advance()?;
        Ok(expr)
    }

    /// All-digit literals are integers; anything else the lexer accepted is
    /// floating point.
    fn number_literal(&self) -> Result<Expr, Error> {
        let Token { pos, lit, .. } = &self.token;
        if lit.bytes().all(|b| b.is_ascii_digit()) {
            let value = lit.parse().map_err(|_| ParseError {
                pos: *pos,
                kind: ParseErrorKind::IntegerOutOfRange(lit.clone()),
            })?;
            return Ok(Expr::IntegerLiteral { pos: *pos, value });
        }
        let value = lit
            .parse()
            .map_err(|_| Error::Internal(format!("unvalidated numeric literal {lit:?}")))?;
        Ok(Expr::NumberLiteral { pos: *pos, value })
    }
}
