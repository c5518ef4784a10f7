use std::fmt;

use crate::data_type::DataType;
use crate::position::Position;
use crate::token::Kind;

/// A name in the source: a table, a column or a function. Always lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub pos: Position,
    pub name: String,
}

impl Ident {
    pub fn new(pos: Position, name: impl Into<String>) -> Self {
        Self {
            pos,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    /// Position of the leading keyword.
    pub fn pos(&self) -> Position {
        match self {
            Statement::CreateTable(s) => s.pos,
            Statement::Select(s) => s.pos,
            Statement::Insert(s) => s.pos,
            Statement::Update(s) => s.pos,
            Statement::Delete(s) => s.pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub pos: Position,
    pub name: Ident,
    pub columns: Vec<ColumnDefinition>,
}

/// One column of a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: Ident,
    pub data_type: DataType,
    pub nullable: bool,
    /// Evaluated once, when the table is created.
    pub default: Option<Expr>,
    pub auto_increment: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub pos: Position,
    pub projections: Vec<Expr>,
    /// Parsed as an expression; only a bare identifier can be evaluated.
    pub table: Expr,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub pos: Position,
    pub table: Ident,
    /// Empty when the statement names no columns.
    pub columns: Vec<Ident>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub pos: Position,
    pub table: Ident,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expr>,
}

/// `column = value` inside `UPDATE ... SET`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub pos: Position,
    pub table: Ident,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Binary {
        op: Kind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        pos: Position,
        op: Kind,
        operand: Box<Expr>,
    },
    /// `*` in a projection list or as a function argument.
    SelectStar(Position),
    IntegerLiteral {
        pos: Position,
        value: i64,
    },
    NumberLiteral {
        pos: Position,
        value: f64,
    },
    StringLiteral {
        pos: Position,
        value: String,
    },
    BooleanLiteral {
        pos: Position,
        value: bool,
    },
    Null(Position),
    FunctionCall {
        name: Ident,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// A binary expression sits at its left operand, a call at its name.
    pub fn pos(&self) -> Position {
        match self {
            Expr::Ident(ident) => ident.pos,
            Expr::Binary { lhs, .. } => lhs.pos(),
            Expr::Unary { pos, .. }
            | Expr::IntegerLiteral { pos, .. }
            | Expr::NumberLiteral { pos, .. }
            | Expr::StringLiteral { pos, .. }
            | Expr::BooleanLiteral { pos, .. } => *pos,
            Expr::SelectStar(pos) | Expr::Null(pos) => *pos,
            Expr::FunctionCall { name, .. } => name.pos,
        }
    }

    pub fn binary(op: Kind, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

/// A borrowed view of any node of the tree, handed to [Visitor]s.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Statement(&'a Statement),
    Expr(&'a Expr),
    /// Names that are not expressions: tables, function names and
    /// assignment targets.
    Ident(&'a Ident),
    ColumnDefinition(&'a ColumnDefinition),
}

impl Node<'_> {
    pub fn pos(&self) -> Position {
        match self {
            Node::Statement(stmt) => stmt.pos(),
            Node::Expr(expr) => expr.pos(),
            Node::Ident(ident) => ident.pos,
            Node::ColumnDefinition(def) => def.name.pos,
        }
    }
}

/// One-line label of a node, without its children.
impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Statement(Statement::CreateTable(_)) => f.write_str("CreateTable"),
            Node::Statement(Statement::Select(_)) => f.write_str("Select"),
            Node::Statement(Statement::Insert(_)) => f.write_str("Insert"),
            Node::Statement(Statement::Update(_)) => f.write_str("Update"),
            Node::Statement(Statement::Delete(_)) => f.write_str("Delete"),
            Node::Ident(ident) => write!(f, "Ident({})", ident.name),
            Node::ColumnDefinition(def) => {
                write!(f, "ColumnDefinition({} {}", def.name.name, def.data_type)?;
                if !def.nullable {
                    f.write_str(" NOT NULL")?;
                }
                if def.default.is_some() {
                    f.write_str(" DEFAULT")?;
                }
                if def.auto_increment {
                    f.write_str(" AUTOINCREMENT")?;
                }
                f.write_str(")")
            }
            Node::Expr(expr) => match expr {
                Expr::Ident(ident) => write!(f, "Ident({})", ident.name),
                Expr::Binary { op, .. } => write!(f, "Binary({op})"),
                Expr::Unary { op, .. } => write!(f, "Unary({op})"),
                Expr::SelectStar(_) => f.write_str("SelectStar"),
                Expr::IntegerLiteral { value, .. } => write!(f, "IntegerLiteral({value})"),
                Expr::NumberLiteral { value, .. } => write!(f, "NumberLiteral({value})"),
                Expr::StringLiteral { value, .. } => write!(f, "StringLiteral({value:?})"),
                Expr::BooleanLiteral { value, .. } => write!(f, "BooleanLiteral({value})"),
                Expr::Null(_) => f.write_str("Null"),
                Expr::FunctionCall { .. } => f.write_str("FunctionCall"),
            },
        }
    }
}

/// Callbacks for a depth-first [walk].
pub trait Visitor<'a> {
    /// Called before a node's children. Returning `false` skips them.
    fn enter(&mut self, node: Node<'a>) -> bool;

    /// Called after a node's children, or right after [Visitor::enter] when
    /// they were skipped.
    fn leave(&mut self, _node: Node<'a>) {}
}

/// Visits `node` and its descendants in source order.
///
/// Children per node: CreateTable visits its table name then each column
/// definition; Select its projections, table and WHERE; Insert its table,
/// columns and values; Update its table, each target and value, and WHERE;
/// Delete its table and WHERE; a column definition its default. Within
/// expressions: Binary visits lhs then rhs, Unary its operand, and a function
/// call its name then its arguments.
pub fn walk<'a, V: Visitor<'a>>(node: Node<'a>, visitor: &mut V) {
    if visitor.enter(node) {
        match node {
            Node::Statement(stmt) => walk_statement(stmt, visitor),
            Node::Expr(expr) => walk_expr(expr, visitor),
            Node::ColumnDefinition(def) => {
                if let Some(default) = &def.default {
                    walk(Node::Expr(default), visitor);
                }
            }
            Node::Ident(_) => {}
        }
    }
    visitor.leave(node);
}

fn walk_statement<'a, V: Visitor<'a>>(stmt: &'a Statement, visitor: &mut V) {
    match stmt {
        Statement::CreateTable(create) => {
            walk(Node::Ident(&create.name), visitor);
            for def in &create.columns {
                walk(Node::ColumnDefinition(def), visitor);
            }
        }
        Statement::Select(select) => {
            for projection in &select.projections {
                walk(Node::Expr(projection), visitor);
            }
            walk(Node::Expr(&select.table), visitor);
            if let Some(cond) = &select.where_clause {
                walk(Node::Expr(cond), visitor);
            }
        }
        Statement::Insert(insert) => {
            walk(Node::Ident(&insert.table), visitor);
            for column in &insert.columns {
                walk(Node::Ident(column), visitor);
            }
            for value in &insert.values {
                walk(Node::Expr(value), visitor);
            }
        }
        Statement::Update(update) => {
            walk(Node::Ident(&update.table), visitor);
            for assignment in &update.assignments {
                walk(Node::Ident(&assignment.column), visitor);
                walk(Node::Expr(&assignment.value), visitor);
            }
            if let Some(cond) = &update.where_clause {
                walk(Node::Expr(cond), visitor);
            }
        }
        Statement::Delete(delete) => {
            walk(Node::Ident(&delete.table), visitor);
            if let Some(cond) = &delete.where_clause {
                walk(Node::Expr(cond), visitor);
            }
        }
    }
}

fn walk_expr<'a, V: Visitor<'a>>(expr: &'a Expr, visitor: &mut V) {
    match expr {
        Expr::Binary { lhs, rhs, .. } => {
            walk(Node::Expr(lhs), visitor);
            walk(Node::Expr(rhs), visitor);
        }
        Expr::Unary { operand, .. } => walk(Node::Expr(operand), visitor),
        Expr::FunctionCall { name, args } => {
            walk(Node::Ident(name), visitor);
            for arg in args {
                walk(Node::Expr(arg), visitor);
            }
        }
        Expr::Ident(_)
        | Expr::SelectStar(_)
        | Expr::IntegerLiteral { .. }
        | Expr::NumberLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::BooleanLiteral { .. }
        | Expr::Null(_) => {}
    }
}

struct Inspector<F>(F);

impl<'a, F: FnMut(Node<'a>) -> bool> Visitor<'a> for Inspector<F> {
    fn enter(&mut self, node: Node<'a>) -> bool {
        (self.0)(node)
    }
}

/// [walk] with a closure as the `enter` callback.
pub fn inspect<'a>(node: Node<'a>, f: impl FnMut(Node<'a>) -> bool) {
    walk(node, &mut Inspector(f));
}
