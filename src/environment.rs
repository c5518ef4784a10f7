use std::collections::HashMap;

use crate::ast::Statement;
use crate::error::{Error, EvalError};
use crate::eval::eval_stmt;
use crate::lexer::Lexer;
use crate::parser;
use crate::table::{Row, Table};

/// The in-memory store: every table created in a session, by name.
#[derive(Debug, Default)]
pub struct Environment {
    /// A map of table names to their respective [Table] structures.
    tables: HashMap<String, Table>,
}

/// Represents the result of a `SELECT` query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The names of the columns included in the result set.
    pub columns: Vec<String>,
    /// One entry per result row, aligned with `columns`.
    pub rows: Vec<Row>,
}

/// Outcome of one statement of a script: a result table for SELECT, `None`
/// for everything else.
pub type StatementOutcome = Result<Option<QueryResult>, EvalError>;

impl Environment {
    /// Creates a new, empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a reference to a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Retrieves a mutable reference to a table by name.
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Registers a table, replacing any table of the same name.
    pub(crate) fn insert_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Runs every statement of `sql`, stopping at the first failure.
    ///
    /// # Errors
    /// A lexing or parse error rejects the whole input before anything runs;
    /// an evaluation error stops the batch, keeping the effects of the
    /// statements that ran before it.
    ///
    /// # Example
    /// ```
    /// use toysql::{Environment, Value};
    /// let mut env = Environment::new();
    /// env.execute("CREATE TABLE users (id INTEGER); INSERT INTO users VALUES (1)").unwrap();
    ///
    /// let result = env.query("SELECT * FROM users").unwrap();
    /// assert_eq!(result.rows[0][0], Some(Value::Integer(1)));
    /// ```
    pub fn execute(&mut self, sql: &str) -> Result<Vec<Option<QueryResult>>, Error> {
        let statements = parser::parse(Lexer::new(sql))?;
        let mut results = Vec::with_capacity(statements.len());
        for stmt in &statements {
            results.push(eval_stmt(self, stmt)?);
        }
        Ok(results)
    }

    /// Runs a single `SELECT` and returns its rows.
    ///
    /// # Errors
    /// [Error::NotAQuery] unless `sql` holds exactly one SELECT statement.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult, Error> {
        let statements = parser::parse(Lexer::new(sql))?;
        let [stmt @ Statement::Select(_)] = statements.as_slice() else {
            return Err(Error::NotAQuery);
        };
        eval_stmt(self, stmt)?.ok_or(Error::NotAQuery)
    }

    /// Runs every statement of `sql` and reports each outcome. An evaluation
    /// error does not stop the statements after it.
    ///
    /// # Errors
    /// Only lexing and parse errors, which reject the whole input.
    pub fn run_script(&mut self, sql: &str) -> Result<Vec<StatementOutcome>, Error> {
        let statements = parser::parse(Lexer::new(sql))?;
        Ok(statements
            .iter()
            .map(|stmt| eval_stmt(self, stmt))
            .collect())
    }
}
