use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, trace};

use crate::aggregate::{self, Shell, Slot};
use crate::ast::{CreateTable, Delete, Expr, Ident, Insert, Select, Statement, Update};
use crate::column::Column;
use crate::environment::{Environment, QueryResult};
use crate::error::{EvalError, EvalErrorKind, panic_message};
use crate::ops;
use crate::position::Position;
use crate::table::{Row, Table};
use crate::token::Kind;
use crate::value::Value;

/// Column name reported for projections that are not a plain identifier.
const ANONYMOUS_COLUMN: &str = "?";

/// Resolves identifiers while an expression is evaluated.
pub trait Namespace {
    fn lookup(&self, ident: &Ident) -> Result<Option<Value>, EvalError>;
}

/// Namespace with no columns, used for INSERT values, defaults and the
/// final pass of an aggregate SELECT.
pub struct EmptyNamespace;

impl Namespace for EmptyNamespace {
    fn lookup(&self, ident: &Ident) -> Result<Option<Value>, EvalError> {
        Err(EvalError::new(
            ident.pos,
            EvalErrorKind::UnknownColumn(ident.name.clone()),
        ))
    }
}

/// Namespace exposing the columns of one row of a table.
pub struct CurrentRow<'a> {
    pub table: &'a Table,
    pub row: &'a Row,
}

impl Namespace for CurrentRow<'_> {
    fn lookup(&self, ident: &Ident) -> Result<Option<Value>, EvalError> {
        let idx = self.table.col_index(&ident.name).ok_or_else(|| {
            EvalError::new(ident.pos, EvalErrorKind::UnknownColumn(ident.name.clone()))
        })?;
        Ok(self.row[idx].clone())
    }
}

/// Evaluates one statement against the environment.
///
/// SELECT returns its result table; every other statement returns `None`.
/// A failure leaves the environment as it was before the statement, and any
/// panic raised while evaluating is reported as an internal error.
///
/// # Example
/// ```
/// use toysql::{Environment, eval::eval_stmt, lexer::Lexer, parser};
/// let mut env = Environment::new();
/// for stmt in parser::parse(Lexer::new("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1)")).unwrap() {
///     assert!(eval_stmt(&mut env, &stmt).unwrap().is_none());
/// }
/// assert_eq!(env.table("t").unwrap().rows.len(), 1);
/// ```
pub fn eval_stmt(env: &mut Environment, stmt: &Statement) -> Result<Option<QueryResult>, EvalError> {
    let pos = stmt.pos();
    panic::catch_unwind(AssertUnwindSafe(|| dispatch(env, stmt))).unwrap_or_else(|payload| {
        Err(EvalError::new(
            pos,
            EvalErrorKind::Internal(panic_message(payload.as_ref())),
        ))
    })
}

fn dispatch(env: &mut Environment, stmt: &Statement) -> Result<Option<QueryResult>, EvalError> {
    match stmt {
        Statement::CreateTable(create) => create_table(env, create).map(|()| None),
        Statement::Select(select) => self::select(env, select).map(Some),
        Statement::Insert(insert) => self::insert(env, insert).map(|()| None),
        Statement::Update(update) => self::update(env, update).map(|()| None),
        Statement::Delete(delete) => self::delete(env, delete).map(|()| None),
    }
}

fn lookup_table<'a>(env: &'a Environment, name: &Ident) -> Result<&'a Table, EvalError> {
    env.table(&name.name)
        .ok_or_else(|| EvalError::new(name.pos, EvalErrorKind::UnknownTable(name.name.clone())))
}

fn lookup_table_mut<'a>(env: &'a mut Environment, name: &Ident) -> Result<&'a mut Table, EvalError> {
    env.table_mut(&name.name)
        .ok_or_else(|| EvalError::new(name.pos, EvalErrorKind::UnknownTable(name.name.clone())))
}

fn create_table(env: &mut Environment, create: &CreateTable) -> Result<(), EvalError> {
    if env.table(&create.name.name).is_some() {
        return Err(EvalError::new(
            create.name.pos,
            EvalErrorKind::DuplicateTable(create.name.name.clone()),
        ));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(create.columns.len());
    for def in &create.columns {
        let name = &def.name;
        if columns.iter().any(|col| col.name == name.name) {
            return Err(EvalError::new(
                name.pos,
                EvalErrorKind::DuplicateColumn(name.name.clone()),
            ));
        }

        let default = match &def.default {
            Some(expr) => eval_expr(expr, &EmptyNamespace)?
                .map(|value| value.coerce(def.data_type))
                .transpose()
                .map_err(|err| EvalError::new(expr.pos(), err))?,
            None => None,
        };

        let mut column = Column::new(name.name.clone(), def.data_type).with_default(default);
        if !def.nullable {
            column = column.not_null();
        }
        if def.auto_increment {
            column = column
                .with_auto_increment()
                .map_err(|err| EvalError::new(name.pos, err))?;
        }
        columns.push(column);
    }

    debug!(table = %create.name.name, columns = columns.len(), "created table");
    env.insert_table(Table::new(create.name.name.clone(), columns));
    Ok(())
}

/// Whether a row passes the WHERE clause. Null and false exclude the row.
fn matches(where_clause: Option<&Expr>, ns: &dyn Namespace) -> Result<bool, EvalError> {
    let Some(cond) = where_clause else {
        return Ok(true);
    };
    let keep = match eval_expr(cond, ns)? {
        Some(value) => value
            .to_boolean()
            .map_err(|err| EvalError::new(cond.pos(), err))?,
        None => false,
    };
    trace!(keep, "evaluated WHERE");
    Ok(keep)
}

fn table_name(select: &Select) -> Result<&Ident, EvalError> {
    match &select.table {
        Expr::Ident(ident) => Ok(ident),
        other => Err(EvalError::new(
            other.pos(),
            EvalErrorKind::TableSubexpression,
        )),
    }
}

/// Replaces every `*` projection with one identifier per table column, in
/// schema order, positioned at the star.
fn expand_projections<'a>(table: &Table, projections: &'a [Expr]) -> Vec<Cow<'a, Expr>> {
    let mut expanded = Vec::with_capacity(projections.len());
    for projection in projections {
        match projection {
            Expr::SelectStar(pos) => expanded.extend(
                table
                    .column_names()
                    .into_iter()
                    .map(|name| Cow::Owned(Expr::Ident(Ident::new(*pos, name)))),
            ),
            expr => expanded.push(Cow::Borrowed(expr)),
        }
    }
    expanded
}

fn select(env: &Environment, select: &Select) -> Result<QueryResult, EvalError> {
    let table = lookup_table(env, table_name(select)?)?;
    let projections = expand_projections(table, &select.projections);

    if projections.iter().any(|expr| aggregate::contains_aggregate(expr)) {
        return select_aggregate(table, select, &projections);
    }

    let columns = projections
        .iter()
        .map(|projection| match projection.as_ref() {
            Expr::Ident(ident) => ident.name.clone(),
            _ => ANONYMOUS_COLUMN.to_string(),
        })
        .collect();

    let mask = table.selection(|row| matches(select.where_clause.as_ref(), &CurrentRow { table, row }))?;

    let mut rows = Vec::with_capacity(mask.count_ones());
    for idx in mask.iter_ones() {
        let ns = CurrentRow {
            table,
            row: &table.rows[idx],
        };
        let row = projections
            .iter()
            .map(|expr| eval_expr(expr, &ns))
            .collect::<Result<Row, _>>()?;
        rows.push(row);
    }

    debug!(table = %table.name, rows = rows.len(), "selected rows");
    Ok(QueryResult { columns, rows })
}

/// One ungrouped aggregate pass: validate, lift the aggregate calls, step
/// them over the matching rows, then evaluate the shells.
fn select_aggregate<'a>(
    table: &Table,
    select: &Select,
    projections: &'a [Cow<'a, Expr>],
) -> Result<QueryResult, EvalError> {
    let mut slots: Vec<Slot<'a>> = Vec::new();
    let mut shells = Vec::with_capacity(projections.len());
    for projection in projections {
        aggregate::validate(projection)?;
        shells.push(aggregate::rewrite(projection, &mut slots)?);
    }
    let columns = vec![ANONYMOUS_COLUMN.to_string(); shells.len()];

    for row in &table.rows {
        let ns = CurrentRow { table, row };
        if !matches(select.where_clause.as_ref(), &ns)? {
            continue;
        }
        for slot in &mut slots {
            let value = match slot.argument {
                Some(arg) => eval_expr(arg, &ns)?,
                None => None,
            };
            let pos = slot.argument.map_or(select.pos, Expr::pos);
            slot.accumulator
                .step(value)
                .map_err(|err| EvalError::new(pos, err))?;
        }
    }

    if table.rows.is_empty() {
        return Ok(QueryResult {
            columns,
            rows: vec![],
        });
    }

    let finals: Vec<Option<Value>> = slots.iter().map(|slot| slot.accumulator.finalize()).collect();
    let row = shells
        .iter()
        .map(|shell| eval_shell(shell, &finals))
        .collect::<Result<Row, _>>()?;

    debug!(table = %table.name, slots = slots.len(), "aggregated rows");
    Ok(QueryResult {
        columns,
        rows: vec![row],
    })
}

fn eval_shell(shell: &Shell<'_>, finals: &[Option<Value>]) -> Result<Option<Value>, EvalError> {
    match shell {
        Shell::Slot(idx) => Ok(finals[*idx].clone()),
        Shell::Binary { op, pos, lhs, rhs } => {
            let lhs = eval_shell(lhs, finals)?;
            let rhs = eval_shell(rhs, finals)?;
            apply_binary(*op, *pos, lhs, rhs)
        }
        Shell::Unary { op, pos, operand } => {
            let operand = eval_shell(operand, finals)?;
            ops::unary(*op, operand).map_err(|err| EvalError::new(*pos, err))
        }
        Shell::Leaf(expr) => eval_expr(expr, &EmptyNamespace),
    }
}

fn insert(env: &mut Environment, insert: &Insert) -> Result<(), EvalError> {
    let table = lookup_table_mut(env, &insert.table)?;
    let at_stmt = |kind: EvalErrorKind| EvalError::new(insert.pos, kind);

    let names: Vec<&str> = insert.columns.iter().map(|col| col.name.as_str()).collect();
    let targets = table.resolve_targets(&names).map_err(at_stmt)?;
    if insert.values.len() != targets.len() {
        return Err(at_stmt(EvalErrorKind::InsertArity {
            values: insert.values.len(),
            targets: targets.len(),
        }));
    }

    let values = insert
        .values
        .iter()
        .map(|expr| eval_expr(expr, &EmptyNamespace))
        .collect::<Result<Vec<_>, _>>()?;

    table.insert(&targets, values).map_err(at_stmt)?;
    debug!(table = %table.name, rows = table.rows.len(), "inserted row");
    Ok(())
}

fn update(env: &mut Environment, update: &Update) -> Result<(), EvalError> {
    let table = lookup_table_mut(env, &update.table)?;

    let targets = update
        .assignments
        .iter()
        .map(|assignment| {
            let column = &assignment.column;
            table.col_index(&column.name).ok_or_else(|| {
                EvalError::new(
                    column.pos,
                    EvalErrorKind::UnknownTableColumn {
                        column: column.name.clone(),
                        table: table.name.clone(),
                    },
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // every right-hand side sees the row as it was before the statement
    let mut changes = Vec::new();
    {
        let table: &Table = table;
        let mask = table.selection(|row| {
            matches(update.where_clause.as_ref(), &CurrentRow { table, row })
        })?;
        for idx in mask.iter_ones() {
            let ns = CurrentRow {
                table,
                row: &table.rows[idx],
            };
            for (assignment, &col) in update.assignments.iter().zip(&targets) {
                let value = eval_expr(&assignment.value, &ns)?;
                let value = table.columns[col]
                    .coerce(value)
                    .map_err(|err| EvalError::new(assignment.value.pos(), err))?;
                changes.push((idx, col, value));
            }
        }
    }

    let updated = changes.len();
    for (idx, col, value) in changes {
        table.rows[idx][col] = value;
    }
    debug!(table = %table.name, values = updated, "updated rows");
    Ok(())
}

fn delete(env: &mut Environment, delete: &Delete) -> Result<(), EvalError> {
    let table = lookup_table_mut(env, &delete.table)?;

    let removed = match &delete.where_clause {
        None => {
            let removed = table.rows.len();
            table.rows.clear();
            removed
        }
        Some(cond) => {
            let mask = {
                let table: &Table = table;
                table.selection(|row| matches(Some(cond), &CurrentRow { table, row }))?
            };
            table.delete_selected(&mask)
        }
    };

    debug!(table = %table.name, removed, "deleted rows");
    Ok(())
}

/// Evaluates an expression, resolving identifiers through `ns`.
///
/// # Errors
/// Type errors, unknown columns and arithmetic faults, positioned at the
/// offending subexpression.
pub fn eval_expr(expr: &Expr, ns: &dyn Namespace) -> Result<Option<Value>, EvalError> {
    match expr {
        Expr::Ident(ident) => ns.lookup(ident),
        Expr::IntegerLiteral { value, .. } => Ok(Some(Value::Integer(*value))),
        Expr::NumberLiteral { value, .. } => Ok(Some(Value::Number(*value))),
        Expr::StringLiteral { value, .. } => Ok(Some(Value::String(value.as_str().into()))),
        Expr::BooleanLiteral { value, .. } => Ok(Some(Value::Boolean(*value))),
        Expr::Null(_) => Ok(None),
        Expr::SelectStar(pos) => Err(EvalError::new(*pos, EvalErrorKind::MisplacedStar)),
        Expr::FunctionCall { name, .. } => Err(EvalError::new(
            name.pos,
            EvalErrorKind::ScalarFunction(name.name.clone()),
        )),
        Expr::Unary { pos, op, operand } => {
            let operand = eval_expr(operand, ns)?;
            ops::unary(*op, operand).map_err(|err| EvalError::new(*pos, err))
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval_expr(lhs, ns)?;
            let r = eval_expr(rhs, ns)?;
            apply_binary(*op, expr.pos(), l, r)
        }
    }
}

/// Applies a binary operator to evaluated operands, positioning any error at
/// `pos`.
fn apply_binary(
    op: Kind,
    pos: Position,
    lhs: Option<Value>,
    rhs: Option<Value>,
) -> Result<Option<Value>, EvalError> {
    let (lhs, rhs) = (lhs.as_ref(), rhs.as_ref());
    let result = match op {
        Kind::And | Kind::Or => ops::logical(op, lhs, rhs).map(|b| Some(Value::Boolean(b))),
        Kind::Concat => ops::concat(lhs, rhs),
        op if ops::is_comparison(op) => ops::compare(op, lhs, rhs).map(|b| Some(Value::Boolean(b))),
        op if ops::is_arithmetic(op) => ops::arithmetic(op, lhs, rhs),
        op => Err(EvalErrorKind::Internal(format!("{op} is not a binary operator"))),
    };
    result.map_err(|err| EvalError::new(pos, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::error::{CastError, Error};
    use crate::lexer::Lexer;
    use crate::parser;

    fn statements(sql: &str) -> Vec<Statement> {
        parser::parse(Lexer::new(sql)).unwrap()
    }

    /// Runs every statement, returning the outcome of the last one.
    fn run(env: &mut Environment, sql: &str) -> Result<Option<QueryResult>, EvalError> {
        let mut last = Ok(None);
        for stmt in statements(sql) {
            last = eval_stmt(env, &stmt);
        }
        last
    }

    fn query(env: &mut Environment, sql: &str) -> QueryResult {
        run(env, sql).unwrap().unwrap()
    }

    fn eval_const(sql: &str) -> Result<Option<Value>, EvalError> {
        let stmts = statements(&format!("SELECT {sql} FROM t"));
        let Statement::Select(select) = &stmts[0] else {
            panic!("Expected Select");
        };
        eval_expr(&select.projections[0], &EmptyNamespace)
    }

    fn seeded() -> Environment {
        let mut env = Environment::new();
        run(
            &mut env,
            "CREATE TABLE t (a INTEGER, b VARCHAR, c NUMBER);
             INSERT INTO t VALUES (1, 'x', 1.5);
             INSERT INTO t VALUES (2, 'y', NULL);
             INSERT INTO t VALUES (3, NULL, 0.5);",
        )
        .unwrap();
        env
    }

    fn int(i: i64) -> Option<Value> {
        Some(Value::Integer(i))
    }

    fn text(s: &str) -> Option<Value> {
        Some(Value::String(s.into()))
    }

    #[test]
    fn test_literals_and_operators() {
        assert_eq!(eval_const("1 + 2 * 3"), Ok(int(7)));
        assert_eq!(eval_const("-2 * 3"), Ok(int(-6)));
        assert_eq!(eval_const("'a' || 1 || 'b'"), Ok(text("a1b")));
        assert_eq!(eval_const("NULL + 1"), Ok(None));
        assert_eq!(eval_const("1 < 2 AND 'a' = 'a'"), Ok(Some(Value::Boolean(true))));
        assert_eq!(eval_const("NULL = NULL"), Ok(Some(Value::Boolean(false))));
    }

    #[test]
    fn test_or_truth_table() {
        for (sql, expected) in [
            ("1 = 1 OR 1 = 1", true),
            ("1 = 1 OR 1 = 2", true),
            ("1 = 2 OR 1 = 1", true),
            ("1 = 2 OR 1 = 2", false),
        ] {
            assert_eq!(eval_const(sql), Ok(Some(Value::Boolean(expected))), "{sql}");
        }
    }

    #[test]
    fn test_divide_by_zero_at_left_operand() {
        let err = eval_const("1/0").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivideByZero);
        assert_eq!(err.pos, Position::new(1, 7));
    }

    #[test]
    fn test_empty_namespace_rejects_columns() {
        let err = eval_const("a + 1").unwrap_err();
        assert_eq!(err.to_string(), "eval:1:7: column \"a\" does not exist");
    }

    #[test]
    fn test_misplaced_star_and_scalar_functions() {
        let mut env = seeded();
        let err = run(&mut env, "SELECT SUM(*) FROM t").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::MisplacedStar);
        assert_eq!(err.pos, Position::new(1, 11));
        let err = run(&mut env, "SELECT upper(b) FROM t").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ScalarFunction("upper".into()));
    }

    #[test]
    fn test_create_table_errors() {
        let mut env = seeded();
        let err = run(&mut env, "CREATE TABLE t (a INTEGER)").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DuplicateTable("t".into()));
        assert_eq!(err.pos, Position::new(1, 13));

        let err = run(&mut env, "CREATE TABLE u (a INTEGER, a VARCHAR)").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DuplicateColumn("a".into()));
        assert_eq!(err.pos, Position::new(1, 27));
        assert!(env.table("u").is_none());

        let err = run(&mut env, "CREATE TABLE u (a VARCHAR AUTOINCREMENT)").unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::InvalidAutoIncrement { .. }));

        let err = run(&mut env, "CREATE TABLE u (a BOOLEAN DEFAULT 1)").unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::Cast(CastError::Unsupported { .. })));
    }

    #[test]
    fn test_select_star_and_projection_names() {
        let mut env = seeded();
        let result = query(&mut env, "SELECT *, a + 1 FROM t WHERE a >= 2");
        assert_eq!(result.columns, vec!["a", "b", "c", "?"]);
        assert_eq!(
            result.rows,
            vec![
                vec![int(2), text("y"), None, int(3)],
                vec![int(3), None, Some(Value::Number(0.5)), int(4)],
            ]
        );
    }

    #[test]
    fn test_where_null_excludes_and_non_boolean_fails() {
        let mut env = seeded();
        let result = query(&mut env, "SELECT a FROM t WHERE b = 'x' OR c > 1");
        assert_eq!(result.rows, vec![vec![int(1)]]);

        let result = query(&mut env, "SELECT a FROM t WHERE NULL");
        assert!(result.rows.is_empty());

        let err = run(&mut env, "SELECT a FROM t WHERE a").unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::Cast(CastError::Unsupported {
                from: DataType::Integer,
                to: DataType::Boolean
            })
        );
    }

    #[test]
    fn test_select_errors() {
        let mut env = seeded();
        let err = run(&mut env, "SELECT a FROM missing").unwrap_err();
        assert_eq!(err.to_string(), "eval:1:14: relation \"missing\" does not exist");

        let err = run(&mut env, "SELECT a FROM t + 1").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TableSubexpression);

        let err = run(&mut env, "SELECT d FROM t").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnknownColumn("d".into()));
    }

    #[test]
    fn test_aggregates() {
        let mut env = seeded();
        let result = query(&mut env, "SELECT COUNT(*), COUNT(b), SUM(a), MIN(c), MAX(a) * 10 FROM t");
        assert_eq!(result.columns, vec!["?"; 5]);
        assert_eq!(
            result.rows,
            vec![vec![int(3), int(2), int(6), Some(Value::Number(0.5)), int(30)]]
        );
    }

    #[test]
    fn test_aggregate_with_no_match() {
        let mut env = seeded();
        let result = query(&mut env, "SELECT COUNT(*), SUM(a) FROM t WHERE a > 10");
        assert_eq!(result.rows, vec![vec![int(0), None]]);

        run(&mut env, "CREATE TABLE empty (a INTEGER)").unwrap();
        let result = query(&mut env, "SELECT COUNT(*) FROM empty");
        assert_eq!(result.columns, vec!["?"]);
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_aggregate_errors() {
        let mut env = seeded();
        let err = run(&mut env, "SELECT a, COUNT(*) FROM t").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UngroupedColumn("a".into()));

        let err = run(&mut env, "SELECT SUM(b) FROM t").unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::InvalidAggregateInput { .. }));
        assert_eq!(err.pos, Position::new(1, 11));
    }

    #[test]
    fn test_star_expands_before_aggregate_check() {
        let mut env = seeded();
        let err = run(&mut env, "SELECT *, COUNT(*) FROM t").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UngroupedColumn("a".into()));
        assert_eq!(err.pos, Position::new(1, 7));

        // validation does not depend on there being rows
        run(&mut env, "CREATE TABLE e (a INTEGER, b VARCHAR, c NUMBER)").unwrap();
        let err = run(&mut env, "SELECT COUNT(*), * FROM e").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UngroupedColumn("a".into()));
        assert_eq!(err.pos, Position::new(1, 17));
    }

    #[test]
    fn test_insert_arity_and_not_null() {
        let mut env = Environment::new();
        run(&mut env, "CREATE TABLE t (a INTEGER NOT NULL, b VARCHAR)").unwrap();

        let err = run(&mut env, "INSERT INTO t VALUES (1)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "eval:1:0: INSERT has 1 expressions but 2 target columns"
        );

        let err = run(&mut env, "INSERT INTO t (a) VALUES (NULL)").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NotNullViolation("a".into()));

        let err = run(&mut env, "INSERT INTO t (z) VALUES (1)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "eval:1:0: column \"z\" of relation \"t\" does not exist"
        );

        let err = run(&mut env, "INSERT INTO t (a, a) VALUES (1, 2)").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DuplicateColumn("a".into()));

        assert!(env.table("t").unwrap().rows.is_empty());
    }

    #[test]
    fn test_insert_coerces_and_fills() {
        let mut env = Environment::new();
        run(
            &mut env,
            "CREATE TABLE t (id INTEGER AUTOINCREMENT, n NUMBER DEFAULT 2, s VARCHAR);
             INSERT INTO t (s) VALUES (10);
             INSERT INTO t (n, s) VALUES ('1.5', 'z');",
        )
        .unwrap();
        let result = query(&mut env, "SELECT * FROM t");
        assert_eq!(
            result.rows,
            vec![
                vec![int(1), Some(Value::Number(2.0)), text("10")],
                vec![int(2), Some(Value::Number(1.5)), text("z")],
            ]
        );
    }

    #[test]
    fn test_update_uses_pre_update_values() {
        let mut env = seeded();
        run(&mut env, "UPDATE t SET a = a + 10, c = a WHERE a < 3").unwrap();
        let result = query(&mut env, "SELECT a, c FROM t");
        assert_eq!(
            result.rows,
            vec![
                vec![int(11), Some(Value::Number(1.0))],
                vec![int(12), Some(Value::Number(2.0))],
                vec![int(3), Some(Value::Number(0.5))],
            ]
        );
    }

    #[test]
    fn test_update_errors_leave_rows_untouched() {
        let mut env = seeded();
        let err = run(&mut env, "UPDATE t SET z = 1 WHERE a > 100").unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::UnknownTableColumn {
                column: "z".into(),
                table: "t".into()
            }
        );

        let err = run(&mut env, "UPDATE t SET a = 'x' || a").unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::Cast(_)));
        let result = query(&mut env, "SELECT a FROM t");
        assert_eq!(result.rows, vec![vec![int(1)], vec![int(2)], vec![int(3)]]);
    }

    #[test]
    fn test_delete() {
        let mut env = seeded();
        run(&mut env, "DELETE FROM t WHERE a = 2").unwrap();
        let result = query(&mut env, "SELECT a FROM t");
        assert_eq!(result.rows, vec![vec![int(1)], vec![int(3)]]);

        run(&mut env, "DELETE FROM t").unwrap();
        assert!(env.table("t").unwrap().rows.is_empty());
    }

    #[test]
    fn test_error_does_not_poison_environment() {
        let mut env = seeded();
        assert!(run(&mut env, "INSERT INTO t VALUES (1/0, 'q', 1)").is_err());
        let result = query(&mut env, "SELECT COUNT(*) FROM t");
        assert_eq!(result.rows, vec![vec![int(3)]]);
        assert!(matches!(
            env.execute("SELECT a FROM nope"),
            Err(Error::Eval(_))
        ));
    }
}
