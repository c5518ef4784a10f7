//! Ungrouped aggregation: `COUNT`, `MIN`, `MAX` and `SUM`.
//!
//! An aggregate projection is evaluated in two passes. [rewrite] turns it into
//! a [Shell] in which every aggregate call is replaced by an accumulator
//! slot; the evaluator steps every slot once per matching row, then evaluates
//! the shell against the finalized slot values. The AST is never modified.

use crate::ast::{Expr, Node, Visitor, inspect, walk};
use crate::error::{EvalError, EvalErrorKind};
use crate::position::Position;
use crate::token::Kind;
use crate::value::{Value, describe};

/// Names of the recognized aggregate functions.
pub const FUNCTIONS: [&str; 4] = ["count", "min", "max", "sum"];

pub fn is_aggregate(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

/// Whether the expression contains a call to a recognized aggregate.
pub fn contains_aggregate(expr: &Expr) -> bool {
    let mut found = false;
    inspect(Node::Expr(expr), |node| {
        if let Node::Expr(Expr::FunctionCall { name, .. }) = node {
            found |= is_aggregate(&name.name);
        }
        !found
    });
    found
}

/// Running state of one aggregate call.
pub trait Accumulator {
    /// Feeds the argument's value for one row.
    fn step(&mut self, value: Option<Value>) -> Result<(), EvalErrorKind>;

    /// The aggregate's result over every value stepped so far.
    fn finalize(&self) -> Option<Value>;
}

/// `COUNT(*)`: counts rows.
#[derive(Debug, Default)]
pub struct CountRows(i64);

impl Accumulator for CountRows {
    fn step(&mut self, _value: Option<Value>) -> Result<(), EvalErrorKind> {
        self.0 += 1;
        Ok(())
    }

    fn finalize(&self) -> Option<Value> {
        Some(Value::Integer(self.0))
    }
}

/// `COUNT(expr)`: counts non-null values.
#[derive(Debug, Default)]
pub struct Count(i64);

impl Accumulator for Count {
    fn step(&mut self, value: Option<Value>) -> Result<(), EvalErrorKind> {
        if value.is_some() {
            self.0 += 1;
        }
        Ok(())
    }

    fn finalize(&self) -> Option<Value> {
        Some(Value::Integer(self.0))
    }
}

/// Numeric accumulator state: integral until a floating value shows up.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Integer(i64),
    Number(f64),
}

impl Numeric {
    fn from_value(function: &str, value: &Value) -> Result<Self, EvalErrorKind> {
        match value {
            Value::Integer(i) => Ok(Numeric::Integer(*i)),
            Value::Number(n) => Ok(Numeric::Number(*n)),
            _ => Err(EvalErrorKind::InvalidAggregateInput {
                function: function.to_uppercase(),
                value: describe(Some(value)),
            }),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Numeric::Integer(i) => i as f64,
            Numeric::Number(n) => n,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Numeric::Integer(i) => Value::Integer(i),
            Numeric::Number(n) => Value::Number(n),
        }
    }
}

/// `MIN(expr)` / `MAX(expr)` over numbers.
#[derive(Debug)]
pub struct MinMax {
    function: &'static str,
    best: Option<Numeric>,
}

impl MinMax {
    pub fn min() -> Self {
        Self {
            function: "min",
            best: None,
        }
    }

    pub fn max() -> Self {
        Self {
            function: "max",
            best: None,
        }
    }

    fn prefers<T: PartialOrd>(&self, candidate: T, current: T) -> bool {
        if self.function == "min" {
            candidate < current
        } else {
            candidate > current
        }
    }
}

impl Accumulator for MinMax {
    fn step(&mut self, value: Option<Value>) -> Result<(), EvalErrorKind> {
        let Some(value) = value else {
            return Ok(());
        };
        let candidate = Numeric::from_value(self.function, &value)?;
        self.best = Some(match (self.best, candidate) {
            (None, candidate) => candidate,
            (Some(Numeric::Integer(cur)), Numeric::Integer(new)) => {
                Numeric::Integer(if self.prefers(new, cur) { new } else { cur })
            }
            // once a floating value is seen the running result is floating
            (Some(current), candidate) => {
                let (cur, new) = (current.as_f64(), candidate.as_f64());
                Numeric::Number(if self.prefers(new, cur) { new } else { cur })
            }
        });
        Ok(())
    }

    fn finalize(&self) -> Option<Value> {
        self.best.map(Numeric::into_value)
    }
}

/// `SUM(expr)` over numbers.
#[derive(Debug, Default)]
pub struct Sum(Option<Numeric>);

impl Accumulator for Sum {
    fn step(&mut self, value: Option<Value>) -> Result<(), EvalErrorKind> {
        let Some(value) = value else {
            return Ok(());
        };
        let addend = Numeric::from_value("sum", &value)?;
        self.0 = Some(match (self.0, addend) {
            (None, addend) => addend,
            (Some(Numeric::Integer(total)), Numeric::Integer(i)) => Numeric::Integer(
                total
                    .checked_add(i)
                    .ok_or(EvalErrorKind::IntegerOverflow)?,
            ),
            (Some(total), addend) => Numeric::Number(total.as_f64() + addend.as_f64()),
        });
        Ok(())
    }

    fn finalize(&self) -> Option<Value> {
        self.0.map(Numeric::into_value)
    }
}

/// An aggregate call lifted out of a projection.
pub struct Slot<'a> {
    /// The argument evaluated per row; `None` for `COUNT(*)`.
    pub argument: Option<&'a Expr>,
    pub accumulator: Box<dyn Accumulator>,
}

/// A projection with its aggregate calls replaced by slot references.
#[derive(Debug, Clone, PartialEq)]
pub enum Shell<'a> {
    Slot(usize),
    Binary {
        op: Kind,
        pos: Position,
        lhs: Box<Shell<'a>>,
        rhs: Box<Shell<'a>>,
    },
    Unary {
        op: Kind,
        pos: Position,
        operand: Box<Shell<'a>>,
    },
    /// A subtree without aggregate calls, evaluated once without row context.
    Leaf(&'a Expr),
}

/// Lifts every aggregate call of `expr` into `slots` and returns the shell
/// that refers to them.
///
/// # Errors
/// Unknown function names, and aggregate calls with other than one argument.
pub fn rewrite<'a>(expr: &'a Expr, slots: &mut Vec<Slot<'a>>) -> Result<Shell<'a>, EvalError> {
    match expr {
        Expr::FunctionCall { name, args } => {
            let accumulator: Box<dyn Accumulator> = match name.name.as_str() {
                "count" if matches!(args.as_slice(), [Expr::SelectStar(_)]) => {
                    Box::new(CountRows::default())
                }
                "count" => Box::new(Count::default()),
                "min" => Box::new(MinMax::min()),
                "max" => Box::new(MinMax::max()),
                "sum" => Box::new(Sum::default()),
                other => {
                    return Err(EvalError::new(
                        name.pos,
                        EvalErrorKind::UnknownFunction(other.to_string()),
                    ));
                }
            };
            let [arg] = args.as_slice() else {
                return Err(EvalError::new(
                    name.pos,
                    EvalErrorKind::AggregateArity {
                        function: name.name.to_uppercase(),
                        got: args.len(),
                        want: 1,
                    },
                ));
            };
            let argument = match arg {
                Expr::SelectStar(_) if name.name == "count" => None,
                arg => Some(arg),
            };
            slots.push(Slot {
                argument,
                accumulator,
            });
            Ok(Shell::Slot(slots.len() - 1))
        }
        Expr::Binary { op, lhs, rhs } => Ok(Shell::Binary {
            op: *op,
            pos: expr.pos(),
            lhs: Box::new(rewrite(lhs, slots)?),
            rhs: Box::new(rewrite(rhs, slots)?),
        }),
        Expr::Unary { pos, op, operand } => Ok(Shell::Unary {
            op: *op,
            pos: *pos,
            operand: Box::new(rewrite(operand, slots)?),
        }),
        _ => Ok(Shell::Leaf(expr)),
    }
}

/// Checks an aggregate projection: no aggregate call inside another one, and
/// no column reference outside an aggregate call.
struct Validator {
    depth: usize,
    error: Option<EvalError>,
}

impl<'a> Visitor<'a> for Validator {
    fn enter(&mut self, node: Node<'a>) -> bool {
        if self.error.is_some() {
            return false;
        }
        match node {
            Node::Expr(Expr::FunctionCall { name, .. }) if is_aggregate(&name.name) => {
                if self.depth > 0 {
                    self.error = Some(EvalError::new(name.pos, EvalErrorKind::NestedAggregate));
                    return false;
                }
                self.depth += 1;
            }
            Node::Expr(Expr::Ident(ident)) if self.depth == 0 => {
                self.error = Some(EvalError::new(
                    ident.pos,
                    EvalErrorKind::UngroupedColumn(ident.name.clone()),
                ));
                return false;
            }
            _ => {}
        }
        true
    }

    fn leave(&mut self, node: Node<'a>) {
        if let Node::Expr(Expr::FunctionCall { name, .. }) = node {
            if is_aggregate(&name.name) && self.depth > 0 && self.error.is_none() {
                self.depth -= 1;
            }
        }
    }
}

pub fn validate(expr: &Expr) -> Result<(), EvalError> {
    let mut validator = Validator {
        depth: 0,
        error: None,
    };
    walk(Node::Expr(expr), &mut validator);
    match validator.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::lexer::Lexer;
    use crate::parser;

    fn projection(sql: &str) -> Expr {
        let stmts = parser::parse(Lexer::new(&format!("SELECT {sql} FROM t"))).unwrap();
        match stmts.into_iter().next() {
            Some(Statement::Select(mut select)) => select.projections.remove(0),
            other => panic!("Expected Select, got {other:?}"),
        }
    }

    fn run(acc: &mut dyn Accumulator, values: Vec<Option<Value>>) -> Option<Value> {
        for value in values {
            acc.step(value).unwrap();
        }
        acc.finalize()
    }

    #[test]
    fn test_contains_aggregate() {
        assert!(contains_aggregate(&projection("COUNT(*)")));
        assert!(contains_aggregate(&projection("1 + sum(a)")));
        assert!(!contains_aggregate(&projection("a + 1")));
        assert!(!contains_aggregate(&projection("upper(a)")));
    }

    #[test]
    fn test_count() {
        let mut count = Count::default();
        assert_eq!(
            run(&mut count, vec![Some(Value::Integer(1)), None, Some(Value::Integer(3))]),
            Some(Value::Integer(2))
        );
        let mut rows = CountRows::default();
        assert_eq!(run(&mut rows, vec![None, None]), Some(Value::Integer(2)));
        assert_eq!(Count::default().finalize(), Some(Value::Integer(0)));
    }

    #[test]
    fn test_min_max() {
        let values = || vec![Some(Value::Integer(3)), None, Some(Value::Integer(-1)), Some(Value::Integer(7))];
        assert_eq!(run(&mut MinMax::min(), values()), Some(Value::Integer(-1)));
        assert_eq!(run(&mut MinMax::max(), values()), Some(Value::Integer(7)));
    }

    #[test]
    fn test_min_max_promote_to_number() {
        let values = || vec![Some(Value::Integer(3)), Some(Value::Number(2.5)), Some(Value::Integer(4))];
        assert_eq!(run(&mut MinMax::min(), values()), Some(Value::Number(2.5)));
        assert_eq!(run(&mut MinMax::max(), values()), Some(Value::Number(4.0)));
    }

    #[test]
    fn test_empty_input_is_null() {
        assert_eq!(run(&mut MinMax::max(), vec![None]), None);
        assert_eq!(run(&mut Sum::default(), vec![]), None);
    }

    #[test]
    fn test_sum() {
        assert_eq!(
            run(&mut Sum::default(), vec![Some(Value::Integer(1)), Some(Value::Integer(2))]),
            Some(Value::Integer(3))
        );
        assert_eq!(
            run(&mut Sum::default(), vec![Some(Value::Integer(1)), Some(Value::Number(0.5))]),
            Some(Value::Number(1.5))
        );

        let mut sum = Sum::default();
        sum.step(Some(Value::Integer(i64::MAX))).unwrap();
        assert_eq!(
            sum.step(Some(Value::Integer(1))),
            Err(EvalErrorKind::IntegerOverflow)
        );
    }

    #[test]
    fn test_non_numeric_input() {
        assert_eq!(
            Sum::default().step(Some(Value::String("x".into()))),
            Err(EvalErrorKind::InvalidAggregateInput {
                function: "SUM".into(),
                value: "\"x\"".into()
            })
        );
        assert!(MinMax::min().step(Some(Value::Boolean(true))).is_err());
    }

    #[test]
    fn test_rewrite_builds_slots() {
        let expr = projection("count(*) + max(a) * 2");
        let mut slots = Vec::new();
        let shell = rewrite(&expr, &mut slots).unwrap();

        assert_eq!(slots.len(), 2);
        assert!(slots[0].argument.is_none());
        assert!(matches!(slots[1].argument, Some(Expr::Ident(_))));
        let Shell::Binary { op, lhs, rhs, .. } = shell else {
            panic!("Expected Binary shell");
        };
        assert_eq!(op, Kind::Plus);
        assert_eq!(*lhs, Shell::Slot(0));
        assert!(matches!(*rhs, Shell::Binary { op: Kind::Mul, .. }));
    }

    #[test]
    fn test_rewrite_errors() {
        let expr = projection("sum(a, b)");
        let err = rewrite(&expr, &mut Vec::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "eval:1:7: wrong number of arguments to SUM: got 2, want 1"
        );

        let expr = projection("count(*) + avg(a)");
        let err = rewrite(&expr, &mut Vec::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnknownFunction("avg".into()));
        assert_eq!(err.pos, Position::new(1, 18));
    }

    #[test]
    fn test_validate() {
        assert!(validate(&projection("count(a) + sum(b)")).is_ok());
        assert_eq!(
            validate(&projection("a + count(*)")).unwrap_err().kind,
            EvalErrorKind::UngroupedColumn("a".into())
        );
        assert_eq!(
            validate(&projection("max(sum(a))")).unwrap_err().kind,
            EvalErrorKind::NestedAggregate
        );
    }
}
