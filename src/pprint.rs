//! Text rendering of result tables and syntax trees.

use std::io::{self, Write};

use crate::ast::{Node, Statement, Visitor, walk};
use crate::environment::QueryResult;

/// Writes a result as a grid: a header row, a separator line, then one line
/// per row. Cells are left-justified and null renders as an empty cell.
///
/// # Example
/// ```
/// use toysql::{Environment, pprint::write_table};
/// let mut env = Environment::new();
/// env.execute("CREATE TABLE t (id INTEGER, name VARCHAR); INSERT INTO t VALUES (1, 'ann')").unwrap();
/// let result = env.query("SELECT * FROM t").unwrap();
///
/// let mut out = Vec::new();
/// write_table(&mut out, &result).unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     " id | name  \n----+-------\n 1  | \"ann\" \n"
/// );
/// ```
pub fn write_table<W: Write>(out: &mut W, result: &QueryResult) -> io::Result<()> {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| value.as_ref().map(ToString::to_string).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_line(out, &result.columns, &widths)?;
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    writeln!(out, "{}", separator.join("+"))?;
    for row in &cells {
        write_line(out, row, &widths)?;
    }
    Ok(())
}

fn write_line<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!(" {cell:<width$} "))
        .collect();
    writeln!(out, "{}", line.join("|"))
}

/// Dumps a syntax tree, one node per line, children indented under their
/// parent.
#[derive(Debug, Default)]
pub struct PrettyPrinter {
    out: String,
    depth: usize,
}

impl PrettyPrinter {
    const INDENT: &'static str = "  ";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(stmt: &Statement) -> String {
        let mut printer = Self::new();
        walk(Node::Statement(stmt), &mut printer);
        printer.finish()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl<'a> Visitor<'a> for PrettyPrinter {
    fn enter(&mut self, node: Node<'a>) -> bool {
        self.out.push_str(&Self::INDENT.repeat(self.depth));
        self.out.push_str(&node.to_string());
        self.out.push('\n');
        self.depth += 1;
        true
    }

    fn leave(&mut self, _node: Node<'a>) {
        self.depth -= 1;
    }
}
