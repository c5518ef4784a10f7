use bitvec::prelude::*;

use crate::column::Column;
use crate::error::EvalErrorKind;
use crate::value::Value;

/// One stored row, aligned with the table's columns. `None` is SQL null.
pub type Row = Vec<Option<Value>>;

/// An in-memory table: an ordered schema and its rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: String, columns: Vec<Column>) -> Self {
        Self {
            name,
            columns,
            rows: Vec::new(),
        }
    }

    /// Position of a column in the schema.
    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }

    /// Maps the column list of an INSERT to schema positions. An empty list
    /// means every column in schema order.
    ///
    /// # Errors
    /// Unknown or repeated column names.
    pub fn resolve_targets(&self, names: &[&str]) -> Result<Vec<usize>, EvalErrorKind> {
        if names.is_empty() {
            return Ok((0..self.columns.len()).collect());
        }
        let mut seen = bitvec![0; self.columns.len()];
        names
            .iter()
            .map(|name| {
                let idx = self
                    .col_index(name)
                    .ok_or_else(|| EvalErrorKind::UnknownTableColumn {
                        column: name.to_string(),
                        table: self.name.clone(),
                    })?;
                if seen.replace(idx, true) {
                    return Err(EvalErrorKind::DuplicateColumn(name.to_string()));
                }
                Ok(idx)
            })
            .collect()
    }

    /// Inserts a new row from values placed at `targets`.
    ///
    /// Columns left out are filled by their auto-increment counter or their
    /// default. Every value is then coerced to its column type and checked
    /// against `NOT NULL`. Counters only advance once the row is stored.
    ///
    /// # Errors
    /// Cast failures, not-null violations and counter overflow. The table is
    /// left unchanged on error.
    pub fn insert(
        &mut self,
        targets: &[usize],
        values: Vec<Option<Value>>,
    ) -> Result<(), EvalErrorKind> {
        if targets.len() != values.len() {
            return Err(EvalErrorKind::InsertArity {
                values: values.len(),
                targets: targets.len(),
            });
        }

        let mut row: Row = vec![None; self.columns.len()];
        let mut given = bitvec![0; self.columns.len()];
        for (&idx, value) in targets.iter().zip(values) {
            row[idx] = value;
            given.set(idx, true);
        }
        for idx in given.iter_zeros() {
            row[idx] = self.columns[idx].fill()?;
        }

        let row = row
            .into_iter()
            .zip(&self.columns)
            .map(|(value, col)| col.coerce(value))
            .collect::<Result<Row, _>>()?;

        for idx in given.iter_zeros() {
            if self.columns[idx].auto_increment {
                self.columns[idx].advance();
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// Evaluates `predicate` over every row, in storage order, and returns a
    /// mask with one bit per row.
    pub fn selection<E>(
        &self,
        mut predicate: impl FnMut(&Row) -> Result<bool, E>,
    ) -> Result<BitVec, E> {
        let mut mask = BitVec::with_capacity(self.rows.len());
        for row in &self.rows {
            mask.push(predicate(row)?);
        }
        Ok(mask)
    }

    /// Removes the rows whose bit is set, keeping the others in order.
    /// Returns the number of removed rows.
    pub fn delete_selected(&mut self, mask: &BitSlice) -> usize {
        let before = self.rows.len();
        let mut idx = 0;
        self.rows.retain(|_| {
            let keep = !mask[idx];
            idx += 1;
            keep
        });
        before - self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;

    fn users() -> Table {
        Table::new(
            "users".into(),
            vec![
                Column::new("id".into(), DataType::Integer)
                    .not_null()
                    .with_auto_increment()
                    .unwrap(),
                Column::new("name".into(), DataType::String),
                Column::new("score".into(), DataType::Number)
                    .with_default(Some(Value::Number(0.5))),
            ],
        )
    }

    #[test]
    fn test_table_creation() {
        let table = users();
        assert_eq!(table.columns.len(), 3);
        assert!(table.rows.is_empty());
        assert_eq!(table.col_index("name"), Some(1));
        assert_eq!(table.col_index("age"), None);
        assert_eq!(table.column_names(), vec!["id", "name", "score"]);
    }

    #[test]
    fn test_resolve_targets() {
        let table = users();
        assert_eq!(table.resolve_targets(&[]), Ok(vec![0, 1, 2]));
        assert_eq!(table.resolve_targets(&["score", "id"]), Ok(vec![2, 0]));
        assert_eq!(
            table.resolve_targets(&["age"]),
            Err(EvalErrorKind::UnknownTableColumn {
                column: "age".into(),
                table: "users".into()
            })
        );
        assert_eq!(
            table.resolve_targets(&["name", "name"]),
            Err(EvalErrorKind::DuplicateColumn("name".into()))
        );
    }

    #[test]
    fn test_table_insert_and_fill() {
        let mut table = users();

        table
            .insert(&[1], vec![Some(Value::String("ann".into()))])
            .unwrap();
        table
            .insert(&[1, 2], vec![Some(Value::String("bob".into())), Some(Value::Integer(3))])
            .unwrap();

        assert_eq!(
            table.rows,
            vec![
                vec![
                    Some(Value::Integer(1)),
                    Some(Value::String("ann".into())),
                    Some(Value::Number(0.5))
                ],
                vec![
                    Some(Value::Integer(2)),
                    Some(Value::String("bob".into())),
                    Some(Value::Number(3.0))
                ],
            ]
        );
    }

    #[test]
    fn test_failed_insert_leaves_table_unchanged() {
        let mut table = users();

        let result = table.insert(&[0], vec![None]);
        assert_eq!(result, Err(EvalErrorKind::NotNullViolation("id".into())));

        let result = table.insert(&[2], vec![Some(Value::Boolean(true))]);
        assert!(result.is_err());
        assert!(table.rows.is_empty());

        // the counter was not consumed by the failed rows
        table.insert(&[1], vec![None]).unwrap();
        assert_eq!(table.rows[0][0], Some(Value::Integer(1)));
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut table = users();
        assert_eq!(
            table.insert(&[0, 1], vec![Some(Value::Integer(1))]),
            Err(EvalErrorKind::InsertArity {
                values: 1,
                targets: 2
            })
        );
    }

    #[test]
    fn test_selection_and_delete() {
        let mut table = users();
        for name in ["a", "b", "c", "d"] {
            table
                .insert(&[1], vec![Some(Value::String(name.into()))])
                .unwrap();
        }

        let mask = table
            .selection(|row| Ok::<_, EvalErrorKind>(matches!(row[0], Some(Value::Integer(id)) if id % 2 == 0)))
            .unwrap();
        assert_eq!(mask, bitvec![0, 1, 0, 1]);

        assert_eq!(table.delete_selected(&mask), 2);
        let ids: Vec<_> = table.rows.iter().map(|row| row[0].clone()).collect();
        assert_eq!(ids, vec![Some(Value::Integer(1)), Some(Value::Integer(3))]);
    }
}
