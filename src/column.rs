use crate::data_type::DataType;
use crate::error::EvalErrorKind;
use crate::value::Value;

/// Schema of one table column: its type, its constraints and, for
/// `AUTOINCREMENT` columns, the counter handing out the next value.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The name of the column.
    pub name: String,
    /// The logical data type of the column.
    pub data_type: DataType,
    /// Value used when an INSERT does not name the column.
    pub default: Option<Value>,
    pub nullable: bool,
    pub auto_increment: bool,
    /// Next value an auto-increment column hands out. Starts at 1; `None`
    /// once `i64::MAX` has been used.
    next_value: Option<i64>,
}

impl Column {
    /// Creates a nullable column without default.
    pub fn new(name: String, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            default: None,
            nullable: true,
            auto_increment: false,
            next_value: Some(1),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    /// Marks the column as auto-incremented.
    ///
    /// # Errors
    /// Only INTEGER columns can be auto-incremented.
    pub fn with_auto_increment(mut self) -> Result<Self, EvalErrorKind> {
        if self.data_type != DataType::Integer {
            return Err(EvalErrorKind::InvalidAutoIncrement {
                column: self.name,
                data_type: self.data_type,
            });
        }
        self.auto_increment = true;
        Ok(self)
    }

    /// The value stored when an INSERT leaves this column out: the next
    /// counter value for auto-increment columns, the default otherwise.
    ///
    /// The counter is only moved by [Column::advance], once the whole row has
    /// been accepted.
    pub fn fill(&self) -> Result<Option<Value>, EvalErrorKind> {
        if self.auto_increment {
            let next = self.next_value.ok_or(EvalErrorKind::IntegerOverflow)?;
            return Ok(Some(Value::Integer(next)));
        }
        Ok(self.default.clone())
    }

    pub fn advance(&mut self) {
        self.next_value = self.next_value.and_then(|n| n.checked_add(1));
    }

    /// Converts a value to the column type and enforces `NOT NULL`.
    ///
    /// # Errors
    /// A cast error when the value has no conversion to the column type, or
    /// [EvalErrorKind::NotNullViolation] naming the column.
    pub fn coerce(&self, value: Option<Value>) -> Result<Option<Value>, EvalErrorKind> {
        match value {
            Some(value) => Ok(Some(value.coerce(self.data_type)?)),
            None if self.nullable => Ok(None),
            None => Err(EvalErrorKind::NotNullViolation(self.name.clone())),
        }
    }
}
