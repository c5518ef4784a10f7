use std::fmt;

use crate::token::Kind;

/// Represents the supported data types of a column.
/// Values stored in a column are coerced to its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `BOOLEAN`: true or false.
    Boolean,
    /// `INTEGER`: a 64-bit signed integer.
    Integer,
    /// `NUMBER`: a 64-bit floating-point number.
    Number,
    /// `VARCHAR`: a UTF-8 character string.
    String,
    /// `TIMESTAMP`: an instant with a UTC offset.
    Timestamp,
}

impl DataType {
    /// Maps a type keyword of a column definition to its data type.
    pub fn from_keyword(kind: Kind) -> Option<Self> {
        match kind {
            Kind::Boolean => Some(Self::Boolean),
            Kind::Integer => Some(Self::Integer),
            Kind::Number => Some(Self::Number),
            Kind::Varchar => Some(Self::String),
            Kind::Timestamp => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// The keywords accepted as column types, in the order they are reported
    /// by parse errors.
    pub const KEYWORDS: [Kind; 5] = [
        Kind::Boolean,
        Kind::Integer,
        Kind::Number,
        Kind::Varchar,
        Kind::Timestamp,
    ];
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Number => "Number",
            Self::String => "String",
            Self::Timestamp => "Timestamp",
        };
        f.write_str(name)
    }
}
