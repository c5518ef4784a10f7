pub mod aggregate;
pub mod ast;
pub mod column;
pub mod data_type;
pub mod environment;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod position;
pub mod pprint;
pub mod table;
pub mod token;
pub mod value;

pub use column::Column;
pub use data_type::DataType;
pub use environment::{Environment, QueryResult};
pub use error::{Error, EvalError, LexError, ParseError};
pub use position::Position;
pub use table::{Row, Table};
pub use value::Value;
