//! Uniform query, result and transaction layer over native database backends.
//!
//! A [`Driver`] wraps one [`dbal_native::NativeConnection`] and gives every
//! backend the same surface: emulated placeholders, implicit transactions
//! when autocommit is off, error codes translated to [`ErrorKind`], and
//! [`QueryResult`] cursors with limit windows and portability adjustments.

mod config;
mod driver;
mod error;
mod prepared;
mod queries;
mod result;
mod row;
mod sequence;
pub mod sql;
mod statement;
pub mod translate;

pub use config::{DriverConfig, DriverOptions, FetchMode, LimitStrategy, Portability, TableInfoMode};
pub use driver::{ColumnInfo, Driver, Feature, FetchStatus, Outcome, TableInfo, TableSource};
pub use error::{Error, ErrorKind, Result};
pub use prepared::{AutoMode, PreparedId};
pub use queries::{ColumnRef, ListKind};
pub use result::QueryResult;
pub use row::Row;
pub use statement::{
   BufferedRows, NativeHandle, ReleaseFn, StatementHandle, StatementKind, StatementType,
};

pub use dbal_native;
