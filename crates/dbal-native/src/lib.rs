//! Native backend contract for `dbal`.
//!
//! A native backend is the concrete client that actually talks to a database.
//! The `dbal` layer only sees it through two traits:
//!
//! - [`NativeConnection`]: a connected handle that prepares statements, runs
//!   transactions and quotes literals
//! - [`NativeStatement`]: a prepared statement and its result set
//!
//! Every failure is reported as a [`NativeFault`], the `(sqlstate, code,
//! message)` triplet the layer above translates into its own error kinds.
//!
//! Two backends ship with the crate:
//!
//! - [`SqliteConnection`]: a blocking SQLite client built on SQLx
//! - [`MemoryConnection`]: a scripted backend that answers from canned
//!   results, for exercising the layer above without a database
//!
//! # Example
//!
//! ```no_run
//! use dbal_native::{FetchStyle, NativeConnection, SqliteConnection};
//!
//! # fn example() -> Result<(), dbal_native::NativeFault> {
//! let mut conn = SqliteConnection::open("mydb.db", None)?;
//!
//! conn.prepare("CREATE TABLE users (id INTEGER, name TEXT)", &Default::default())?
//!    .execute()?;
//!
//! let mut stmt = conn.prepare("SELECT * FROM users", &Default::default())?;
//! stmt.execute()?;
//! while let Some(row) = stmt.fetch(FetchStyle::Assoc, None)? {
//!    println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod fault;
pub mod memory;
pub mod sqlite;

pub use backend::{
   ColumnMeta, FetchStyle, NativeConnection, NativeRow, NativeStatement, StatementOptions,
};
pub use fault::{NativeFault, SQLSTATE_CONSTRAINT, SQLSTATE_GENERAL, SQLSTATE_OK};
pub use memory::{MemoryConnection, MemoryProbe, MemoryStatement};
pub use sqlite::{SqliteConfig, SqliteConnection, SqliteStatement};

/// Result type returned by every native backend operation
pub type NativeResult<T> = std::result::Result<T, NativeFault>;
