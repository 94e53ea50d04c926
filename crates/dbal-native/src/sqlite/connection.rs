//! Blocking SQLite connection driven through SQLx

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sqlx::sqlite::{
   SqliteConnectOptions, SqliteConnection as SqlxConnection, SqliteQueryResult, SqliteRow,
};
use sqlx::{Column, ConnectOptions, Statement, TypeInfo};
use tokio::runtime::Runtime;
use tracing::{debug, error};

use super::config::SqliteConfig;
use super::statement::SqliteStatement;
use crate::NativeResult;
use crate::backend::{ColumnMeta, NativeConnection, NativeStatement, StatementOptions};
use crate::fault::{NativeFault, SQLSTATE_CONSTRAINT, SQLSTATE_GENERAL};

impl From<sqlx::Error> for NativeFault {
   fn from(err: sqlx::Error) -> Self {
      let Some(db_err) = err.as_database_error() else {
         return NativeFault::new(SQLSTATE_GENERAL, None, err.to_string());
      };

      let sqlstate = match db_err.kind() {
         sqlx::error::ErrorKind::UniqueViolation
         | sqlx::error::ErrorKind::ForeignKeyViolation
         | sqlx::error::ErrorKind::NotNullViolation
         | sqlx::error::ErrorKind::CheckViolation => SQLSTATE_CONSTRAINT,
         _ => SQLSTATE_GENERAL,
      };

      // SQLite reports its (extended) result code as a decimal string
      let code = db_err.code().and_then(|code| code.parse::<i64>().ok());

      NativeFault::new(sqlstate, code, db_err.message())
   }
}

/// The live SQLx connection plus the runtime used to drive it.
///
/// Shared between a [`SqliteConnection`] and the statements it prepares.
pub(crate) struct Session {
   conn: SqlxConnection,
   runtime: Runtime,
   last_fault: NativeFault,
   last_insert_id: i64,
}

impl Session {
   fn record<T>(&mut self, result: Result<T, sqlx::Error>) -> NativeResult<T> {
      match result {
         Ok(value) => {
            self.last_fault = NativeFault::none();
            Ok(value)
         }
         Err(err) => {
            let fault = NativeFault::from(err);
            self.last_fault = fault.clone();
            Err(fault)
         }
      }
   }

   fn describe(&mut self, sql: &str) -> NativeResult<Vec<ColumnMeta>> {
      let Session { conn, runtime, .. } = &mut *self;
      let described = runtime.block_on(async {
         let statement = sqlx::Executor::prepare(&mut *conn, sql).await?;
         let columns = statement
            .columns()
            .iter()
            .map(|column| {
               ColumnMeta::named(column.name()).with_native_type(column.type_info().name())
            })
            .collect::<Vec<_>>();
         Ok::<_, sqlx::Error>(columns)
      });
      self.record(described)
   }

   pub(crate) fn execute(&mut self, sql: &str) -> NativeResult<SqliteQueryResult> {
      let Session { conn, runtime, .. } = &mut *self;
      let done = runtime.block_on(sqlx::query(sql).execute(&mut *conn));
      let done = self.record(done)?;
      self.last_insert_id = done.last_insert_rowid();
      Ok(done)
   }

   pub(crate) fn fetch_all(&mut self, sql: &str) -> NativeResult<Vec<SqliteRow>> {
      let Session { conn, runtime, .. } = &mut *self;
      let rows = runtime.block_on(sqlx::query(sql).fetch_all(&mut *conn));
      self.record(rows)
   }

   pub(crate) fn fail(&mut self, fault: NativeFault) -> NativeFault {
      self.last_fault = fault.clone();
      fault
   }
}

/// A connected SQLite database usable as a native backend.
///
/// Every call blocks the caller until SQLite answers; the SQLx futures are
/// driven on a private current-thread runtime, nothing is spawned.
///
/// # Example
///
/// ```no_run
/// use dbal_native::{NativeConnection, SqliteConnection};
///
/// # fn example() -> Result<(), dbal_native::NativeFault> {
/// let mut conn = SqliteConnection::open("app.db", None)?;
/// let mut stmt = conn.prepare("SELECT 1", &Default::default())?;
/// stmt.execute()?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteConnection {
   session: Arc<Mutex<Session>>,
   label: String,
}

impl std::fmt::Debug for SqliteConnection {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("SqliteConnection")
         .field("label", &self.label)
         .finish_non_exhaustive()
   }
}

impl SqliteConnection {
   /// Open (and by default create) the database file at `path`.
   ///
   /// Pass `None` for `config` to use [`SqliteConfig::default`].
   pub fn open(path: impl AsRef<Path>, config: Option<SqliteConfig>) -> NativeResult<Self> {
      let config = config.unwrap_or_default();
      let path = path.as_ref();

      if path.as_os_str().is_empty() {
         return Err(NativeFault::new(
            SQLSTATE_GENERAL,
            None,
            "database path cannot be empty",
         ));
      }

      let options = SqliteConnectOptions::new()
         .filename(path)
         .create_if_missing(config.create_if_missing)
         .foreign_keys(config.foreign_keys)
         .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

      Self::connect_with(options, path.display().to_string())
   }

   /// Open a private in-memory database.
   pub fn open_in_memory() -> NativeResult<Self> {
      let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
      Self::connect_with(options, ":memory:".to_string())
   }

   fn connect_with(options: SqliteConnectOptions, label: String) -> NativeResult<Self> {
      let runtime = tokio::runtime::Builder::new_current_thread()
         .enable_all()
         .build()
         .map_err(|e| {
            error!("Failed to start runtime for {}: {}", label, e);
            NativeFault::new(SQLSTATE_GENERAL, None, format!("runtime error: {e}"))
         })?;

      let conn = runtime.block_on(options.connect()).map_err(|e| {
         error!("Failed to open SQLite database {}: {}", label, e);
         NativeFault::from(e)
      })?;

      debug!("opened SQLite database {}", label);

      Ok(Self {
         session: Arc::new(Mutex::new(Session {
            conn,
            runtime,
            last_fault: NativeFault::none(),
            last_insert_id: 0,
         })),
         label,
      })
   }

   /// Path (or `:memory:`) this connection was opened with
   pub fn label(&self) -> &str {
      &self.label
   }

   fn run(&mut self, sql: &str) -> NativeResult<()> {
      self.session.lock().execute(sql).map(|_| ())
   }
}

impl NativeConnection for SqliteConnection {
   fn driver_name(&self) -> &str {
      "sqlite"
   }

   fn prepare(
      &mut self,
      sql: &str,
      _options: &StatementOptions,
   ) -> NativeResult<Box<dyn NativeStatement>> {
      let columns = self.session.lock().describe(sql)?;
      Ok(Box::new(SqliteStatement::new(
         Arc::clone(&self.session),
         sql.to_string(),
         columns,
      )))
   }

   fn begin_transaction(&mut self) -> NativeResult<()> {
      self.run("BEGIN IMMEDIATE")
   }

   fn commit(&mut self) -> NativeResult<()> {
      self.run("COMMIT")
   }

   fn roll_back(&mut self) -> NativeResult<()> {
      self.run("ROLLBACK")
   }

   fn quote(&self, value: &str) -> Option<String> {
      Some(format!("'{}'", value.replace('\'', "''")))
   }

   fn error_info(&self) -> NativeFault {
      self.session.lock().last_fault.clone()
   }

   fn last_insert_id(&self) -> Option<String> {
      Some(self.session.lock().last_insert_id.to_string())
   }
}
