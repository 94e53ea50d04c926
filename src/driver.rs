use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dbal_native::{FetchStyle, NativeConnection, NativeRow, NativeStatement, StatementOptions};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::{DriverConfig, DriverOptions, FetchMode, LimitStrategy, Portability, TableInfoMode};
use crate::error::{Error, ErrorKind, Result};
use crate::prepared::{Prepared, PreparedId};
use crate::row::Row;
use crate::sql;
use crate::statement::{NativeHandle, StatementHandle};
use crate::translate::{self, disconnected_fault, format_error_info};

/// What a statement produced.
#[derive(Debug)]
pub enum Outcome<T> {
   /// The statement returns rows
   Fetchable(T),
   /// A manipulation statement completed
   Done,
}

impl<T> Outcome<T> {
   pub fn is_done(&self) -> bool {
      matches!(self, Outcome::Done)
   }

   pub fn fetchable(self) -> Option<T> {
      match self {
         Outcome::Fetchable(value) => Some(value),
         Outcome::Done => None,
      }
   }

   pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
      match self {
         Outcome::Fetchable(value) => Outcome::Fetchable(f(value)),
         Outcome::Done => Outcome::Done,
      }
   }
}

/// Result of fetching a single row into a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
   Fetched,
   Exhausted,
}

/// Optional capabilities a driver may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
   /// Limit windows (see [`LimitStrategy`])
   Limit,
   /// Row counts of result sets
   NumRows,
   /// Native prepared statements with bound parameters
   Prepare,
   Transactions,
}

/// Description of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
   pub table: String,
   pub name: String,
   #[serde(rename = "type")]
   pub column_type: String,
   pub len: i64,
   pub flags: Vec<String>,
}

/// Column descriptions of a table or result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableInfo {
   /// Present for every mode except [`TableInfoMode::Plain`]
   pub num_fields: Option<usize>,
   pub columns: Vec<ColumnInfo>,
   /// Column name to position
   pub order: Option<IndexMap<String, usize>>,
   /// Table name to column name to position
   pub order_table: Option<IndexMap<String, IndexMap<String, usize>>>,
}

/// What `table_info` describes.
#[derive(Debug, Clone, Copy)]
pub enum TableSource<'a> {
   /// A table, described by running an empty select against it
   Table(&'a str),
   /// An executed statement
   Handle(&'a StatementHandle),
}

impl<'a> From<&'a str> for TableSource<'a> {
   fn from(name: &'a str) -> Self {
      TableSource::Table(name)
   }
}

impl<'a> From<&'a StatementHandle> for TableSource<'a> {
   fn from(handle: &'a StatementHandle) -> Self {
      TableSource::Handle(handle)
   }
}

enum LastExecution {
   Manipulation(Box<dyn NativeStatement>),
   Fetchable,
}

/// State captured by a result cursor when it is created.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
   pub autofree: bool,
   pub fetch_mode: FetchMode,
   pub limit_strategy: LimitStrategy,
   pub query: String,
   pub parameters: Vec<JsonValue>,
}

struct Connection {
   native: Option<Box<dyn NativeConnection>>,
   driver_name: String,
   autocommit: bool,
   transaction_opcount: usize,
   options: DriverOptions,
   fetch_mode: FetchMode,
   last_query: String,
   last_parameters: Vec<JsonValue>,
   last_query_manip: bool,
   next_query_manip: bool,
   last_execution: Option<LastExecution>,
   prepared: HashMap<usize, Prepared>,
   next_prepared: usize,
}

fn platform_of(driver_name: &str) -> &'static str {
   match driver_name {
      "mysql" => "mysql",
      "pgsql" => "pgsql",
      "sqlite" => "sqlite",
      _ => "unknown",
   }
}

fn disconnected(kind: ErrorKind) -> Error {
   translate::raise(disconnected_fault(), Some(kind))
}

impl Connection {
   fn native_mut(&mut self) -> Result<&mut (dyn NativeConnection + 'static)> {
      self.native
         .as_deref_mut()
         .ok_or_else(|| disconnected(ErrorKind::NoDbSelected))
   }

   fn native_ref(&self) -> Result<&(dyn NativeConnection + 'static)> {
      self.native
         .as_deref()
         .ok_or_else(|| disconnected(ErrorKind::NoDbSelected))
   }

   fn native_error(&self, kind: Option<ErrorKind>) -> Error {
      let fault = match &self.native {
         Some(native) => native.error_info(),
         None => disconnected_fault(),
      };
      translate::raise(fault, kind)
   }

   fn platform(&self) -> Result<&'static str> {
      Ok(platform_of(self.native_ref()?.driver_name()))
   }

   fn check_manip(&mut self, sql: &str) -> bool {
      let manip = std::mem::take(&mut self.next_query_manip) || sql::is_manip(sql);
      self.last_query_manip = manip;
      manip
   }

   fn modify_query(&self, sql: &str) -> String {
      if self.options.portability.delete_count {
         sql::rewrite_delete_count(sql).into_owned()
      } else {
         sql.to_string()
      }
   }

   fn simple_query(&mut self, query: &str) -> Result<Outcome<StatementHandle>> {
      let is_manip = self.check_manip(query);
      self.last_query = query.to_string();
      let query = self.modify_query(query);

      if self.native.is_none() {
         return Err(self.native_error(Some(ErrorKind::NoDbSelected)));
      }

      if !self.autocommit && is_manip {
         if self.transaction_opcount == 0 {
            self
               .native_mut()?
               .begin_transaction()
               .map_err(|fault| Error::native(ErrorKind::Generic, fault))?;
            debug!("began transaction");
         }
         self.transaction_opcount += 1;
      }

      let options = StatementOptions {
         buffered: !(self.platform()? == "mysql" && !self.options.result_buffering),
      };

      debug!("executing query: {}", query);
      let native = self.native_mut()?;
      let mut statement = native.prepare(&query, &options).map_err(translate::translate)?;
      statement.execute().map_err(translate::translate)?;

      if is_manip {
         self.last_execution = Some(LastExecution::Manipulation(statement));
         Ok(Outcome::Done)
      } else {
         self.last_execution = Some(LastExecution::Fetchable);
         Ok(Outcome::Fetchable(StatementHandle::new(statement)))
      }
   }

   fn commit(&mut self) -> Result<()> {
      if self.transaction_opcount == 0 {
         return Ok(());
      }

      self.native_mut()?.commit().map_err(|fault| {
         let info = format_error_info(&fault);
         Error::native(ErrorKind::Generic, fault).with_userinfo(info)
      })?;

      debug!("committed {} operations", self.transaction_opcount);
      self.transaction_opcount = 0;
      Ok(())
   }

   fn rollback(&mut self) -> Result<()> {
      if self.transaction_opcount == 0 {
         return Ok(());
      }

      self.native_mut()?.roll_back().map_err(|fault| {
         let info = format_error_info(&fault);
         Error::native(ErrorKind::Generic, fault).with_userinfo(info)
      })?;

      debug!("rolled back {} operations", self.transaction_opcount);
      self.transaction_opcount = 0;
      Ok(())
   }

   fn affected_rows(&self) -> Result<u64> {
      match &self.last_execution {
         None => Err(self.native_error(Some(ErrorKind::NotCapable))),
         Some(LastExecution::Manipulation(statement)) if self.last_query_manip => {
            Ok(statement.row_count().unwrap_or(0))
         }
         Some(_) => Ok(0),
      }
   }

   fn escape_simple(&self, value: &str) -> Result<String> {
      match self.platform()? {
         "mysql" | "pgsql" | "sqlite" => {}
         _ => return Err(Error::new(ErrorKind::Unsupported)),
      }

      let quoted = self
         .native_ref()?
         .quote(value)
         .ok_or_else(|| Error::new(ErrorKind::Unsupported))?;

      Ok(strip_quotes(&quoted, value).unwrap_or(quoted))
   }

   fn quote_smart(&self, value: &JsonValue) -> Result<String> {
      match value {
         JsonValue::Null => Ok("NULL".to_string()),
         JsonValue::Bool(flag) => Ok(if *flag { "1" } else { "0" }.to_string()),
         JsonValue::Number(number) if number.is_i64() || number.is_u64() => Ok(number.to_string()),
         JsonValue::Number(number) => Ok(format!("'{}'", self.escape_simple(&number.to_string())?)),
         JsonValue::String(text) => Ok(format!("'{}'", self.escape_simple(text)?)),
         other => Ok(format!("'{}'", self.escape_simple(&other.to_string())?)),
      }
   }

   fn modify_limit_query(&self, query: &str, offset: usize, count: usize) -> Result<String> {
      if sql::is_manip(query) || self.next_query_manip {
         if self.options.legacy_manip_limit {
            return Ok(format!("{query} LIMIT {count}"));
         }
         return Err(Error::new(ErrorKind::Unsupported)
            .with_userinfo("LIMIT on a manipulation statement"));
      }

      Ok(format!("{query} LIMIT {offset}, {count}"))
   }

   fn describe(&self, handle: &StatementHandle, mode: TableInfoMode) -> Result<TableInfo> {
      let NativeHandle::Object(statement) = handle.get_statement()? else {
         return Err(self.native_error(Some(ErrorKind::NeedMoreData)));
      };

      let lowercase = self.options.portability.lowercase;
      let case = |text: String| if lowercase { text.to_lowercase() } else { text };

      let count = statement.column_count();
      let mut info = TableInfo {
         num_fields: (mode != TableInfoMode::Plain).then_some(count),
         ..Default::default()
      };

      for i in 0..count {
         let meta = statement.column_meta(i).unwrap_or_default();
         let column = ColumnInfo {
            table: case(meta.table),
            name: case(meta.name),
            column_type: meta.native_type.unwrap_or_else(|| "unknown".to_string()),
            len: meta.len,
            flags: meta.flags,
         };

         if mode.wants_order() {
            info.order
               .get_or_insert_with(IndexMap::new)
               .insert(column.name.clone(), i);
         }
         if mode.wants_order_table() {
            info.order_table
               .get_or_insert_with(IndexMap::new)
               .entry(column.table.clone())
               .or_default()
               .insert(column.name.clone(), i);
         }
         info.columns.push(column);
      }

      Ok(info)
   }

   fn table_info(&mut self, source: TableSource<'_>, mode: TableInfoMode) -> Result<TableInfo> {
      match source {
         TableSource::Table(name) => {
            if self.native.is_none() {
               return Err(self.native_error(Some(ErrorKind::NoDbSelected)));
            }
            match self.simple_query(&format!("SELECT * FROM {name} LIMIT 0"))? {
               Outcome::Fetchable(handle) => self.describe(&handle, mode),
               Outcome::Done => Err(self.native_error(Some(ErrorKind::NeedMoreData))),
            }
         }
         TableSource::Handle(handle) => self.describe(handle, mode),
      }
   }

   fn snapshot(&self) -> Snapshot {
      Snapshot {
         autofree: self.options.autofree,
         fetch_mode: self.fetch_mode,
         limit_strategy: self.options.limit_strategy,
         query: self.last_query.clone(),
         parameters: self.last_parameters.clone(),
      }
   }
}

/// Strip one layer of matching quotes that `quote` added around `original`.
fn strip_quotes(quoted: &str, original: &str) -> Option<String> {
   let first = quoted.chars().next().filter(|c| *c == '\'' || *c == '"')?;
   if quoted.len() < 2 || !quoted.ends_with(first) || quoted.len() < original.len() + 2 {
      return None;
   }
   Some(quoted[1..quoted.len() - 1].to_string())
}

fn rtrim(value: &mut JsonValue) {
   if let JsonValue::String(text) = value {
      let trimmed = text.trim_end_matches([' ', '\t', '\n', '\r', '\0', '\x0B']).len();
      text.truncate(trimmed);
   }
}

fn apply_portability(row: &mut Row, portability: Portability) {
   if portability.lowercase {
      if let Row::Assoc(values) = row {
         *values = std::mem::take(values)
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
      }
   }

   if !portability.rtrim && !portability.null_to_empty {
      return;
   }

   let values: Box<dyn Iterator<Item = &mut JsonValue>> = match row {
      Row::Ordered(values) => Box::new(values.iter_mut()),
      Row::Assoc(values) => Box::new(values.values_mut()),
      Row::Object(values) => Box::new(values.values_mut()),
   };
   for value in values {
      if portability.rtrim {
         rtrim(value);
      }
      if portability.null_to_empty && value.is_null() {
         *value = JsonValue::String(String::new());
      }
   }
}

/// A connection to one database through a native backend.
///
/// Cloning is cheap; clones share the same connection and transaction state.
/// Every call serializes on that state and blocks on the backend.
///
/// # Example
///
/// ```no_run
/// use dbal::{Driver, FetchMode, Outcome};
/// use dbal_native::SqliteConnection;
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Driver::new(SqliteConnection::open("app.db", None)?);
///
/// db.query("CREATE TABLE users (id INTEGER, name TEXT)", &[])?;
/// db.query("INSERT INTO users VALUES (?, ?)", &[json!(1), json!("Alice")])?;
///
/// if let Outcome::Fetchable(mut result) = db.query("SELECT * FROM users", &[])? {
///    while let Some(row) = result.fetch_row(FetchMode::Assoc, None)? {
///       println!("{row:?}");
///    }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Driver {
   inner: Arc<Mutex<Connection>>,
}

impl Driver {
   pub fn new<N: NativeConnection + 'static>(native: N) -> Self {
      Self::from_boxed(Box::new(native), DriverOptions::default())
   }

   pub fn with_options<N: NativeConnection + 'static>(native: N, options: DriverOptions) -> Self {
      Self::from_boxed(Box::new(native), options)
   }

   pub fn from_boxed(native: Box<dyn NativeConnection>, options: DriverOptions) -> Self {
      let driver_name = native.driver_name().to_string();
      debug!("driver attached to {} connection", driver_name);

      Self {
         inner: Arc::new(Mutex::new(Connection {
            native: Some(native),
            driver_name,
            autocommit: true,
            transaction_opcount: 0,
            options,
            fetch_mode: FetchMode::Ordered,
            last_query: String::new(),
            last_parameters: Vec::new(),
            last_query_manip: false,
            next_query_manip: false,
            last_execution: None,
            prepared: HashMap::new(),
            next_prepared: 0,
         })),
      }
   }

   pub fn connected(&self) -> bool {
      self.inner.lock().native.is_some()
   }

   /// Drop the native connection; later calls fail with `NoDbSelected`.
   pub fn disconnect(&self) -> bool {
      let mut conn = self.inner.lock();
      conn.last_execution = None;
      conn.native = None;
      debug!("driver disconnected from {}", conn.driver_name);
      true
   }

   /// Backend name the driver was created with, e.g. `"sqlite"`.
   pub fn driver_name(&self) -> String {
      self.inner.lock().driver_name.clone()
   }

   /// `mysql`, `pgsql`, `sqlite` or `unknown`.
   pub fn platform(&self) -> Result<String> {
      self.inner.lock().platform().map(str::to_string)
   }

   pub fn provides(&self, feature: Feature) -> bool {
      !matches!(feature, Feature::Prepare)
   }

   pub fn options(&self) -> DriverOptions {
      self.inner.lock().options.clone()
   }

   pub fn set_options(&self, options: DriverOptions) {
      self.inner.lock().options = options;
   }

   pub fn fetch_mode(&self) -> FetchMode {
      self.inner.lock().fetch_mode
   }

   /// Set the default row shape; [`FetchMode::Default`] means ordered.
   pub fn set_fetch_mode(&self, mode: FetchMode) {
      self.inner.lock().fetch_mode = match mode {
         FetchMode::Default => FetchMode::Ordered,
         other => other,
      };
   }

   /// Turn automatic commits on or off.
   pub fn autocommit(&self, on: bool) -> Result<()> {
      let mut conn = self.inner.lock();
      if conn.transaction_opcount > 0 {
         warn!(
            "autocommit set to {} with {} uncommitted operations",
            on, conn.transaction_opcount
         );
      }
      conn.autocommit = on;
      Ok(())
   }

   pub fn autocommit_enabled(&self) -> bool {
      self.inner.lock().autocommit
   }

   /// Manipulation statements run in the open transaction.
   pub fn transaction_op_count(&self) -> usize {
      self.inner.lock().transaction_opcount
   }

   pub fn in_transaction(&self) -> bool {
      self.transaction_op_count() > 0
   }

   /// Force the classification of the next statement.
   pub fn next_query_is_manip(&self, manip: bool) {
      self.inner.lock().next_query_manip = manip;
   }

   pub fn last_query(&self) -> String {
      self.inner.lock().last_query.clone()
   }

   pub fn last_parameters(&self) -> Vec<JsonValue> {
      self.inner.lock().last_parameters.clone()
   }

   pub(crate) fn record_parameters(&self, query: &str, parameters: &[JsonValue]) {
      let mut conn = self.inner.lock();
      conn.last_query = query.to_string();
      conn.last_parameters = parameters.to_vec();
   }

   pub(crate) fn snapshot(&self) -> Snapshot {
      self.inner.lock().snapshot()
   }

   pub(crate) fn register_prepared(&self, prepared: Prepared) -> PreparedId {
      let mut conn = self.inner.lock();
      let id = conn.next_prepared;
      conn.next_prepared += 1;
      conn.prepared.insert(id, prepared);
      PreparedId(id)
   }

   pub(crate) fn lookup_prepared(&self, id: PreparedId) -> Option<Prepared> {
      self.inner.lock().prepared.get(&id.0).cloned()
   }

   pub(crate) fn remove_prepared(&self, id: PreparedId) -> Option<Prepared> {
      self.inner.lock().prepared.remove(&id.0)
   }

   /// Run `sql` as is.
   ///
   /// Manipulation statements yield [`Outcome::Done`]; anything else hands
   /// back the executed statement.
   pub fn simple_query(&self, sql: &str) -> Result<Outcome<StatementHandle>> {
      self.inner.lock().simple_query(sql)
   }

   pub fn commit(&self) -> Result<()> {
      self.inner.lock().commit()
   }

   pub fn rollback(&self) -> Result<()> {
      self.inner.lock().rollback()
   }

   /// Rows changed by the last statement; 0 when it returned rows.
   pub fn affected_rows(&self) -> Result<u64> {
      self.inner.lock().affected_rows()
   }

   /// Error built from the backend's current fault.
   ///
   /// `kind` overrides the kind translated from the native code.
   pub fn native_error(&self, kind: Option<ErrorKind>) -> Error {
      self.inner.lock().native_error(kind)
   }

   pub(crate) fn last_insert_id(&self) -> Result<u64> {
      let conn = self.inner.lock();
      let Some(id) = conn.native_ref()?.last_insert_id() else {
         return Ok(0);
      };

      let id = id.trim();
      if id.is_empty() {
         return Ok(0);
      }
      id.parse().map_err(|_| {
         Error::new(ErrorKind::Generic).with_userinfo(format!("unparsable last insert id: {id}"))
      })
   }

   pub fn quote_identifier(&self, name: &str) -> String {
      format!("`{}`", name.replace('`', "``"))
   }

   /// Escape `value` for use inside a quoted literal, without the quotes.
   pub fn escape_simple(&self, value: &str) -> Result<String> {
      self.inner.lock().escape_simple(value)
   }

   /// Render `value` as a SQL literal.
   pub fn quote_smart(&self, value: &JsonValue) -> Result<String> {
      self.inner.lock().quote_smart(value)
   }

   pub fn modify_limit_query(&self, sql: &str, offset: usize, count: usize) -> Result<String> {
      self.inner.lock().modify_limit_query(sql, offset, count)
   }

   pub fn table_info<'a>(
      &self,
      source: impl Into<TableSource<'a>>,
      mode: TableInfoMode,
   ) -> Result<TableInfo> {
      self.inner.lock().table_info(source.into(), mode)
   }

   /// Fetch one row from `handle` into `slot`.
   ///
   /// `rownum` selects an absolute row. Portability options are applied to
   /// the fetched row; [`FetchMode::Object`] rows are fetched by name.
   pub fn fetch_into(
      &self,
      handle: &mut StatementHandle,
      slot: &mut Option<Row>,
      mode: FetchMode,
      rownum: Option<usize>,
   ) -> Result<FetchStatus> {
      let (portability, default_mode) = {
         let conn = self.inner.lock();
         (conn.options.portability, conn.fetch_mode)
      };

      let mode = match mode {
         FetchMode::Default => default_mode,
         other => other,
      };
      let style = match mode {
         FetchMode::Ordered | FetchMode::Default => FetchStyle::Numeric,
         FetchMode::Assoc | FetchMode::Object => FetchStyle::Assoc,
      };

      let fetched = match handle.get_statement_mut()? {
         NativeHandle::Object(statement) => statement
            .fetch(style, rownum)
            .map_err(translate::translate)?,
         NativeHandle::Collection(rows) => rows.fetch(style, rownum),
         NativeHandle::Resource { .. } => {
            return Err(self.native_error(Some(ErrorKind::NeedMoreData)));
         }
      };

      let Some(fetched) = fetched else {
         *slot = None;
         return Ok(FetchStatus::Exhausted);
      };

      let mut row = match fetched {
         NativeRow::Numeric(values) => Row::Ordered(values),
         NativeRow::Assoc(values) => Row::Assoc(values),
      };
      apply_portability(&mut row, portability);
      if mode == FetchMode::Object {
         row = row.into_object();
      }

      *slot = Some(row);
      Ok(FetchStatus::Fetched)
   }

   pub fn num_cols(&self, handle: &StatementHandle) -> Result<usize> {
      let cols = match handle.get_statement()? {
         NativeHandle::Object(statement) => statement.column_count(),
         NativeHandle::Collection(rows) => rows.column_count(),
         NativeHandle::Resource { .. } => {
            return Err(self.native_error(Some(ErrorKind::NeedMoreData)));
         }
      };

      if cols == 0 {
         return Err(self.native_error(None));
      }
      Ok(cols)
   }

   pub fn num_rows(&self, handle: &StatementHandle) -> Result<u64> {
      match handle.get_statement()? {
         NativeHandle::Object(statement) => statement
            .row_count()
            .ok_or_else(|| self.native_error(Some(ErrorKind::NotCapable))),
         NativeHandle::Collection(rows) => Ok(rows.len() as u64),
         NativeHandle::Resource { .. } => Err(self.native_error(Some(ErrorKind::NeedMoreData))),
      }
   }

   /// Release the statement in `handle`.
   ///
   /// Fails with [`ErrorKind::NoStatement`] when nothing was held.
   pub fn free_result(&self, handle: &mut StatementHandle) -> Result<()> {
      handle.free_statement()
   }

   pub fn save_config(&self) -> DriverConfig {
      let conn = self.inner.lock();
      DriverConfig {
         fetch_mode: conn.fetch_mode,
         autocommit: conn.autocommit,
         options: conn.options.clone(),
      }
   }

   pub fn restore_config(&self, config: DriverConfig) {
      let mut conn = self.inner.lock();
      conn.fetch_mode = match config.fetch_mode {
         FetchMode::Default => FetchMode::Ordered,
         other => other,
      };
      conn.autocommit = config.autocommit;
      conn.options = config.options;
   }
}

impl fmt::Display for Driver {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let conn = self.inner.lock();
      write!(
         f,
         "dbal::Driver: (phptype={}, dbsyntax={})",
         conn.driver_name,
         platform_of(&conn.driver_name)
      )?;
      if conn.native.is_some() {
         write!(f, " [connected]")?;
      }
      Ok(())
   }
}

impl fmt::Debug for Driver {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let conn = self.inner.lock();
      f.debug_struct("Driver")
         .field("driver_name", &conn.driver_name)
         .field("connected", &conn.native.is_some())
         .field("autocommit", &conn.autocommit)
         .field("transaction_opcount", &conn.transaction_opcount)
         .finish_non_exhaustive()
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use dbal_native::MemoryConnection;
   use serde_json::json;

   #[test]
   fn test_strip_quotes() {
      assert_eq!(strip_quotes("'abc'", "abc"), Some("abc".to_string()));
      assert_eq!(strip_quotes("\"a\"", "a"), Some("a".to_string()));
      assert_eq!(strip_quotes("'it''s'", "it's"), Some("it''s".to_string()));
      assert_eq!(strip_quotes("abc", "abc"), None);
      assert_eq!(strip_quotes("'ab\"", "ab"), None);
      assert_eq!(strip_quotes("'a'", "'a'"), None);
   }

   #[test]
   fn test_apply_portability() {
      let mut row = Row::Assoc(IndexMap::from([
         ("ID".to_string(), json!(1)),
         ("Name".to_string(), json!("padded   ")),
         ("Note".to_string(), json!(null)),
      ]));
      apply_portability(&mut row, Portability::all());

      assert_eq!(row.get_by_name("id"), Some(&json!(1)));
      assert_eq!(row.get_by_name("name"), Some(&json!("padded")));
      assert_eq!(row.get_by_name("note"), Some(&json!("")));
   }

   #[test]
   fn test_rtrim_keeps_leading_space() {
      let mut value = json!(" stoat \t");
      rtrim(&mut value);
      assert_eq!(value, json!(" stoat"));
   }

   #[test]
   fn test_display() {
      let db = Driver::new(MemoryConnection::new("sqlite"));
      assert_eq!(
         db.to_string(),
         "dbal::Driver: (phptype=sqlite, dbsyntax=sqlite) [connected]"
      );

      db.disconnect();
      assert_eq!(db.to_string(), "dbal::Driver: (phptype=sqlite, dbsyntax=sqlite)");
   }

   #[test]
   fn test_platform_of_unknown_backend() {
      let db = Driver::new(MemoryConnection::new("oci8"));
      assert_eq!(db.platform().unwrap(), "unknown");
      assert_eq!(
         db.escape_simple("x").unwrap_err().kind(),
         ErrorKind::Unsupported
      );
   }

   #[test]
   fn test_outcome_helpers() {
      let outcome: Outcome<u8> = Outcome::Fetchable(1);
      assert!(!outcome.is_done());
      assert_eq!(outcome.map(|v| v + 1).fetchable(), Some(2));
      assert!(Outcome::<u8>::Done.fetchable().is_none());
   }
}
