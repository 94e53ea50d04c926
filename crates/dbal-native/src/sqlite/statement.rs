use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use sqlx::Row;

use super::connection::Session;
use super::decode;
use crate::NativeResult;
use crate::backend::{ColumnMeta, FetchStyle, NativeRow, NativeStatement};
use crate::fault::NativeFault;

/// A prepared SQLite statement.
///
/// Statements that produce columns are fully buffered on execute; the cursor
/// then walks the buffer, which also makes absolute row positioning cheap.
/// SQLite cannot tell how many rows a SELECT yields without stepping through
/// it, so `row_count()` only answers for statements without columns.
pub struct SqliteStatement {
   session: Arc<Mutex<Session>>,
   sql: String,
   columns: Vec<ColumnMeta>,
   names: Vec<String>,
   rows: Vec<Vec<JsonValue>>,
   position: usize,
   rows_affected: Option<u64>,
   last_fault: NativeFault,
}

impl SqliteStatement {
   pub(crate) fn new(session: Arc<Mutex<Session>>, sql: String, columns: Vec<ColumnMeta>) -> Self {
      let names = columns.iter().map(|c| c.name.clone()).collect();
      Self {
         session,
         sql,
         columns,
         names,
         rows: Vec::new(),
         position: 0,
         rows_affected: None,
         last_fault: NativeFault::none(),
      }
   }

   pub fn sql(&self) -> &str {
      &self.sql
   }

   fn load_rows(&mut self) -> NativeResult<()> {
      let mut session = self.session.lock();
      let fetched = session.fetch_all(&self.sql)?;

      let mut rows = Vec::with_capacity(fetched.len());
      for row in fetched {
         let mut values = Vec::with_capacity(row.len());
         for i in 0..row.len() {
            let raw = row.try_get_raw(i).map_err(|e| session.fail(e.into()))?;
            values.push(decode::to_json(raw).map_err(|fault| session.fail(fault))?);
         }
         rows.push(values);
      }

      self.rows = rows;
      Ok(())
   }
}

impl NativeStatement for SqliteStatement {
   fn execute(&mut self) -> NativeResult<()> {
      self.rows.clear();
      self.position = 0;
      self.rows_affected = None;

      let outcome = if self.columns.is_empty() {
         let done = self.session.lock().execute(&self.sql);
         done.map(|done| self.rows_affected = Some(done.rows_affected()))
      } else {
         self.load_rows()
      };

      match outcome {
         Ok(()) => {
            self.last_fault = NativeFault::none();
            Ok(())
         }
         Err(fault) => {
            self.last_fault = fault.clone();
            Err(fault)
         }
      }
   }

   fn fetch(&mut self, style: FetchStyle, row: Option<usize>) -> NativeResult<Option<NativeRow>> {
      let index = row.unwrap_or(self.position);
      let Some(values) = self.rows.get(index) else {
         self.position = self.rows.len();
         return Ok(None);
      };

      self.position = index + 1;
      Ok(Some(NativeRow::from_columns(style, &self.names, values)))
   }

   fn column_count(&self) -> usize {
      self.columns.len()
   }

   fn row_count(&self) -> Option<u64> {
      self.rows_affected
   }

   fn column_meta(&self, index: usize) -> Option<ColumnMeta> {
      self.columns.get(index).cloned()
   }

   fn error_info(&self) -> NativeFault {
      self.last_fault.clone()
   }

   fn type_name(&self) -> &'static str {
      "dbal_native::SqliteStatement"
   }
}
