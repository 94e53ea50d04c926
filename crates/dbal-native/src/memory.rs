//! Scripted in-memory backend
//!
//! [`MemoryConnection`] answers every statement from a script registered up
//! front, keyed by the exact SQL text. Unscripted statements succeed with no
//! columns and zero affected rows. A [`MemoryProbe`] obtained before the
//! connection is handed away records what the layer above did with it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::NativeResult;
use crate::backend::{
   ColumnMeta, FetchStyle, NativeConnection, NativeRow, NativeStatement, StatementOptions,
};
use crate::fault::NativeFault;

#[derive(Debug, Clone, Default)]
struct Scripted {
   columns: Vec<ColumnMeta>,
   rows: Vec<Vec<JsonValue>>,
   affected: u64,
   execute_fault: Option<NativeFault>,
}

#[derive(Debug, Default)]
struct Recorder {
   prepared: Vec<(String, StatementOptions)>,
   executed: Vec<String>,
   begin_calls: usize,
   commit_calls: usize,
   rollback_calls: usize,
   last_insert_id: Option<String>,
   last_fault: NativeFault,
}

/// A backend that replays canned results.
///
/// # Example
///
/// ```
/// use dbal_native::{FetchStyle, MemoryConnection, NativeConnection, NativeRow};
/// use serde_json::json;
///
/// let mut conn = MemoryConnection::new("mysql")
///    .with_rows("SELECT id FROM t", &["id"], vec![vec![json!(1)], vec![json!(2)]]);
///
/// let mut stmt = conn.prepare("SELECT id FROM t", &Default::default()).unwrap();
/// stmt.execute().unwrap();
/// assert_eq!(
///    stmt.fetch(FetchStyle::Numeric, None).unwrap(),
///    Some(NativeRow::Numeric(vec![json!(1)]))
/// );
/// ```
pub struct MemoryConnection {
   driver_name: String,
   scripts: HashMap<String, Scripted>,
   prepare_faults: HashMap<String, NativeFault>,
   begin_fault: Option<NativeFault>,
   commit_fault: Option<NativeFault>,
   rollback_fault: Option<NativeFault>,
   quoting: bool,
   report_row_counts: bool,
   recorder: Arc<Mutex<Recorder>>,
}

impl MemoryConnection {
   pub fn new(driver_name: impl Into<String>) -> Self {
      Self {
         driver_name: driver_name.into(),
         scripts: HashMap::new(),
         prepare_faults: HashMap::new(),
         begin_fault: None,
         commit_fault: None,
         rollback_fault: None,
         quoting: true,
         report_row_counts: false,
         recorder: Arc::new(Mutex::new(Recorder::default())),
      }
   }

   fn script(&mut self, sql: &str) -> &mut Scripted {
      self.scripts.entry(sql.to_string()).or_default()
   }

   /// Answer `sql` with a result set of plain named columns.
   pub fn with_rows(mut self, sql: &str, columns: &[&str], rows: Vec<Vec<JsonValue>>) -> Self {
      let columns = columns.iter().map(|name| ColumnMeta::named(*name)).collect();
      self.with_columns(sql, columns, rows)
   }

   /// Answer `sql` with a result set described by full column metadata.
   pub fn with_columns(
      mut self,
      sql: &str,
      columns: Vec<ColumnMeta>,
      rows: Vec<Vec<JsonValue>>,
   ) -> Self {
      let script = self.script(sql);
      script.columns = columns;
      script.rows = rows;
      self
   }

   /// Report `affected` rows when `sql` executes.
   pub fn with_affected_rows(mut self, sql: &str, affected: u64) -> Self {
      self.script(sql).affected = affected;
      self
   }

   /// Fail preparing `sql`.
   pub fn with_prepare_fault(mut self, sql: &str, fault: NativeFault) -> Self {
      self.prepare_faults.insert(sql.to_string(), fault);
      self
   }

   /// Prepare `sql` fine but fail executing it.
   pub fn with_execute_fault(mut self, sql: &str, fault: NativeFault) -> Self {
      self.script(sql).execute_fault = Some(fault);
      self
   }

   pub fn with_begin_fault(mut self, fault: NativeFault) -> Self {
      self.begin_fault = Some(fault);
      self
   }

   pub fn with_commit_fault(mut self, fault: NativeFault) -> Self {
      self.commit_fault = Some(fault);
      self
   }

   pub fn with_rollback_fault(mut self, fault: NativeFault) -> Self {
      self.rollback_fault = Some(fault);
      self
   }

   /// Behave like a backend with no quoting primitive.
   pub fn without_quoting(mut self) -> Self {
      self.quoting = false;
      self
   }

   pub fn with_last_insert_id(self, id: impl Into<String>) -> Self {
      self.recorder.lock().last_insert_id = Some(id.into());
      self
   }

   /// Report the size of scripted result sets from `row_count()`.
   ///
   /// Without this, reads answer `None` like a streaming client does.
   pub fn reporting_row_counts(mut self) -> Self {
      self.report_row_counts = true;
      self
   }

   /// A handle onto what this connection records.
   pub fn probe(&self) -> MemoryProbe {
      MemoryProbe {
         recorder: Arc::clone(&self.recorder),
      }
   }

   fn fail(&self, fault: NativeFault) -> NativeFault {
      self.recorder.lock().last_fault = fault.clone();
      fault
   }

   fn transaction_call(&self, fault: &Option<NativeFault>) -> NativeResult<()> {
      match fault {
         Some(fault) => Err(self.fail(fault.clone())),
         None => {
            self.recorder.lock().last_fault = NativeFault::none();
            Ok(())
         }
      }
   }

   fn quote_mysql(value: &str) -> String {
      let mut quoted = String::with_capacity(value.len() + 2);
      quoted.push('\'');
      for ch in value.chars() {
         match ch {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '"' => quoted.push_str("\\\""),
            '\0' => quoted.push_str("\\0"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\x1a' => quoted.push_str("\\Z"),
            other => quoted.push(other),
         }
      }
      quoted.push('\'');
      quoted
   }
}

impl NativeConnection for MemoryConnection {
   fn driver_name(&self) -> &str {
      &self.driver_name
   }

   fn prepare(
      &mut self,
      sql: &str,
      options: &StatementOptions,
   ) -> NativeResult<Box<dyn NativeStatement>> {
      trace!("memory prepare: {}", sql);
      self
         .recorder
         .lock()
         .prepared
         .push((sql.to_string(), *options));

      if let Some(fault) = self.prepare_faults.get(sql) {
         return Err(self.fail(fault.clone()));
      }

      let script = self.scripts.get(sql).cloned().unwrap_or_default();
      Ok(Box::new(MemoryStatement {
         sql: sql.to_string(),
         script,
         position: 0,
         executed: false,
         report_row_counts: self.report_row_counts,
         recorder: Arc::clone(&self.recorder),
         last_fault: NativeFault::none(),
      }))
   }

   fn begin_transaction(&mut self) -> NativeResult<()> {
      self.recorder.lock().begin_calls += 1;
      self.transaction_call(&self.begin_fault)
   }

   fn commit(&mut self) -> NativeResult<()> {
      self.recorder.lock().commit_calls += 1;
      self.transaction_call(&self.commit_fault)
   }

   fn roll_back(&mut self) -> NativeResult<()> {
      self.recorder.lock().rollback_calls += 1;
      self.transaction_call(&self.rollback_fault)
   }

   fn quote(&self, value: &str) -> Option<String> {
      if !self.quoting {
         return None;
      }
      if self.driver_name == "mysql" {
         Some(Self::quote_mysql(value))
      } else {
         Some(format!("'{}'", value.replace('\'', "''")))
      }
   }

   fn error_info(&self) -> NativeFault {
      self.recorder.lock().last_fault.clone()
   }

   fn last_insert_id(&self) -> Option<String> {
      self.recorder.lock().last_insert_id.clone()
   }
}

/// Statement prepared by a [`MemoryConnection`]
pub struct MemoryStatement {
   sql: String,
   script: Scripted,
   position: usize,
   executed: bool,
   report_row_counts: bool,
   recorder: Arc<Mutex<Recorder>>,
   last_fault: NativeFault,
}

impl NativeStatement for MemoryStatement {
   fn execute(&mut self) -> NativeResult<()> {
      let mut recorder = self.recorder.lock();
      recorder.executed.push(self.sql.clone());

      if let Some(fault) = &self.script.execute_fault {
         recorder.last_fault = fault.clone();
         self.last_fault = fault.clone();
         return Err(fault.clone());
      }

      recorder.last_fault = NativeFault::none();
      self.last_fault = NativeFault::none();
      self.position = 0;
      self.executed = true;
      Ok(())
   }

   fn fetch(&mut self, style: FetchStyle, row: Option<usize>) -> NativeResult<Option<NativeRow>> {
      if !self.executed {
         return Ok(None);
      }

      let index = row.unwrap_or(self.position);
      let Some(values) = self.script.rows.get(index) else {
         self.position = self.script.rows.len();
         return Ok(None);
      };

      self.position = index + 1;
      let names = self
         .script
         .columns
         .iter()
         .map(|c| c.name.clone())
         .collect::<Vec<_>>();
      Ok(Some(NativeRow::from_columns(style, &names, values)))
   }

   fn column_count(&self) -> usize {
      self.script.columns.len()
   }

   fn row_count(&self) -> Option<u64> {
      if self.script.columns.is_empty() {
         Some(self.script.affected)
      } else if self.report_row_counts {
         Some(self.script.rows.len() as u64)
      } else {
         None
      }
   }

   fn column_meta(&self, index: usize) -> Option<ColumnMeta> {
      self.script.columns.get(index).cloned()
   }

   fn error_info(&self) -> NativeFault {
      self.last_fault.clone()
   }

   fn type_name(&self) -> &'static str {
      "dbal_native::MemoryStatement"
   }
}

/// Read side of a [`MemoryConnection`]'s recorder.
#[derive(Clone)]
pub struct MemoryProbe {
   recorder: Arc<Mutex<Recorder>>,
}

impl MemoryProbe {
   pub fn begin_calls(&self) -> usize {
      self.recorder.lock().begin_calls
   }

   pub fn commit_calls(&self) -> usize {
      self.recorder.lock().commit_calls
   }

   pub fn rollback_calls(&self) -> usize {
      self.recorder.lock().rollback_calls
   }

   /// SQL text of every statement executed, in order
   pub fn executed(&self) -> Vec<String> {
      self.recorder.lock().executed.clone()
   }

   /// SQL text and options of every prepare call, in order
   pub fn prepared(&self) -> Vec<(String, StatementOptions)> {
      self.recorder.lock().prepared.clone()
   }

   pub fn set_last_insert_id(&self, id: impl Into<String>) {
      self.recorder.lock().last_insert_id = Some(id.into());
   }
}
