//! Uniform holder for native statement handles

use std::any::Any;
use std::fmt;

use dbal_native::{FetchStyle, NativeRow, NativeStatement};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{Error, ErrorKind, Result};

/// Closure that releases a resource-like handle.
pub type ReleaseFn = Box<dyn FnOnce(Box<dyn Any + Send>) + Send>;

/// Rows that were materialized before they reached the driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedRows {
   columns: Vec<String>,
   rows: Vec<Vec<JsonValue>>,
   position: usize,
}

impl BufferedRows {
   pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
      Self {
         columns,
         rows,
         position: 0,
      }
   }

   /// Build from an array of rows (objects or arrays) or a single object row.
   ///
   /// Returns `None` for scalars and null. Column names come from the first
   /// object row; array rows leave the columns unnamed.
   pub fn from_json(value: JsonValue) -> Option<Self> {
      match value {
         JsonValue::Array(items) => {
            let columns = match items.first() {
               Some(JsonValue::Object(first)) => first.keys().cloned().collect(),
               _ => Vec::new(),
            };

            let rows = items
               .into_iter()
               .map(|item| match item {
                  JsonValue::Object(mut map) if !columns.is_empty() => columns
                     .iter()
                     .map(|name| map.remove(name).unwrap_or(JsonValue::Null))
                     .collect(),
                  JsonValue::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
                  JsonValue::Array(values) => values,
                  scalar => vec![scalar],
               })
               .collect();

            Some(Self::new(columns, rows))
         }
         JsonValue::Object(map) => {
            let (columns, values) = map.into_iter().unzip();
            Some(Self::new(columns, vec![values]))
         }
         _ => None,
      }
   }

   pub fn columns(&self) -> &[String] {
      &self.columns
   }

   pub fn len(&self) -> usize {
      self.rows.len()
   }

   pub fn is_empty(&self) -> bool {
      self.rows.is_empty()
   }

   /// Column count, taken from the first row when columns are unnamed.
   pub fn column_count(&self) -> usize {
      if self.columns.is_empty() {
         self.rows.first().map_or(0, Vec::len)
      } else {
         self.columns.len()
      }
   }

   /// Next row, or the row at absolute position `row`.
   ///
   /// Unnamed columns are keyed by their position in `Assoc` style.
   pub fn fetch(&mut self, style: FetchStyle, row: Option<usize>) -> Option<NativeRow> {
      let index = row.unwrap_or(self.position);
      let values = self.rows.get(index)?;
      self.position = index + 1;

      let names = if self.columns.is_empty() {
         (0..values.len()).map(|i| i.to_string()).collect()
      } else {
         self.columns.clone()
      };
      Some(NativeRow::from_columns(style, &names, values))
   }
}

/// The native handle itself, in one of the shapes a backend may produce.
pub enum NativeHandle {
   /// A prepared native statement object
   Object(Box<dyn NativeStatement>),
   /// Rows that are already in memory
   Collection(BufferedRows),
   /// An opaque handle, optionally with the closure that releases it
   Resource {
      handle: Box<dyn Any + Send>,
      release: Option<ReleaseFn>,
   },
}

impl NativeHandle {
   pub fn resource(handle: Box<dyn Any + Send>, release: Option<ReleaseFn>) -> Self {
      NativeHandle::Resource { handle, release }
   }

   fn release(self) {
      if let NativeHandle::Resource {
         handle,
         release: Some(release),
      } = self
      {
         release(handle);
      }
   }
}

impl fmt::Debug for NativeHandle {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         NativeHandle::Object(statement) => {
            f.debug_tuple("Object").field(&statement.type_name()).finish()
         }
         NativeHandle::Collection(rows) => f.debug_tuple("Collection").field(&rows.len()).finish(),
         NativeHandle::Resource { release, .. } => f
            .debug_struct("Resource")
            .field("has_release", &release.is_some())
            .finish_non_exhaustive(),
      }
   }
}

impl From<Box<dyn NativeStatement>> for NativeHandle {
   fn from(statement: Box<dyn NativeStatement>) -> Self {
      NativeHandle::Object(statement)
   }
}

impl From<BufferedRows> for NativeHandle {
   fn from(rows: BufferedRows) -> Self {
      NativeHandle::Collection(rows)
   }
}

impl TryFrom<JsonValue> for NativeHandle {
   type Error = Error;

   /// Arrays and objects become a [`NativeHandle::Collection`]; anything
   /// else fails with [`ErrorKind::UnhandledType`].
   fn try_from(value: JsonValue) -> Result<Self> {
      BufferedRows::from_json(value)
         .map(NativeHandle::Collection)
         .ok_or_else(|| Error::new(ErrorKind::UnhandledType))
   }
}

/// Shape of the handle held by a [`StatementHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
   Object,
   Collection,
   Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatementType {
   pub kind: StatementKind,
   /// Concrete statement type, for object handles
   pub type_name: Option<&'static str>,
}

/// Owns at most one native statement handle.
///
/// A handle still held when this is dropped is freed the same way
/// [`StatementHandle::free_statement`] would.
#[derive(Debug, Default)]
pub struct StatementHandle {
   handle: Option<NativeHandle>,
}

impl StatementHandle {
   pub fn new(handle: impl Into<NativeHandle>) -> Self {
      Self {
         handle: Some(handle.into()),
      }
   }

   pub fn empty() -> Self {
      Self::default()
   }

   /// Store `handle`, freeing any handle held before.
   pub fn set_statement(&mut self, handle: impl Into<NativeHandle>) {
      if let Some(previous) = self.handle.replace(handle.into()) {
         previous.release();
      }
   }

   /// Store a dynamically shaped handle; scalars and null are rejected.
   pub fn set_statement_value(&mut self, value: JsonValue) -> Result<()> {
      let handle = NativeHandle::try_from(value)?;
      self.set_statement(handle);
      Ok(())
   }

   pub fn get_statement(&self) -> Result<&NativeHandle> {
      self.handle
         .as_ref()
         .ok_or_else(|| Error::new(ErrorKind::NoStatement))
   }

   pub fn get_statement_mut(&mut self) -> Result<&mut NativeHandle> {
      self.handle
         .as_mut()
         .ok_or_else(|| Error::new(ErrorKind::NoStatement))
   }

   /// Release the held handle.
   ///
   /// Resource handles go through their release closure when they have one.
   pub fn free_statement(&mut self) -> Result<()> {
      let handle = self
         .handle
         .take()
         .ok_or_else(|| Error::new(ErrorKind::NoStatement))?;
      handle.release();
      Ok(())
   }

   pub fn statement_type(&self) -> Result<StatementType> {
      let statement_type = match self.get_statement()? {
         NativeHandle::Object(statement) => StatementType {
            kind: StatementKind::Object,
            type_name: Some(statement.type_name()),
         },
         NativeHandle::Collection(_) => StatementType {
            kind: StatementKind::Collection,
            type_name: None,
         },
         NativeHandle::Resource { .. } => StatementType {
            kind: StatementKind::Resource,
            type_name: None,
         },
      };
      Ok(statement_type)
   }

   pub fn is_set(&self) -> bool {
      self.handle.is_some()
   }
}

impl Drop for StatementHandle {
   fn drop(&mut self) {
      if let Some(handle) = self.handle.take() {
         handle.release();
      }
   }
}
