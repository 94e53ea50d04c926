//! The contract every native backend implements

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::NativeResult;
use crate::fault::NativeFault;

/// How a native statement should shape the next row it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStyle {
   /// Values in column order
   Numeric,
   /// Values keyed by column name
   Assoc,
}

/// A single row as materialized by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeRow {
   Numeric(Vec<JsonValue>),
   Assoc(IndexMap<String, JsonValue>),
}

impl NativeRow {
   pub fn len(&self) -> usize {
      match self {
         NativeRow::Numeric(values) => values.len(),
         NativeRow::Assoc(values) => values.len(),
      }
   }

   pub fn is_empty(&self) -> bool {
      self.len() == 0
   }

   /// Build a row in the requested style from parallel name/value slices.
   ///
   /// Duplicate column names collapse onto the last value in `Assoc` style.
   pub fn from_columns(style: FetchStyle, names: &[String], values: &[JsonValue]) -> Self {
      match style {
         FetchStyle::Numeric => NativeRow::Numeric(values.to_vec()),
         FetchStyle::Assoc => NativeRow::Assoc(
            names
               .iter()
               .cloned()
               .zip(values.iter().cloned())
               .collect(),
         ),
      }
   }
}

/// Column metadata reported by a prepared statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
   /// Originating table, empty when the backend cannot tell
   pub table: String,
   pub name: String,
   /// Declared/native type name, if known
   pub native_type: Option<String>,
   /// Column length, -1 when unknown
   pub len: i64,
   pub flags: Vec<String>,
}

impl ColumnMeta {
   pub fn named(name: impl Into<String>) -> Self {
      Self {
         name: name.into(),
         len: -1,
         ..Default::default()
      }
   }

   pub fn with_table(mut self, table: impl Into<String>) -> Self {
      self.table = table.into();
      self
   }

   pub fn with_native_type(mut self, native_type: impl Into<String>) -> Self {
      self.native_type = Some(native_type.into());
      self
   }
}

/// Hints passed to [`NativeConnection::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementOptions {
   /// Buffer the full result set client side (MySQL style buffered query)
   pub buffered: bool,
}

impl Default for StatementOptions {
   fn default() -> Self {
      Self { buffered: true }
   }
}

/// A connected native client handle.
///
/// Implementations own their sockets/files; the layer above only ever
/// receives one that is already connected.
pub trait NativeConnection: Send {
   /// Backend name, e.g. `"sqlite"`, `"mysql"`, `"pgsql"`
   fn driver_name(&self) -> &str;

   /// Prepare a statement. Syntax and unknown-object faults may surface here.
   fn prepare(
      &mut self,
      sql: &str,
      options: &StatementOptions,
   ) -> NativeResult<Box<dyn NativeStatement>>;

   fn begin_transaction(&mut self) -> NativeResult<()>;

   fn commit(&mut self) -> NativeResult<()>;

   fn roll_back(&mut self) -> NativeResult<()>;

   /// Quote a string literal the way the backend does, including the
   /// surrounding quote characters. `None` when the backend has no quoting
   /// primitive.
   fn quote(&self, value: &str) -> Option<String>;

   /// Fault triplet of the most recent connection level operation.
   fn error_info(&self) -> NativeFault;

   /// Id generated by the most recent insert, as the backend reports it.
   fn last_insert_id(&self) -> Option<String>;
}

/// A prepared native statement and, once executed, its result set.
pub trait NativeStatement: Send {
   fn execute(&mut self) -> NativeResult<()>;

   /// Next row, or the row at absolute position `row` when given.
   /// `Ok(None)` signals end of data.
   fn fetch(&mut self, style: FetchStyle, row: Option<usize>) -> NativeResult<Option<NativeRow>>;

   fn column_count(&self) -> usize;

   /// Rows affected by a manipulation, or rows in the result set when the
   /// backend can report it. `None` when it cannot.
   fn row_count(&self) -> Option<u64>;

   fn column_meta(&self, index: usize) -> Option<ColumnMeta>;

   /// Fault triplet of the most recent operation on this statement.
   fn error_info(&self) -> NativeFault;

   /// Concrete statement type name, for introspection.
   fn type_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[test]
   fn test_native_row_from_columns() {
      let names = vec!["id".to_string(), "name".to_string()];
      let values = vec![json!(1), json!("a")];

      let numeric = NativeRow::from_columns(FetchStyle::Numeric, &names, &values);
      assert_eq!(numeric, NativeRow::Numeric(vec![json!(1), json!("a")]));

      let NativeRow::Assoc(map) = NativeRow::from_columns(FetchStyle::Assoc, &names, &values)
      else {
         panic!("expected assoc row");
      };
      assert_eq!(map.get("name"), Some(&json!("a")));
      assert_eq!(map.get_index(0).map(|(k, _)| k.as_str()), Some("id"));
   }

   #[test]
   fn test_duplicate_names_collapse() {
      let names = vec!["x".to_string(), "x".to_string()];
      let values = vec![json!(1), json!(2)];
      let row = NativeRow::from_columns(FetchStyle::Assoc, &names, &values);
      assert_eq!(row.len(), 1);
   }
}
