//! Parameterized queries and convenience fetchers

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::config::{FetchMode, LimitStrategy};
use crate::driver::{Driver, Outcome};
use crate::error::{Error, ErrorKind, Result};
use crate::result::QueryResult;
use crate::row::Row;
use crate::sql;

/// Column selector for [`Driver::get_col`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
   Index(usize),
   Name(String),
}

impl From<usize> for ColumnRef {
   fn from(index: usize) -> Self {
      ColumnRef::Index(index)
   }
}

impl From<&str> for ColumnRef {
   fn from(name: &str) -> Self {
      ColumnRef::Name(name.to_string())
   }
}

impl From<String> for ColumnRef {
   fn from(name: String) -> Self {
      ColumnRef::Name(name)
   }
}

/// Objects [`Driver::get_list_of`] can enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
   Tables,
   Users,
   Databases,
}

impl Driver {
   /// Run `sql`, substituting `params` into its placeholders.
   ///
   /// `?` takes a quoted literal ([`Driver::quote_smart`]), `!` takes the
   /// parameter text verbatim, `&` takes the quoted contents of the file the
   /// parameter names. `\?`, `\!` and `\&` are literal characters. Without
   /// parameters the text runs untouched. The result cursor records the
   /// template and the parameters.
   pub fn query(&self, sql: &str, params: &[JsonValue]) -> Result<Outcome<QueryResult>> {
      if params.is_empty() {
         return self.run_bound(sql, sql, params);
      }

      let bound = sql::bind(sql, params, |value| self.quote_smart(value))?;
      self.run_bound(sql, &bound, params)
   }

   /// Run `bound`, recording `template` and `params` for the cursor.
   pub(crate) fn run_bound(
      &self,
      template: &str,
      bound: &str,
      params: &[JsonValue],
   ) -> Result<Outcome<QueryResult>> {
      let outcome = self.simple_query(bound)?;
      self.record_parameters(template, params);
      Ok(outcome.map(|handle| QueryResult::new(self.clone(), handle)))
   }

   /// Run `sql` and restrict the result to `count` rows starting at `offset`.
   ///
   /// Under [`LimitStrategy::Alter`] the query gets a `LIMIT` clause; under
   /// [`LimitStrategy::Emulate`] it runs unchanged and the cursor picks the
   /// window rows by position.
   pub fn limit_query(
      &self,
      sql: &str,
      offset: usize,
      count: usize,
      params: &[JsonValue],
   ) -> Result<Outcome<QueryResult>> {
      let sql = match self.options().limit_strategy {
         LimitStrategy::Alter => self.modify_limit_query(sql, offset, count)?,
         LimitStrategy::Emulate => sql.to_string(),
      };

      let outcome = self.query(&sql, params)?;
      Ok(outcome.map(|mut result| {
         result.set_limit(offset, count);
         result
      }))
   }

   fn fetchable(&self, sql: &str, params: &[JsonValue]) -> Result<Option<QueryResult>> {
      Ok(self.query(sql, params)?.fetchable())
   }

   /// First column of the first row.
   pub fn get_one(&self, sql: &str, params: &[JsonValue]) -> Result<Option<JsonValue>> {
      let Some(mut result) = self.fetchable(sql, params)? else {
         return Ok(None);
      };

      let row = result.fetch_row(FetchMode::Ordered, None)?;
      if !result.is_freed() {
         result.free()?;
      }
      Ok(row.and_then(|row| row.into_values().into_iter().next()))
   }

   /// First row.
   pub fn get_row(&self, sql: &str, params: &[JsonValue], mode: FetchMode) -> Result<Option<Row>> {
      let Some(mut result) = self.fetchable(sql, params)? else {
         return Ok(None);
      };

      let row = result.fetch_row(mode, None)?;
      if !result.is_freed() {
         result.free()?;
      }
      Ok(row)
   }

   /// One column of every row, by position or by name.
   ///
   /// Fails with [`ErrorKind::NoSuchField`] when a row lacks the column.
   pub fn get_col(
      &self,
      sql: &str,
      column: impl Into<ColumnRef>,
      params: &[JsonValue],
   ) -> Result<Vec<JsonValue>> {
      let Some(mut result) = self.fetchable(sql, params)? else {
         return Ok(Vec::new());
      };

      let column = column.into();
      let mode = match column {
         ColumnRef::Index(_) => FetchMode::Ordered,
         ColumnRef::Name(_) => FetchMode::Assoc,
      };

      let mut values = Vec::new();
      while let Some(row) = result.fetch_row(mode, None)? {
         let value = match &column {
            ColumnRef::Index(index) => row.get(*index),
            ColumnRef::Name(name) => row.get_by_name(name),
         };
         match value {
            Some(value) => values.push(value.clone()),
            None => {
               return Err(Error::new(ErrorKind::NoSuchField)
                  .with_userinfo(format!("{column:?} not in result")));
            }
         }
      }

      Ok(values)
   }

   /// Every row.
   pub fn get_all(&self, sql: &str, params: &[JsonValue], mode: FetchMode) -> Result<Vec<Row>> {
      let Some(mut result) = self.fetchable(sql, params)? else {
         return Ok(Vec::new());
      };

      let mut rows = Vec::new();
      while let Some(row) = result.fetch_row(mode, None)? {
         rows.push(row);
      }
      Ok(rows)
   }

   /// Every row keyed by its first column.
   ///
   /// With exactly two columns and no `force_array` the value is the second
   /// column. Otherwise it is the rest of the row in `mode` shape; object
   /// rows keep the key column. With `group` every key maps to the array of
   /// its values, otherwise later rows replace earlier ones. Fewer than two
   /// columns fail with [`ErrorKind::Truncated`].
   pub fn get_assoc(
      &self,
      sql: &str,
      force_array: bool,
      params: &[JsonValue],
      mode: FetchMode,
      group: bool,
   ) -> Result<IndexMap<String, JsonValue>> {
      let Some(mut result) = self.fetchable(sql, params)? else {
         return Ok(IndexMap::new());
      };

      let cols = result.num_cols().unwrap_or(0);
      if cols < 2 {
         return Err(Error::new(ErrorKind::Truncated)
            .with_userinfo(format!("{cols} columns, keyed rows need at least 2")));
      }

      let scalar = cols == 2 && !force_array;
      let mode = if scalar { FetchMode::Ordered } else { mode };

      let mut pairs = Vec::new();
      while let Some(row) = result.fetch_row(mode, None)? {
         pairs.push(split_key(row, scalar));
      }
      if !result.is_freed() {
         result.free()?;
      }

      if !group {
         return Ok(pairs.into_iter().collect());
      }

      let mut groups: IndexMap<String, Vec<JsonValue>> = IndexMap::new();
      for (key, value) in pairs {
         groups.entry(key).or_default().push(value);
      }
      Ok(groups
         .into_iter()
         .map(|(key, values)| (key, JsonValue::Array(values)))
         .collect())
   }

   /// Every row, transposed into one array of values per column.
   pub fn get_all_flipped(
      &self,
      sql: &str,
      params: &[JsonValue],
   ) -> Result<IndexMap<String, Vec<JsonValue>>> {
      let mut columns: IndexMap<String, Vec<JsonValue>> = IndexMap::new();
      for row in self.get_all(sql, params, FetchMode::Assoc)? {
         if let Row::Assoc(values) = row {
            for (name, value) in values {
               columns.entry(name).or_default().push(value);
            }
         }
      }
      Ok(columns)
   }

   /// List tables, users or databases. MySQL only.
   pub fn get_list_of(&self, kind: ListKind) -> Result<Vec<JsonValue>> {
      if self.platform()? != "mysql" {
         return Err(self.native_error(Some(ErrorKind::Unsupported)));
      }

      let sql = match kind {
         ListKind::Tables => "SHOW TABLES",
         ListKind::Users => "SELECT DISTINCT User FROM mysql.user",
         ListKind::Databases => "SHOW DATABASES",
      };
      self.get_col(sql, ColumnRef::Index(0), &[])
   }
}

/// Key text of a `get_assoc` row
fn key_text(value: &JsonValue) -> String {
   match value {
      JsonValue::String(text) => text.clone(),
      JsonValue::Null => String::new(),
      other => other.to_string(),
   }
}

fn split_key(row: Row, scalar: bool) -> (String, JsonValue) {
   match row {
      Row::Ordered(values) => {
         let mut values = values.into_iter();
         let key = values.next().unwrap_or_default();
         let value = if scalar {
            values.next().unwrap_or_default()
         } else {
            JsonValue::Array(values.collect())
         };
         (key_text(&key), value)
      }
      Row::Assoc(mut values) => {
         let key = values
            .shift_remove_index(0)
            .map(|(_, value)| value)
            .unwrap_or_default();
         let value = if scalar {
            values.into_values().next().unwrap_or_default()
         } else {
            Row::Assoc(values).into_json()
         };
         (key_text(&key), value)
      }
      Row::Object(values) => {
         let key = values.values().next().cloned().unwrap_or_default();
         let value = if scalar {
            values.values().nth(1).cloned().unwrap_or_default()
         } else {
            JsonValue::Object(values)
         };
         (key_text(&key), value)
      }
   }
}
