//! Emulated prepared statements and generated INSERT/UPDATE statements

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::driver::{Driver, Outcome};
use crate::error::{Error, ErrorKind, Result};
use crate::result::QueryResult;
use crate::sql::{self, Token};

/// Handle to a template registered with [`Driver::prepare`].
///
/// Valid until [`Driver::free_prepared`]; using it afterwards fails with
/// [`ErrorKind::NoStatement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreparedId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) struct Prepared {
   pub template: String,
   pub tokens: Vec<Token>,
}

/// Statement [`Driver::auto_prepare`] generates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoMode {
   /// `INSERT INTO t (a,b) VALUES (?,?)`
   #[default]
   Insert,
   /// `UPDATE t SET a = ?,b = ? WHERE ...`
   Update,
}

impl Driver {
   /// Register `template` for repeated execution.
   ///
   /// The template uses the placeholders [`Driver::query`] understands; it is
   /// tokenized once and bound on every [`Driver::execute`].
   pub fn prepare(&self, template: &str) -> PreparedId {
      let id = self.register_prepared(Prepared {
         template: template.to_string(),
         tokens: sql::tokenize(template),
      });
      debug!("prepared statement {:?}: {}", id, template);
      id
   }

   /// Template text behind `id`.
   pub fn prepared_query(&self, id: PreparedId) -> Result<String> {
      Ok(self.prepared(id)?.template)
   }

   fn prepared(&self, id: PreparedId) -> Result<Prepared> {
      self
         .lookup_prepared(id)
         .ok_or_else(|| Error::new(ErrorKind::NoStatement).with_userinfo(format!("{id:?} was freed")))
   }

   /// Bind `params` into the prepared template and run it.
   ///
   /// A parameter count that does not match the template fails with
   /// [`ErrorKind::Mismatch`] before anything reaches the backend.
   pub fn execute(&self, id: PreparedId, params: &[JsonValue]) -> Result<Outcome<QueryResult>> {
      let prepared = self.prepared(id)?;
      let bound = sql::bind_tokens(&prepared.tokens, params, |value| self.quote_smart(value))?;
      self.run_bound(&prepared.template, &bound, params)
   }

   /// Run the prepared template once per parameter set.
   ///
   /// Stops at the first failing set; earlier sets stay executed. Result
   /// sets are released as they come back.
   pub fn execute_multiple(&self, id: PreparedId, sets: &[Vec<JsonValue>]) -> Result<()> {
      for params in sets {
         if let Outcome::Fetchable(mut result) = self.execute(id, params)?
            && !result.is_freed()
         {
            result.free()?;
         }
      }
      Ok(())
   }

   /// Forget the template behind `id`.
   pub fn free_prepared(&self, id: PreparedId) -> Result<()> {
      self
         .remove_prepared(id)
         .map(|_| ())
         .ok_or_else(|| Error::new(ErrorKind::NoStatement).with_userinfo(format!("{id:?} was freed")))
   }

   /// Build an `INSERT` or `UPDATE` for `fields` with one `?` per field.
   ///
   /// No fields fail with [`ErrorKind::NeedMoreData`]. An `UPDATE` without a
   /// `WHERE` clause fails with [`ErrorKind::UnintendedConsequences`] unless
   /// the `allow_unfiltered_updates` option is on.
   pub fn build_manip_sql(
      &self,
      table: &str,
      fields: &[&str],
      mode: AutoMode,
      where_clause: Option<&str>,
   ) -> Result<String> {
      if fields.is_empty() {
         return Err(Error::new(ErrorKind::NeedMoreData).with_userinfo("no fields to set"));
      }

      match mode {
         AutoMode::Insert => {
            let placeholders = vec!["?"; fields.len()].join(",");
            Ok(format!(
               "INSERT INTO {table} ({}) VALUES ({placeholders})",
               fields.join(",")
            ))
         }
         AutoMode::Update => {
            let assignments = fields
               .iter()
               .map(|field| format!("{field} = ?"))
               .collect::<Vec<_>>()
               .join(",");
            let mut sql = format!("UPDATE {table} SET {assignments}");

            match where_clause.map(str::trim).filter(|clause| !clause.is_empty()) {
               Some(clause) => {
                  sql.push_str(" WHERE ");
                  sql.push_str(clause);
               }
               None if self.options().allow_unfiltered_updates => {}
               None => {
                  return Err(Error::new(ErrorKind::UnintendedConsequences)
                     .with_userinfo(format!("UPDATE of {table} without a WHERE clause")));
               }
            }
            Ok(sql)
         }
      }
   }

   /// [`Driver::build_manip_sql`] followed by [`Driver::prepare`].
   pub fn auto_prepare(
      &self,
      table: &str,
      fields: &[&str],
      mode: AutoMode,
      where_clause: Option<&str>,
   ) -> Result<PreparedId> {
      let sql = self.build_manip_sql(table, fields, mode, where_clause)?;
      Ok(self.prepare(&sql))
   }

   /// Insert or update one row from `values`, keyed by column name.
   ///
   /// The generated statement is freed again whether or not it ran.
   pub fn auto_execute(
      &self,
      table: &str,
      values: &IndexMap<String, JsonValue>,
      mode: AutoMode,
      where_clause: Option<&str>,
   ) -> Result<Outcome<QueryResult>> {
      let fields: Vec<&str> = values.keys().map(String::as_str).collect();
      let id = self.auto_prepare(table, &fields, mode, where_clause)?;

      let params: Vec<JsonValue> = values.values().cloned().collect();
      let outcome = self.execute(id, &params);
      self.free_prepared(id)?;
      outcome
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::config::DriverOptions;
   use dbal_native::{MemoryConnection, NativeFault};
   use serde_json::json;

   const TABLE: &str = "my_awesome_table";

   #[test]
   fn test_prepare_and_execute() {
      let conn = MemoryConnection::new("mysql").with_rows(
         "SELECT foo FROM bar WHERE id = 3",
         &["foo"],
         vec![vec![json!("x")]],
      );
      let probe = conn.probe();
      let db = Driver::new(conn);

      let insert = db.prepare("INSERT INTO things SET stuff = ?");
      assert!(db.execute(insert, &[json!("it's")]).unwrap().is_done());

      let select = db.prepare("SELECT foo FROM bar WHERE id = !");
      let result = db.execute(select, &[json!(3)]).unwrap().fetchable().unwrap();
      assert_eq!(result.query(), "SELECT foo FROM bar WHERE id = !");
      assert_eq!(result.parameters(), [json!(3)]);

      assert_eq!(
         probe.executed(),
         [
            "INSERT INTO things SET stuff = 'it\\'s'",
            "SELECT foo FROM bar WHERE id = 3",
         ]
      );
   }

   #[test]
   fn test_execute_reports_backend_errors() {
      let conn = MemoryConnection::new("mysql").with_execute_fault(
         "SELECT * FROM missing",
         NativeFault::new("42S02", Some(1146), "Table doesn't exist"),
      );
      let db = Driver::new(conn);

      let id = db.prepare("SELECT * FROM missing");
      assert_eq!(db.execute(id, &[]).unwrap_err().kind(), ErrorKind::NoSuchTable);
   }

   #[test]
   fn test_execute_emulates_file_placeholder() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("opaquedata.txt");
      std::fs::write(&path, "no\n").unwrap();

      let conn = MemoryConnection::new("sqlite");
      let probe = conn.probe();
      let db = Driver::new(conn);

      let id = db.prepare("SELECT things FROM t WHERE good = ? AND bad = & AND ugly = !");
      db.execute(
         id,
         &[json!("yes"), json!(path.to_str().unwrap()), json!("COUNT(dracula)")],
      )
      .unwrap();
      assert_eq!(
         probe.executed(),
         ["SELECT things FROM t WHERE good = 'yes' AND bad = 'no\n' AND ugly = COUNT(dracula)"]
      );

      let err = db.execute(id, &[json!("yes")]).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Mismatch);
   }

   #[test]
   fn test_execute_multiple() {
      let conn = MemoryConnection::new("mysql");
      let probe = conn.probe();
      let db = Driver::new(conn);

      let id = db.prepare("INSERT INTO things SET stuff = ?");
      db.execute_multiple(id, &[vec![json!("foo")], vec![json!("bar")], vec![json!("baz")]])
         .unwrap();
      assert_eq!(probe.executed().len(), 3);
      assert_eq!(probe.executed()[2], "INSERT INTO things SET stuff = 'baz'");
   }

   #[test]
   fn test_execute_multiple_stops_at_first_failure() {
      let conn = MemoryConnection::new("mysql");
      let probe = conn.probe();
      let db = Driver::new(conn);

      let id = db.prepare("INSERT INTO things SET stuff = 1");
      let err = db
         .execute_multiple(id, &[vec![json!("foo")], vec![json!("bar")]])
         .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Mismatch);
      assert!(probe.executed().is_empty());
   }

   #[test]
   fn test_free_prepared_twice() {
      let db = Driver::new(MemoryConnection::new("mysql"));
      let id = db.prepare("INSERT INTO things SET stuff = 1");

      db.free_prepared(id).unwrap();
      assert_eq!(db.free_prepared(id).unwrap_err().kind(), ErrorKind::NoStatement);
      assert_eq!(db.execute(id, &[]).unwrap_err().kind(), ErrorKind::NoStatement);
      assert_eq!(db.prepared_query(id).unwrap_err().kind(), ErrorKind::NoStatement);
   }

   #[test]
   fn test_auto_prepare_insert() {
      let db = Driver::new(MemoryConnection::new("mysql"));
      let id = db
         .auto_prepare(TABLE, &["good", "bad", "ugly"], AutoMode::Insert, None)
         .unwrap();
      assert_eq!(
         db.prepared_query(id).unwrap(),
         "INSERT INTO my_awesome_table (good,bad,ugly) VALUES (?,?,?)"
      );
   }

   #[test]
   fn test_auto_prepare_without_fields() {
      let db = Driver::new(MemoryConnection::new("mysql"));
      let err = db.auto_prepare(TABLE, &[], AutoMode::Insert, None).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::NeedMoreData);
   }

   #[test]
   fn test_auto_prepare_update() {
      let db = Driver::new(MemoryConnection::new("mysql"));
      let id = db
         .auto_prepare(TABLE, &["good", "bad", "ugly"], AutoMode::Update, Some("id = 123"))
         .unwrap();
      assert_eq!(
         db.prepared_query(id).unwrap(),
         "UPDATE my_awesome_table SET good = ?,bad = ?,ugly = ? WHERE id = 123"
      );
   }

   #[test]
   fn test_unfiltered_update_needs_opt_in() {
      let db = Driver::new(MemoryConnection::new("mysql"));
      let err = db
         .auto_prepare(TABLE, &["good"], AutoMode::Update, Some("  "))
         .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::UnintendedConsequences);

      db.set_options(DriverOptions::default().with_unfiltered_updates(true));
      let id = db.auto_prepare(TABLE, &["good", "bad"], AutoMode::Update, None).unwrap();
      assert_eq!(
         db.prepared_query(id).unwrap(),
         "UPDATE my_awesome_table SET good = ?,bad = ?"
      );
   }

   #[test]
   fn test_auto_execute_insert() {
      let conn = MemoryConnection::new("mysql");
      let probe = conn.probe();
      let db = Driver::new(conn);

      let values = IndexMap::from([
         ("good".to_string(), json!("yes")),
         ("bad".to_string(), json!("no")),
         ("ugly".to_string(), json!("of course")),
      ]);
      assert!(db.auto_execute(TABLE, &values, AutoMode::Insert, None).unwrap().is_done());
      assert_eq!(
         probe.executed(),
         ["INSERT INTO my_awesome_table (good,bad,ugly) VALUES ('yes','no','of course')"]
      );
   }

   #[test]
   fn test_auto_execute_update_without_where_is_refused() {
      let conn = MemoryConnection::new("mysql");
      let probe = conn.probe();
      let db = Driver::new(conn);

      let values = IndexMap::from([("good".to_string(), json!("yes"))]);
      let err = db
         .auto_execute(TABLE, &values, AutoMode::Update, None)
         .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::UnintendedConsequences);
      assert!(probe.executed().is_empty());
   }
}
