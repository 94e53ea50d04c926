//! Table-backed sequences (MySQL only)

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{Error, ErrorKind, Result};

static UNSAFE_CHARS: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"(?i)[^a-z0-9_.]").expect("failed to compile sequence name regex"));

/// `SELECT GET_LOCK(..)` answers 1, 0 or NULL depending on the client.
fn is_truthy(value: Option<&JsonValue>) -> bool {
   match value {
      None | Some(JsonValue::Null) => false,
      Some(JsonValue::Bool(flag)) => *flag,
      Some(JsonValue::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
      Some(JsonValue::String(text)) => !text.is_empty() && text != "0",
      Some(_) => true,
   }
}

impl Driver {
   /// Table name backing sequence `name`.
   ///
   /// Characters outside `[a-z0-9_.]` become `_`, then the result is put in
   /// place of `%s` in the `seqname_format` option.
   pub fn sequence_name(&self, name: &str) -> String {
      let safe = UNSAFE_CHARS.replace_all(name, "_");
      self.options().seqname_format.replace("%s", &safe)
   }

   fn require_mysql(&self) -> Result<()> {
      if self.platform()? == "mysql" {
         Ok(())
      } else {
         Err(Error::new(ErrorKind::Unsupported).with_userinfo("sequences need mysql"))
      }
   }

   /// Next value of sequence `name`.
   ///
   /// A missing sequence table is created when `on_demand` is set, and the
   /// call returns 1. An emptied table is refilled under a user lock.
   pub fn next_id(&self, name: &str, on_demand: bool) -> Result<u64> {
      self.require_mysql()?;
      let table = self.sequence_name(name);

      match self.query(&format!("UPDATE {table} SET id = LAST_INSERT_ID(id + 1)"), &[]) {
         Ok(_) => {}
         Err(err) if on_demand && err.kind() == ErrorKind::NoSuchTable => {
            debug!("creating sequence table {} on demand", table);
            self.create_sequence(name)?;
            return Ok(1);
         }
         Err(err) => return Err(err),
      }

      let id = self.last_insert_id()?;
      if id != 0 {
         return Ok(id);
      }

      let lock = format!("{table}_lock");
      let locked = self.get_one(&format!("SELECT GET_LOCK('{lock}', 10)"), &[])?;
      if !is_truthy(locked.as_ref()) {
         return Err(self.native_error(Some(ErrorKind::NotLocked)));
      }

      self.query(&format!("REPLACE INTO {table} (id) VALUES (0)"), &[])?;
      self.get_one(&format!("SELECT RELEASE_LOCK('{lock}')"), &[])?;
      Ok(1)
   }

   /// Create the table for sequence `name`; its first `next_id` is 1.
   pub fn create_sequence(&self, name: &str) -> Result<()> {
      self.require_mysql()?;
      let table = self.sequence_name(name);

      self.query(
         &format!(
            "CREATE TABLE {table} (id INTEGER UNSIGNED AUTO_INCREMENT NOT NULL, PRIMARY KEY(id))"
         ),
         &[],
      )?;
      self.query(&format!("INSERT INTO {table} (id) VALUES (0)"), &[])?;
      Ok(())
   }

   pub fn drop_sequence(&self, name: &str) -> Result<()> {
      self.require_mysql()?;
      self.query(&format!("DROP TABLE {}", self.sequence_name(name)), &[])?;
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use dbal_native::{MemoryConnection, NativeFault};
   use serde_json::json;

   const UPDATE: &str = "UPDATE users_seq SET id = LAST_INSERT_ID(id + 1)";

   #[test]
   fn test_sequence_name_sanitizes() {
      let db = Driver::new(MemoryConnection::new("mysql"));
      assert_eq!(db.sequence_name("users"), "users_seq");
      assert_eq!(db.sequence_name("my-seq name"), "my_seq_name_seq");
      assert_eq!(db.sequence_name("Schema.Items"), "Schema.Items_seq");
   }

   #[test]
   fn test_non_mysql_is_unsupported() {
      let db = Driver::new(MemoryConnection::new("sqlite"));
      assert_eq!(db.next_id("users", true).unwrap_err().kind(), ErrorKind::Unsupported);
      assert_eq!(db.create_sequence("users").unwrap_err().kind(), ErrorKind::Unsupported);
      assert_eq!(db.drop_sequence("users").unwrap_err().kind(), ErrorKind::Unsupported);
   }

   #[test]
   fn test_next_id_common_case() {
      let conn = MemoryConnection::new("mysql")
         .with_affected_rows(UPDATE, 1)
         .with_last_insert_id("7");
      let db = Driver::new(conn);
      assert_eq!(db.next_id("users", true).unwrap(), 7);
   }

   #[test]
   fn test_next_id_creates_missing_table() {
      let conn = MemoryConnection::new("mysql")
         .with_execute_fault(UPDATE, NativeFault::new("42S02", Some(1146), "Table doesn't exist"));
      let probe = conn.probe();
      let db = Driver::new(conn);

      assert_eq!(db.next_id("users", true).unwrap(), 1);
      let executed = probe.executed();
      assert!(executed.iter().any(|sql| sql.starts_with("CREATE TABLE users_seq ")));
      assert_eq!(executed.last().unwrap(), "INSERT INTO users_seq (id) VALUES (0)");
   }

   #[test]
   fn test_next_id_without_on_demand_reports_missing_table() {
      let conn = MemoryConnection::new("mysql")
         .with_execute_fault(UPDATE, NativeFault::new("42S02", Some(1146), "Table doesn't exist"));
      let db = Driver::new(conn);
      assert_eq!(db.next_id("users", false).unwrap_err().kind(), ErrorKind::NoSuchTable);
   }

   #[test]
   fn test_next_id_refills_empty_table() {
      let conn = MemoryConnection::new("mysql")
         .with_last_insert_id("0")
         .with_rows(
            "SELECT GET_LOCK('users_seq_lock', 10)",
            &["lock"],
            vec![vec![json!(1)]],
         );
      let probe = conn.probe();
      let db = Driver::new(conn);

      assert_eq!(db.next_id("users", true).unwrap(), 1);
      let executed = probe.executed();
      assert!(executed.contains(&"REPLACE INTO users_seq (id) VALUES (0)".to_string()));
      assert_eq!(executed.last().unwrap(), "SELECT RELEASE_LOCK('users_seq_lock')");
   }

   #[test]
   fn test_next_id_lock_refused() {
      let conn = MemoryConnection::new("mysql").with_last_insert_id("0").with_rows(
         "SELECT GET_LOCK('users_seq_lock', 10)",
         &["lock"],
         vec![vec![json!(0)]],
      );
      let db = Driver::new(conn);
      assert_eq!(db.next_id("users", true).unwrap_err().kind(), ErrorKind::NotLocked);
   }

   #[test]
   fn test_next_id_rejects_garbled_insert_id() {
      let conn = MemoryConnection::new("mysql")
         .with_affected_rows(UPDATE, 1)
         .with_last_insert_id("abc");
      let db = Driver::new(conn);

      let err = db.next_id("users", true).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Generic);
      assert_eq!(err.userinfo(), Some("unparsable last insert id: abc"));
   }

   #[test]
   fn test_is_truthy() {
      assert!(is_truthy(Some(&json!(1))));
      assert!(is_truthy(Some(&json!("1"))));
      assert!(!is_truthy(Some(&json!("0"))));
      assert!(!is_truthy(Some(&json!(null))));
      assert!(!is_truthy(None));
   }
}
