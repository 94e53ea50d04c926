//! Tests for the blocking SQLite backend.

use dbal_native::{
   FetchStyle, NativeConnection, NativeRow, NativeStatement, SqliteConfig, SqliteConnection,
   StatementOptions,
};
use serde_json::json;
use tempfile::TempDir;

fn create_test_db(name: &str) -> (SqliteConnection, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let db_path = temp_dir.path().join(name);
   let conn = SqliteConnection::open(&db_path, None).expect("Failed to open test database");

   (conn, temp_dir)
}

fn run(conn: &mut SqliteConnection, sql: &str) -> Box<dyn NativeStatement> {
   let mut stmt = conn
      .prepare(sql, &StatementOptions::default())
      .expect("prepare failed");
   stmt.execute().expect("execute failed");
   stmt
}

#[test]
fn test_manipulation_reports_affected_rows() {
   let (mut conn, _temp) = create_test_db("affected.db");

   run(&mut conn, "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)");
   run(&mut conn, "INSERT INTO t (name) VALUES ('a'), ('b'), ('c')");

   let stmt = run(&mut conn, "UPDATE t SET name = 'z' WHERE id > 1");
   assert_eq!(stmt.column_count(), 0);
   assert_eq!(stmt.row_count(), Some(2));
   assert_eq!(conn.last_insert_id(), Some("3".to_string()));
}

#[test]
fn test_select_fetches_in_both_styles() {
   let (mut conn, _temp) = create_test_db("fetch.db");

   run(&mut conn, "CREATE TABLE t (id INTEGER, name TEXT, score REAL)");
   run(&mut conn, "INSERT INTO t VALUES (1, 'alice', 1.5), (2, NULL, 2.0)");

   let mut stmt = run(&mut conn, "SELECT id, name, score FROM t ORDER BY id");
   assert_eq!(stmt.column_count(), 3);
   assert_eq!(stmt.row_count(), None);

   assert_eq!(
      stmt.fetch(FetchStyle::Numeric, None).unwrap(),
      Some(NativeRow::Numeric(vec![json!(1), json!("alice"), json!(1.5)]))
   );

   let Some(NativeRow::Assoc(row)) = stmt.fetch(FetchStyle::Assoc, None).unwrap() else {
      panic!("expected assoc row");
   };
   assert_eq!(row.get("id"), Some(&json!(2)));
   assert_eq!(row.get("name"), Some(&json!(null)));

   assert_eq!(stmt.fetch(FetchStyle::Numeric, None).unwrap(), None);
}

#[test]
fn test_absolute_row_fetch() {
   let (mut conn, _temp) = create_test_db("absolute.db");

   run(&mut conn, "CREATE TABLE n (v INTEGER)");
   for i in 1..=10 {
      run(&mut conn, &format!("INSERT INTO n VALUES ({i})"));
   }

   let mut stmt = run(&mut conn, "SELECT v FROM n ORDER BY v");
   assert_eq!(
      stmt.fetch(FetchStyle::Numeric, Some(6)).unwrap(),
      Some(NativeRow::Numeric(vec![json!(7)]))
   );
   assert_eq!(stmt.fetch(FetchStyle::Numeric, Some(10)).unwrap(), None);
}

#[test]
fn test_column_meta_carries_declared_type() {
   let (mut conn, _temp) = create_test_db("meta.db");

   run(&mut conn, "CREATE TABLE t (id INTEGER, label TEXT)");
   let stmt = conn
      .prepare("SELECT id, label FROM t LIMIT 0", &StatementOptions::default())
      .unwrap();

   let meta = stmt.column_meta(1).expect("column 1 missing");
   assert_eq!(meta.name, "label");
   assert_eq!(meta.native_type.as_deref(), Some("TEXT"));
   assert!(stmt.column_meta(2).is_none());
}

#[test]
fn test_missing_table_faults_at_prepare() {
   let (mut conn, _temp) = create_test_db("missing.db");

   let fault = match conn.prepare("SELECT * FROM nope", &StatementOptions::default()) {
      Err(fault) => fault,
      Ok(_) => panic!("expected prepare to fail"),
   };

   assert!(fault.message.contains("no such table"));
   assert_eq!(fault.code, Some(1));
}

#[test]
fn test_unique_violation_faults_at_execute() {
   let (mut conn, _temp) = create_test_db("unique.db");

   run(&mut conn, "CREATE TABLE t (id INTEGER UNIQUE)");
   run(&mut conn, "INSERT INTO t VALUES (1)");

   let mut stmt = conn
      .prepare("INSERT INTO t VALUES (1)", &StatementOptions::default())
      .unwrap();
   let fault = stmt.execute().unwrap_err();

   assert_eq!(fault.sqlstate, "23000");
   assert!(fault.message.contains("UNIQUE constraint failed"));
   assert_eq!(stmt.error_info(), fault);
   assert_eq!(conn.error_info(), fault);
}

#[test]
fn test_rollback_discards_writes() {
   let (mut conn, _temp) = create_test_db("rollback.db");

   run(&mut conn, "CREATE TABLE t (id INTEGER)");
   conn.begin_transaction().unwrap();
   run(&mut conn, "INSERT INTO t VALUES (1)");
   conn.roll_back().unwrap();

   conn.begin_transaction().unwrap();
   run(&mut conn, "INSERT INTO t VALUES (2)");
   conn.commit().unwrap();

   let mut stmt = run(&mut conn, "SELECT id FROM t");
   assert_eq!(
      stmt.fetch(FetchStyle::Numeric, None).unwrap(),
      Some(NativeRow::Numeric(vec![json!(2)]))
   );
   assert_eq!(stmt.fetch(FetchStyle::Numeric, None).unwrap(), None);
}

#[test]
fn test_blob_comes_back_base64() {
   let (mut conn, _temp) = create_test_db("blob.db");

   run(&mut conn, "CREATE TABLE b (data BLOB)");
   run(&mut conn, "INSERT INTO b VALUES (X'68656C6C6F')");

   let mut stmt = run(&mut conn, "SELECT data FROM b");
   assert_eq!(
      stmt.fetch(FetchStyle::Numeric, None).unwrap(),
      Some(NativeRow::Numeric(vec![json!("aGVsbG8=")]))
   );
}

#[test]
fn test_missing_file_not_created_when_disabled() {
   let temp_dir = TempDir::new().unwrap();
   let config = SqliteConfig {
      create_if_missing: false,
      ..Default::default()
   };

   let result = SqliteConnection::open(temp_dir.path().join("absent.db"), Some(config));
   assert!(result.is_err());
}

#[test]
fn test_in_memory_database() {
   let mut conn = SqliteConnection::open_in_memory().unwrap();
   assert_eq!(conn.label(), ":memory:");
   assert_eq!(conn.driver_name(), "sqlite");

   let mut stmt = run(&mut conn, "SELECT 41 + 1 AS answer");
   let Some(NativeRow::Assoc(row)) = stmt.fetch(FetchStyle::Assoc, None).unwrap() else {
      panic!("expected a row");
   };
   assert_eq!(row.get("answer"), Some(&json!(42)));
}
