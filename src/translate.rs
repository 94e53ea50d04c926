//! Native fault to [`ErrorKind`] translation

use std::collections::HashMap;
use std::sync::LazyLock;

use dbal_native::NativeFault;
use regex::Regex;

use crate::error::{Error, ErrorKind};

/// MySQL server error codes with a generic counterpart.
static MYSQL_CODES: LazyLock<HashMap<i64, ErrorKind>> = LazyLock::new(|| {
   use ErrorKind::*;

   HashMap::from([
      (1004, CannotCreate),
      (1005, CannotCreate),
      (1006, CannotCreate),
      (1007, AlreadyExists),
      (1008, CannotDrop),
      (1022, AlreadyExists),
      (1044, AccessViolation),
      (1046, NoDbSelected),
      (1048, ConstraintViolation),
      (1049, NoSuchDb),
      (1050, AlreadyExists),
      (1051, NoSuchTable),
      (1054, NoSuchField),
      (1061, AlreadyExists),
      (1062, AlreadyExists),
      (1064, SyntaxError),
      (1091, NotFound),
      (1100, NotLocked),
      (1136, ValueCountMismatch),
      (1142, AccessViolation),
      (1146, NoSuchTable),
      (1216, ConstraintViolation),
      (1217, ConstraintViolation),
      (1356, DivisionByZero),
      (1451, ConstraintViolation),
      (1452, ConstraintViolation),
   ])
});

/// SQLite reports nearly everything as `SQLITE_ERROR`, so the message decides.
static SQLITE_MESSAGES: LazyLock<Vec<(Regex, ErrorKind)>> = LazyLock::new(|| {
   use ErrorKind::*;

   [
      (r"^no such table:", NoSuchTable),
      (r"^no such column:", NoSuchField),
      (r"^table .+ has no column named ", NoSuchField),
      (r"^no such index:", NotFound),
      (r"already exists$", AlreadyExists),
      (r"^(UNIQUE|PRIMARY KEY) constraint failed", AlreadyExists),
      (r"(NOT NULL|CHECK|FOREIGN KEY) constraint failed", ConstraintViolation),
      (r"^(column .+ is|columns .+ are) not unique$", ConstraintViolation),
      (r"syntax error", SyntaxError),
      (r"^incomplete input$", SyntaxError),
      (r"^\d+ values for \d+ columns$", ValueCountMismatch),
      (r"table .+ has \d+ columns but \d+ values were supplied", ValueCountMismatch),
      (r"^attempt to write a readonly database", AccessViolation),
      (r"^unable to open database", NoSuchDb),
   ]
   .into_iter()
   .map(|(pattern, kind)| {
      let re = Regex::new(pattern).expect("failed to compile sqlite message regex");
      (re, kind)
   })
   .collect()
});

/// Map a native fault to its generic kind.
///
/// Numeric codes from the MySQL table win; otherwise the message is matched
/// against the SQLite patterns; anything else is [`ErrorKind::Generic`].
pub fn error_kind(fault: &NativeFault) -> ErrorKind {
   if let Some(kind) = fault.code.and_then(|code| MYSQL_CODES.get(&code)) {
      return *kind;
   }

   SQLITE_MESSAGES
      .iter()
      .find(|(re, _)| re.is_match(&fault.message))
      .map(|(_, kind)| *kind)
      .unwrap_or(ErrorKind::Generic)
}

/// Translate a native fault into the driver error shape.
pub fn translate(fault: NativeFault) -> Error {
   Error::native(error_kind(&fault), fault)
}

/// `SQLSTATE[<state>]: (Driver code <n>) <message>`
pub fn format_error_info(fault: &NativeFault) -> String {
   match fault.code {
      Some(code) => format!(
         "SQLSTATE[{}]: (Driver code {}) {}",
         fault.sqlstate, code, fault.message
      ),
      None => format!("SQLSTATE[{}]: {}", fault.sqlstate, fault.message),
   }
}

/// Build an error from a gathered fault triplet.
///
/// `kind` overrides the translated kind. The userinfo is always
/// `"<state> ** <message>"`.
pub fn raise(fault: NativeFault, kind: Option<ErrorKind>) -> Error {
   let kind = kind.unwrap_or_else(|| error_kind(&fault));
   let userinfo = format!("{} ** {}", fault.sqlstate, fault.message);
   Error::native(kind, fault).with_userinfo(userinfo)
}

/// Fault triplet reported when no native connection is available.
pub fn disconnected_fault() -> NativeFault {
   NativeFault::new("Disconnected", None, "No active connection")
}

#[cfg(test)]
mod tests {
   use super::*;

   fn mysql(code: i64) -> NativeFault {
      NativeFault::general(code, "mysql said no")
   }

   fn sqlite(message: &str) -> NativeFault {
      NativeFault::general(1, message)
   }

   #[test]
   fn test_mysql_codes() {
      assert_eq!(error_kind(&mysql(1146)), ErrorKind::NoSuchTable);
      assert_eq!(error_kind(&mysql(1062)), ErrorKind::AlreadyExists);
      assert_eq!(error_kind(&mysql(1064)), ErrorKind::SyntaxError);
      assert_eq!(error_kind(&mysql(1452)), ErrorKind::ConstraintViolation);
      assert_eq!(error_kind(&mysql(1356)), ErrorKind::DivisionByZero);
      assert_eq!(error_kind(&mysql(1100)), ErrorKind::NotLocked);
   }

   #[test]
   fn test_unmapped_code_is_generic() {
      assert_eq!(error_kind(&mysql(2006)), ErrorKind::Generic);
      assert_eq!(error_kind(&NativeFault::none()), ErrorKind::Generic);
   }

   #[test]
   fn test_sqlite_messages() {
      assert_eq!(error_kind(&sqlite("no such table: users")), ErrorKind::NoSuchTable);
      assert_eq!(error_kind(&sqlite("no such column: nme")), ErrorKind::NoSuchField);
      assert_eq!(
         error_kind(&sqlite("table users already exists")),
         ErrorKind::AlreadyExists
      );
      assert_eq!(
         error_kind(&sqlite("UNIQUE constraint failed: users.email")),
         ErrorKind::AlreadyExists
      );
      assert_eq!(
         error_kind(&sqlite("NOT NULL constraint failed: users.name")),
         ErrorKind::ConstraintViolation
      );
      assert_eq!(
         error_kind(&sqlite("near \"SELEC\": syntax error")),
         ErrorKind::SyntaxError
      );
      assert_eq!(
         error_kind(&sqlite("2 values for 3 columns")),
         ErrorKind::ValueCountMismatch
      );
   }

   #[test]
   fn test_every_sqlite_pattern_is_loaded() {
      assert_eq!(SQLITE_MESSAGES.len(), 14);
      assert_eq!(
         error_kind(&sqlite("attempt to write a readonly database")),
         ErrorKind::AccessViolation
      );
      assert_eq!(
         error_kind(&sqlite("unable to open database file")),
         ErrorKind::NoSuchDb
      );
   }

   #[test]
   fn test_format_error_info() {
      let fault = NativeFault::general(1213, "Deadlock found");
      assert_eq!(
         format_error_info(&fault),
         "SQLSTATE[HY000]: (Driver code 1213) Deadlock found"
      );
   }

   #[test]
   fn test_raise_sets_userinfo() {
      let err = raise(mysql(1146), None);
      assert_eq!(err.kind(), ErrorKind::NoSuchTable);
      assert_eq!(err.userinfo(), Some("HY000 ** mysql said no"));

      let err = raise(disconnected_fault(), Some(ErrorKind::NoDbSelected));
      assert_eq!(err.kind(), ErrorKind::NoDbSelected);
      assert_eq!(err.userinfo(), Some("Disconnected ** No active connection"));
   }
}
