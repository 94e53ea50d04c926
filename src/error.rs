use dbal_native::NativeFault;
use serde::{Serialize, Serializer};

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Generic error categories every native fault is translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
   #[error("already exists")]
   AlreadyExists,
   #[error("can not create")]
   CannotCreate,
   #[error("can not drop")]
   CannotDrop,
   #[error("insufficient permissions")]
   AccessViolation,
   #[error("no database selected")]
   NoDbSelected,
   #[error("constraint violation")]
   ConstraintViolation,
   #[error("no such database")]
   NoSuchDb,
   #[error("no such table")]
   NoSuchTable,
   #[error("no such field")]
   NoSuchField,
   #[error("syntax error")]
   SyntaxError,
   #[error("not found")]
   NotFound,
   #[error("not locked")]
   NotLocked,
   #[error("value count on row")]
   ValueCountMismatch,
   #[error("division by zero")]
   DivisionByZero,
   #[error("unknown error")]
   Generic,
   #[error("backend not capable")]
   NotCapable,
   #[error("insufficient data supplied")]
   NeedMoreData,
   #[error("not supported")]
   Unsupported,
   #[error("mismatch")]
   Mismatch,
   #[error("truncated")]
   Truncated,
   /// A statement handle or result cursor was used after it was freed
   #[error("no statement set")]
   NoStatement,
   /// A native value of a shape that cannot be held as a statement
   #[error("unhandled statement type")]
   UnhandledType,
   /// A generated statement would touch every row of a table
   #[error("possible unintended consequences")]
   UnintendedConsequences,
}

impl ErrorKind {
   /// Stable machine-readable name, e.g. `DB_ERROR_NOSUCHTABLE`
   pub fn code(&self) -> &'static str {
      match self {
         ErrorKind::AlreadyExists => "DB_ERROR_ALREADY_EXISTS",
         ErrorKind::CannotCreate => "DB_ERROR_CANNOT_CREATE",
         ErrorKind::CannotDrop => "DB_ERROR_CANNOT_DROP",
         ErrorKind::AccessViolation => "DB_ERROR_ACCESS_VIOLATION",
         ErrorKind::NoDbSelected => "DB_ERROR_NODBSELECTED",
         ErrorKind::ConstraintViolation => "DB_ERROR_CONSTRAINT",
         ErrorKind::NoSuchDb => "DB_ERROR_NOSUCHDB",
         ErrorKind::NoSuchTable => "DB_ERROR_NOSUCHTABLE",
         ErrorKind::NoSuchField => "DB_ERROR_NOSUCHFIELD",
         ErrorKind::SyntaxError => "DB_ERROR_SYNTAX",
         ErrorKind::NotFound => "DB_ERROR_NOT_FOUND",
         ErrorKind::NotLocked => "DB_ERROR_NOT_LOCKED",
         ErrorKind::ValueCountMismatch => "DB_ERROR_VALUE_COUNT_ON_ROW",
         ErrorKind::DivisionByZero => "DB_ERROR_DIVZERO",
         ErrorKind::Generic => "DB_ERROR",
         ErrorKind::NotCapable => "DB_ERROR_NOT_CAPABLE",
         ErrorKind::NeedMoreData => "DB_ERROR_NEED_MORE_DATA",
         ErrorKind::Unsupported => "DB_ERROR_UNSUPPORTED",
         ErrorKind::Mismatch => "DB_ERROR_MISMATCH",
         ErrorKind::Truncated => "DB_ERROR_TRUNCATED",
         ErrorKind::NoStatement => "DB_ERROR_NO_STATEMENT",
         ErrorKind::UnhandledType => "DB_ERROR_UNHANDLED_TYPE",
         ErrorKind::UnintendedConsequences => "DB_ERROR_POSSIBLE_UNINTENDED_CONSEQUENCES",
      }
   }
}

/// Structured error response for serialization.
#[derive(Serialize)]
struct ErrorResponse {
   code: String,
   message: String,
}

/// Error raised by the driver layer.
///
/// Native faults never escape on their own: they are translated into an
/// [`ErrorKind`] and carried along in `native` so the original message stays
/// inspectable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}{}", describe(.native, .userinfo))]
pub struct Error {
   kind: ErrorKind,
   #[source]
   native: Option<NativeFault>,
   userinfo: Option<String>,
}

fn describe(native: &Option<NativeFault>, userinfo: &Option<String>) -> String {
   match (userinfo, native) {
      (Some(info), _) => format!(": {info}"),
      (None, Some(fault)) if !fault.message.is_empty() => format!(": {}", fault.message),
      _ => String::new(),
   }
}

impl Error {
   pub fn new(kind: ErrorKind) -> Self {
      Self {
         kind,
         native: None,
         userinfo: None,
      }
   }

   /// An error of `kind` carrying the native fault that caused it.
   pub fn native(kind: ErrorKind, fault: NativeFault) -> Self {
      Self {
         kind,
         native: Some(fault),
         userinfo: None,
      }
   }

   pub fn with_userinfo(mut self, userinfo: impl Into<String>) -> Self {
      self.userinfo = Some(userinfo.into());
      self
   }

   pub fn kind(&self) -> ErrorKind {
      self.kind
   }

   pub fn native_fault(&self) -> Option<&NativeFault> {
      self.native.as_ref()
   }

   pub fn userinfo(&self) -> Option<&str> {
      self.userinfo.as_deref()
   }

   /// The native message when there is one, otherwise the kind's description.
   pub fn message(&self) -> String {
      match &self.native {
         Some(fault) if !fault.message.is_empty() => fault.message.clone(),
         _ => self.kind.to_string(),
      }
   }

   /// Extract a structured error code from the error.
   ///
   /// This provides machine-readable error codes for callers that switch on
   /// the failure category.
   pub fn error_code(&self) -> String {
      self.kind.code().to_string()
   }
}

impl From<ErrorKind> for Error {
   fn from(kind: ErrorKind) -> Self {
      Error::new(kind)
   }
}

impl Serialize for Error {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      ErrorResponse {
         code: self.error_code(),
         message: self.to_string(),
      }
      .serialize(serializer)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_code_no_such_table() {
      let err = Error::new(ErrorKind::NoSuchTable);
      assert_eq!(err.error_code(), "DB_ERROR_NOSUCHTABLE");
      assert_eq!(err.to_string(), "no such table");
   }

   #[test]
   fn test_native_message_is_kept() {
      let fault = NativeFault::general(1146, "Table 'app.users' doesn't exist");
      let err = Error::native(ErrorKind::NoSuchTable, fault.clone());

      assert_eq!(err.message(), "Table 'app.users' doesn't exist");
      assert_eq!(err.native_fault(), Some(&fault));
      assert!(err.to_string().contains("doesn't exist"));
   }

   #[test]
   fn test_userinfo_takes_precedence_in_display() {
      let err = Error::native(ErrorKind::Generic, NativeFault::general(1, "raw"))
         .with_userinfo("HY000 ** raw");
      assert_eq!(err.to_string(), "unknown error: HY000 ** raw");
      assert_eq!(err.userinfo(), Some("HY000 ** raw"));
   }

   #[test]
   fn test_message_falls_back_to_kind() {
      assert_eq!(Error::new(ErrorKind::NoStatement).message(), "no statement set");
   }

   #[test]
   fn test_error_serialization() {
      let err = Error::new(ErrorKind::Mismatch);
      let json = serde_json::to_value(&err).unwrap();
      assert_eq!(json["code"], "DB_ERROR_MISMATCH");
      assert_eq!(json["message"], "mismatch");
   }

   #[test]
   fn test_error_is_send_sync() {
      fn assert_send_sync<T: Send + Sync>() {}
      assert_send_sync::<Error>();
   }
}
