//! Native fault triplet reported by a backend

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SQLSTATE reported when the backend has no pending fault.
pub const SQLSTATE_OK: &str = "00000";

/// SQLSTATE for general errors without a more specific class.
pub const SQLSTATE_GENERAL: &str = "HY000";

/// SQLSTATE for integrity constraint violations.
pub const SQLSTATE_CONSTRAINT: &str = "23000";

/// A fault raised by a native backend: `(sqlstate, native code, message)`.
///
/// This is the raw shape a backend hands upwards. The `dbal` layer never lets
/// it escape on its own; it is always wrapped in a translated error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("SQLSTATE[{sqlstate}]: {message}")]
pub struct NativeFault {
   /// Five character SQLSTATE class/subclass
   pub sqlstate: String,

   /// Backend specific numeric error code, when the backend has one
   pub code: Option<i64>,

   /// Human readable message from the backend
   pub message: String,
}

impl NativeFault {
   pub fn new(sqlstate: impl Into<String>, code: Option<i64>, message: impl Into<String>) -> Self {
      Self {
         sqlstate: sqlstate.into(),
         code,
         message: message.into(),
      }
   }

   /// The "no error" triplet.
   pub fn none() -> Self {
      Self::new(SQLSTATE_OK, None, "")
   }

   /// General error with a numeric backend code.
   pub fn general(code: i64, message: impl Into<String>) -> Self {
      Self::new(SQLSTATE_GENERAL, Some(code), message)
   }

   pub fn is_none(&self) -> bool {
      self.sqlstate == SQLSTATE_OK && self.code.is_none()
   }
}

impl Default for NativeFault {
   fn default() -> Self {
      Self::none()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_display_includes_state_and_message() {
      let fault = NativeFault::general(1146, "Table 'app.t' doesn't exist");
      assert_eq!(
         fault.to_string(),
         "SQLSTATE[HY000]: Table 'app.t' doesn't exist"
      );
   }

   #[test]
   fn test_none_is_default() {
      assert!(NativeFault::default().is_none());
      assert!(!NativeFault::general(1, "x").is_none());
   }
}
