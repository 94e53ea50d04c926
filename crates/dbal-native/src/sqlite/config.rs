//! Configuration for the SQLite backend

use serde::{Deserialize, Serialize};

/// Configuration applied when opening a [`SqliteConnection`](super::SqliteConnection)
///
/// # Examples
///
/// ```
/// use dbal_native::SqliteConfig;
///
/// // Use defaults
/// let config = SqliteConfig::default();
///
/// // Override just one field
/// let config = SqliteConfig {
///     foreign_keys: false,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
   /// Create the database file if it does not exist yet
   ///
   /// Default: true
   pub create_if_missing: bool,

   /// Enforce foreign key constraints (`PRAGMA foreign_keys`)
   ///
   /// Default: true
   pub foreign_keys: bool,

   /// How long a statement waits on a locked database before failing with
   /// `SQLITE_BUSY` (in seconds)
   ///
   /// Default: 5
   pub busy_timeout_secs: u64,
}

impl Default for SqliteConfig {
   fn default() -> Self {
      Self {
         create_if_missing: true,
         foreign_keys: true,
         busy_timeout_secs: 5,
      }
   }
}
