//! Driver options, fetch modes and saved configuration

use serde::{Deserialize, Serialize};

/// Portability adjustments applied to queries and fetched rows.
///
/// All flags are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Portability {
   /// Lowercase column names in associative rows and table info
   pub lowercase: bool,
   /// Strip trailing whitespace from string values
   pub rtrim: bool,
   /// Rewrite bare `DELETE FROM t` so the affected row count is reported
   pub delete_count: bool,
   /// Count rows by re-running the query instead of asking the backend
   pub numrows: bool,
   /// Fetch SQL NULL as an empty string
   pub null_to_empty: bool,
}

impl Portability {
   pub fn none() -> Self {
      Self::default()
   }

   pub fn all() -> Self {
      Self {
         lowercase: true,
         rtrim: true,
         delete_count: true,
         numrows: true,
         null_to_empty: true,
      }
   }
}

/// How a limit window is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitStrategy {
   /// Append a `LIMIT` clause to the query; the cursor still enforces the
   /// window count
   #[default]
   Alter,
   /// Leave the query alone and fetch window rows by absolute position
   Emulate,
}

/// Options controlling driver behaviour.
///
/// # Examples
///
/// ```
/// use dbal::{DriverOptions, LimitStrategy, Portability};
///
/// // Use defaults
/// let options = DriverOptions::default();
///
/// // Builder style
/// let options = DriverOptions::default()
///    .with_autofree(true)
///    .with_portability(Portability::all())
///    .with_limit_strategy(LimitStrategy::Emulate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
   /// Free a result's statement automatically once it is exhausted
   ///
   /// Default: false
   pub autofree: bool,

   /// Default: [`Portability::none`]
   pub portability: Portability,

   /// Let MySQL buffer full result sets client side
   ///
   /// Default: true
   pub result_buffering: bool,

   /// Format for sequence table names; `%s` is replaced by the sequence name
   ///
   /// Default: `"%s_seq"`
   pub seqname_format: String,

   /// Default: [`LimitStrategy::Alter`]
   pub limit_strategy: LimitStrategy,

   /// Let `modify_limit_query` append `LIMIT count` to manipulation
   /// statements instead of rejecting them
   ///
   /// Default: false
   pub legacy_manip_limit: bool,

   /// Let `auto_prepare` build an `UPDATE` without a `WHERE` clause
   ///
   /// Default: false
   pub allow_unfiltered_updates: bool,
}

impl Default for DriverOptions {
   fn default() -> Self {
      Self {
         autofree: false,
         portability: Portability::none(),
         result_buffering: true,
         seqname_format: "%s_seq".to_string(),
         limit_strategy: LimitStrategy::Alter,
         legacy_manip_limit: false,
         allow_unfiltered_updates: false,
      }
   }
}

impl DriverOptions {
   pub fn with_autofree(mut self, autofree: bool) -> Self {
      self.autofree = autofree;
      self
   }

   pub fn with_portability(mut self, portability: Portability) -> Self {
      self.portability = portability;
      self
   }

   pub fn with_result_buffering(mut self, result_buffering: bool) -> Self {
      self.result_buffering = result_buffering;
      self
   }

   pub fn with_seqname_format(mut self, format: impl Into<String>) -> Self {
      self.seqname_format = format.into();
      self
   }

   pub fn with_limit_strategy(mut self, strategy: LimitStrategy) -> Self {
      self.limit_strategy = strategy;
      self
   }

   pub fn with_legacy_manip_limit(mut self, enabled: bool) -> Self {
      self.legacy_manip_limit = enabled;
      self
   }

   pub fn with_unfiltered_updates(mut self, allowed: bool) -> Self {
      self.allow_unfiltered_updates = allowed;
      self
   }
}

/// Shape of fetched rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
   /// Whatever the driver (or the cursor's snapshot) defaults to
   #[default]
   Default,
   /// Values in column order
   Ordered,
   /// Values keyed by column name, in column order
   Assoc,
   /// A JSON object keyed by column name
   Object,
}

/// Extra indexes requested from `table_info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableInfoMode {
   /// Column descriptions only
   #[default]
   Plain,
   /// Adds `name -> index`
   Order,
   /// Adds `table -> name -> index`
   OrderTable,
   /// Both indexes
   Full,
}

impl TableInfoMode {
   pub(crate) fn wants_order(self) -> bool {
      matches!(self, TableInfoMode::Order | TableInfoMode::Full)
   }

   pub(crate) fn wants_order_table(self) -> bool {
      matches!(self, TableInfoMode::OrderTable | TableInfoMode::Full)
   }
}

/// The serializable part of a driver's state.
///
/// Never contains the native connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
   pub fetch_mode: FetchMode,
   pub autocommit: bool,
   pub options: DriverOptions,
}

impl Default for DriverConfig {
   fn default() -> Self {
      Self {
         fetch_mode: FetchMode::Ordered,
         autocommit: true,
         options: DriverOptions::default(),
      }
   }
}
