//! Result cursor over an executed statement

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::config::{FetchMode, LimitStrategy, TableInfoMode};
use crate::driver::{Driver, FetchStatus, Outcome, TableInfo, TableSource};
use crate::error::{Error, ErrorKind, Result};
use crate::row::Row;
use crate::statement::StatementHandle;

/// Cursor over the rows of an executed statement.
///
/// The driver's autofree option, fetch mode, limit strategy, query and
/// parameters are captured when the cursor is created; later changes to the
/// driver do not affect it. After [`QueryResult::free`] every operation that
/// needs the statement fails with [`ErrorKind::NoStatement`].
#[derive(Debug)]
pub struct QueryResult {
   driver: Driver,
   handle: Option<StatementHandle>,
   autofree: bool,
   fetch_mode: FetchMode,
   limit_strategy: LimitStrategy,
   query: String,
   parameters: Vec<JsonValue>,
   limit: Option<(usize, usize)>,
   row_counter: Option<usize>,
}

impl QueryResult {
   pub fn new(driver: Driver, handle: StatementHandle) -> Self {
      let snapshot = driver.snapshot();
      Self {
         driver,
         handle: Some(handle),
         autofree: snapshot.autofree,
         fetch_mode: snapshot.fetch_mode,
         limit_strategy: snapshot.limit_strategy,
         query: snapshot.query,
         parameters: snapshot.parameters,
         limit: None,
         row_counter: None,
      }
   }

   /// Restrict the rows this cursor yields to `[offset, offset + count)`.
   ///
   /// A window reaching past `usize::MAX` is open ended.
   pub fn set_limit(&mut self, offset: usize, count: usize) {
      self.limit = Some((offset, count));
   }

   /// The limit window as `(offset, count)`
   pub fn limit(&self) -> Option<(usize, usize)> {
      self.limit
   }

   fn no_statement() -> Error {
      Error::new(ErrorKind::NoStatement)
   }

   /// Fetch the next row, or the row at absolute position `rownum`.
   ///
   /// Returns `Ok(None)` at end of data, or once the limit window is used up
   /// even if the statement has more rows.
   pub fn fetch_row(&mut self, mode: FetchMode, rownum: Option<usize>) -> Result<Option<Row>> {
      let mut slot = None;
      match self.fetch_into(&mut slot, mode, rownum)? {
         FetchStatus::Fetched => Ok(slot),
         FetchStatus::Exhausted => Ok(None),
      }
   }

   /// Like [`QueryResult::fetch_row`], writing into a caller owned slot.
   pub fn fetch_into(
      &mut self,
      slot: &mut Option<Row>,
      mode: FetchMode,
      rownum: Option<usize>,
   ) -> Result<FetchStatus> {
      let mode = match mode {
         FetchMode::Default => self.fetch_mode,
         other => other,
      };

      let mut rownum = rownum;
      if rownum.is_none()
         && let Some((offset, count)) = self.limit
      {
         let counter = *self.row_counter.get_or_insert(offset);
         if counter >= offset.saturating_add(count) {
            if self.autofree && self.handle.is_some() {
               self.free()?;
            }
            *slot = None;
            return Ok(FetchStatus::Exhausted);
         }

         if self.limit_strategy == LimitStrategy::Emulate {
            rownum = Some(counter);
         }
         self.row_counter = Some(counter + 1);
      }

      let handle = self.handle.as_mut().ok_or_else(Self::no_statement)?;
      let status = self.driver.fetch_into(handle, slot, mode, rownum)?;

      if status == FetchStatus::Exhausted && self.autofree {
         self.free()?;
      }
      Ok(status)
   }

   /// Fetch the next row by name and deserialize it into `T`.
   pub fn fetch_record<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
      self
         .fetch_row(FetchMode::Object, None)?
         .map(Row::deserialize)
         .transpose()
   }

   pub fn num_cols(&self) -> Result<usize> {
      let handle = self.handle.as_ref().ok_or_else(Self::no_statement)?;
      self.driver.num_cols(handle)
   }

   /// Number of rows in the result set.
   ///
   /// With the `numrows` portability option the query is executed again and
   /// its rows counted, for backends that cannot report a count.
   pub fn num_rows(&self) -> Result<u64> {
      if self.driver.options().portability.numrows {
         let Outcome::Fetchable(mut rerun) = self.driver.query(&self.query, &self.parameters)? else {
            return Ok(0);
         };

         let mut slot = None;
         let mut count = 0;
         while rerun.fetch_into(&mut slot, FetchMode::Ordered, None)? == FetchStatus::Fetched {
            count += 1;
         }
         return Ok(count);
      }

      let handle = self.handle.as_ref().ok_or_else(Self::no_statement)?;
      self.driver.num_rows(handle)
   }

   /// Multiple result sets are not supported.
   pub fn next_result(&mut self) -> bool {
      false
   }

   /// Release the statement. The cursor cannot fetch afterwards.
   pub fn free(&mut self) -> Result<()> {
      let mut handle = self.handle.take().ok_or_else(Self::no_statement)?;
      self.driver.free_result(&mut handle)
   }

   pub fn is_freed(&self) -> bool {
      self.handle.is_none()
   }

   pub fn table_info(&self, mode: TableInfoMode) -> Result<TableInfo> {
      let handle = self.handle.as_ref().ok_or_else(Self::no_statement)?;
      self.driver.table_info(TableSource::Handle(handle), mode)
   }

   /// Query text captured at creation; the template for parameterized queries
   pub fn query(&self) -> &str {
      &self.query
   }

   pub fn parameters(&self) -> &[JsonValue] {
      &self.parameters
   }

   /// Position inside the limit window, once fetching has started
   pub fn row_counter(&self) -> Option<usize> {
      self.row_counter
   }

   pub fn statement(&self) -> Option<&StatementHandle> {
      self.handle.as_ref()
   }

   pub fn driver(&self) -> &Driver {
      &self.driver
   }
}

impl Iterator for QueryResult {
   type Item = Result<Row>;

   fn next(&mut self) -> Option<Self::Item> {
      if self.handle.is_none() {
         return None;
      }
      self.fetch_row(FetchMode::Default, None).transpose()
   }
}
