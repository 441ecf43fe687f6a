//! Result set iteration.
//!
//! The `Cursor` trait defines the common interface for walking query results;
//! `Rows` implements it over the result sets of an executed `Statement`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cli::column::{describe, BoundColumn};
use crate::cli::handle::{CliStatement, CliStatementExt, FreeStmt};
use crate::cli::types::{Column, ColumnInfo, ColumnMetadata, Row, ScanType, Value};
use crate::error::{Error, Result};
use crate::statement::{Statement, StatementState};

/// Base trait for all cursor types.
///
/// # Example
///
/// ```no_run
/// use db2_cli_rs::{Cursor, Row};
///
/// fn count_rows<C: Cursor<Item = Row>>(cursor: &mut C) -> db2_cli_rs::Result<u64> {
///     let mut count = 0;
///     while cursor.next()?.is_some() {
///         count += 1;
///     }
///     Ok(count)
/// }
/// ```
pub trait Cursor {
    /// The type of item this cursor yields.
    type Item;

    /// Columns of the current result set.
    fn columns(&self) -> &[Column];

    /// Number of rows fetched so far.
    fn rowcount(&self) -> u64;

    fn is_closed(&self) -> bool;

    /// Get the next item. Returns `Ok(None)` when the result set is exhausted.
    fn next(&mut self) -> Result<Option<Self::Item>>;

    /// Close the cursor and release the statement's buffers.
    fn close(&mut self) -> Result<()>;

    /// Fetch the remaining items of the current result set.
    fn fetch_all(&mut self) -> Result<Vec<Self::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next()? {
            items.push(item);
        }
        Ok(items)
    }
}

/// Rows of an executed statement.
///
/// Borrows the statement mutably, so only one result set is open per
/// statement. Fixed-size and sized columns are bound once per result set and
/// filled by each fetch; unsized columns are read on demand.
///
/// Dropping `Rows` closes it; call [`Cursor::close`] to observe errors.
pub struct Rows<'s, H: CliStatement> {
    stmt: &'s mut Statement<H>,
    columns: Vec<BoundColumn>,
    info: Arc<ColumnInfo>,
    rows_fetched: u64,
    exhausted: bool,
    closed: bool,
}

impl<'s, H: CliStatement> Rows<'s, H> {
    /// Describe and bind the columns of the statement's current result set.
    pub(crate) fn open(stmt: &'s mut Statement<H>) -> Result<Self> {
        let columns = bind_columns(stmt.handle.as_ref())?;
        if columns.is_empty() {
            return Err(Error::NoResultSet);
        }
        debug!(columns = columns.len(), "result set opened");
        let info = Arc::new(column_info(&columns));
        Ok(Self {
            stmt,
            columns,
            info,
            rows_fetched: 0,
            exhausted: false,
            closed: false,
        })
    }

    pub fn column_info(&self) -> &Arc<ColumnInfo> {
        &self.info
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.info.column_names()
    }

    pub fn num_columns(&self) -> usize {
        self.info.len()
    }

    /// Fetch the next row into `dest`, one value per column.
    ///
    /// Returns `false` at the end of the result set.
    pub fn next_into(&mut self, dest: &mut [Value]) -> Result<bool> {
        if dest.len() < self.columns.len() {
            return Err(Error::ColumnIndexOutOfBounds {
                index: self.columns.len() - 1,
                count: dest.len(),
            });
        }
        match self.fetch_values()? {
            Some(values) => {
                for (slot, value) in dest.iter_mut().zip(values) {
                    *slot = value;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Advance to the next result set of a multi-result statement.
    ///
    /// Returns `false` when there are no more result sets.
    pub fn next_result_set(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        let handle = Arc::clone(&self.stmt.handle);
        self.unbind_columns();
        // nothing is bound until the next set is described
        self.info = Arc::new(ColumnInfo::default());
        self.exhausted = true;

        let ret = handle.more_results();
        if ret.is_no_data() {
            return Ok(false);
        }
        handle.check(ret)?;

        self.columns = bind_columns(handle.as_ref())?;
        self.info = Arc::new(column_info(&self.columns));
        self.exhausted = false;
        debug!(columns = self.columns.len(), "moved to next result set");
        Ok(true)
    }

    /// Column at 0-based `index`.
    pub fn column(&self, index: usize) -> Result<&Column> {
        self.info.get(index).ok_or(Error::ColumnIndexOutOfBounds {
            index,
            count: self.info.len(),
        })
    }

    /// Database type name of the column, e.g. `"VARCHAR"`.
    pub fn column_type_name(&self, index: usize) -> Result<&'static str> {
        Ok(self.column(index)?.type_name())
    }

    /// `None` when the driver does not know.
    pub fn column_nullable(&self, index: usize) -> Result<Option<bool>> {
        Ok(self.column(index)?.nullable)
    }

    /// Precision and scale, for columns with a non-zero scale.
    pub fn column_precision_scale(&self, index: usize) -> Result<Option<(usize, i16)>> {
        Ok(self.column(index)?.precision_scale())
    }

    /// Declared length, for variable-length columns.
    pub fn column_length(&self, index: usize) -> Result<Option<usize>> {
        Ok(self.column(index)?.length())
    }

    pub fn column_scan_type(&self, index: usize) -> Result<ScanType> {
        Ok(self.column(index)?.scan_type())
    }

    fn fetch_values(&mut self) -> Result<Option<Vec<Value>>> {
        if self.closed || self.exhausted {
            return Ok(None);
        }
        let handle = self.stmt.handle.as_ref();
        let ret = handle.fetch();
        if ret.is_no_data() {
            self.exhausted = true;
            return Ok(None);
        }
        handle.check(ret)?;

        let options = &self.stmt.options;
        let values = self
            .columns
            .iter()
            .map(|column| column.value(handle, options))
            .collect::<Result<Vec<_>>>()?;
        self.rows_fetched += 1;
        Ok(Some(values))
    }

    fn unbind_columns(&mut self) {
        if self.columns.is_empty() {
            return;
        }
        let ret = self.stmt.handle.free_stmt(FreeStmt::Unbind);
        if !ret.is_success() {
            warn!(ret = ret.0, "SQL_UNBIND failed");
        }
        self.columns.clear();
    }
}

impl<H: CliStatement> Cursor for Rows<'_, H> {
    type Item = Row;

    fn columns(&self) -> &[Column] {
        &self.info.columns
    }

    fn rowcount(&self) -> u64 {
        self.rows_fetched
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn next(&mut self) -> Result<Option<Row>> {
        Ok(self
            .fetch_values()?
            .map(|values| Row::new(values, Arc::clone(&self.info))))
    }

    /// Unbind columns, reset parameters, then close the cursor.
    ///
    /// All three steps run; the first failure is returned.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let handle = Arc::clone(&self.stmt.handle);
        let mut first_err = None;
        for option in [FreeStmt::Unbind, FreeStmt::ResetParams, FreeStmt::Close] {
            let ret = handle.free_stmt(option);
            match option {
                FreeStmt::Unbind => self.columns.clear(),
                FreeStmt::ResetParams => self.stmt.params.clear(),
                FreeStmt::Close => {}
            }
            if !ret.is_success() && first_err.is_none() {
                first_err = Some(Error::from_diagnostics(&handle.diagnostics()));
            }
        }
        self.stmt.set_state(StatementState::Prepared);
        debug!(rows = self.rows_fetched, "result set closed");
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<H: CliStatement> Drop for Rows<'_, H> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close result set");
        }
    }
}

/// Describe, allocate and bind every column of the current result set.
///
/// On failure, columns bound so far are unbound before their buffers drop.
fn bind_columns<H: CliStatement + ?Sized>(handle: &H) -> Result<Vec<BoundColumn>> {
    let (ret, count) = handle.num_result_cols();
    handle.check(ret)?;

    let count = count.max(0) as u16;
    let mut columns: Vec<BoundColumn> = Vec::with_capacity(count as usize);
    for ordinal in 1..=count {
        let bound = describe(handle, ordinal)
            .and_then(BoundColumn::allocate)
            .and_then(|mut column| column.bind(handle).map(|_| column));
        match bound {
            Ok(column) => columns.push(column),
            Err(err) => {
                if !columns.is_empty() {
                    let ret = handle.free_stmt(FreeStmt::Unbind);
                    if !ret.is_success() {
                        warn!(ret = ret.0, ordinal, "SQL_UNBIND after failed column bind failed");
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(columns)
}

fn column_info(columns: &[BoundColumn]) -> ColumnInfo {
    let metadata: Vec<ColumnMetadata> = columns.iter().map(|c| c.meta.clone()).collect();
    ColumnInfo::from_metadata(&metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::constants::*;
    use crate::cli::mock::{MockCall, MockCell, MockColumn, MockOp, MockResultSet, MockStatement};
    use tokio_util::sync::CancellationToken;

    fn two_column_set() -> MockResultSet {
        MockResultSet::new(vec![
            MockColumn::new("ID", SQL_INTEGER, 10),
            MockColumn::new("NAME", SQL_VARCHAR, 20),
        ])
        .with_row(vec![MockCell::long(1), MockCell::text("alpha")])
        .with_row(vec![MockCell::long(2), MockCell::null()])
    }

    #[tokio::test]
    async fn test_rows_iterate_and_exhaust() {
        let mut stmt = Statement::new(MockStatement::new().with_result_set(two_column_set()));
        stmt.execute(&CancellationToken::new()).await.unwrap();
        let mut rows = stmt.result_set().await.unwrap();

        assert_eq!(rows.column_names(), vec!["ID", "NAME"]);
        let first = rows.next().unwrap().unwrap();
        assert_eq!(first.get(0), Some(&Value::Int32(1)));
        assert_eq!(first.get_by_name("name"), Some(&Value::String("alpha".into())));
        let second = rows.next().unwrap().unwrap();
        assert!(second.get(1).unwrap().is_null());
        assert!(rows.next().unwrap().is_none());
        assert!(rows.next().unwrap().is_none());
        assert_eq!(rows.rowcount(), 2);
    }

    #[tokio::test]
    async fn test_close_order() {
        let mut stmt = Statement::new(MockStatement::new().with_result_set(two_column_set()));
        stmt.execute(&CancellationToken::new()).await.unwrap();
        let mut rows = stmt.result_set().await.unwrap();
        rows.stmt.handle().clear_calls();
        rows.close().unwrap();
        assert!(rows.is_closed());
        assert_eq!(
            rows.stmt.handle().calls(),
            vec![
                MockCall::FreeStmt(FreeStmt::Unbind),
                MockCall::FreeStmt(FreeStmt::ResetParams),
                MockCall::FreeStmt(FreeStmt::Close),
            ]
        );
        // second close is a no-op
        rows.close().unwrap();
        drop(rows);
        assert_eq!(stmt.handle().calls().len(), 3);
        assert_eq!(stmt.state(), StatementState::Prepared);
    }

    #[tokio::test]
    async fn test_failed_more_results_clears_columns() {
        let mut stmt = Statement::new(MockStatement::new().with_result_set(two_column_set()));
        stmt.execute(&CancellationToken::new()).await.unwrap();
        let mut rows = stmt.result_set().await.unwrap();
        assert_eq!(rows.num_columns(), 2);

        rows.stmt.handle().fail_next(
            MockOp::MoreResults,
            crate::cli::handle::DiagRecord::new("HY010", -99999, "function sequence error"),
        );
        let err = rows.next_result_set().unwrap_err();
        assert_eq!(err.sql_state(), Some("HY010"));
        assert!(rows.columns().is_empty());
        assert_eq!(rows.num_columns(), 0);
        assert!(rows.next().unwrap().is_none());
        assert!(!rows.stmt.handle().calls().contains(&MockCall::Fetch));
    }

    #[tokio::test]
    async fn test_no_result_set() {
        let mut stmt = Statement::new(MockStatement::new());
        stmt.execute(&CancellationToken::new()).await.unwrap();
        assert!(matches!(stmt.result_set().await, Err(Error::NoResultSet)));
    }

    #[tokio::test]
    async fn test_next_into_requires_room() {
        let mut stmt = Statement::new(MockStatement::new().with_result_set(two_column_set()));
        stmt.execute(&CancellationToken::new()).await.unwrap();
        let mut rows = stmt.result_set().await.unwrap();

        let mut short = vec![Value::Null];
        assert!(matches!(
            rows.next_into(&mut short),
            Err(Error::ColumnIndexOutOfBounds { index: 1, count: 1 })
        ));

        let mut dest = vec![Value::Null, Value::Null];
        assert!(rows.next_into(&mut dest).unwrap());
        assert_eq!(dest[1], Value::String("alpha".into()));
    }

    #[tokio::test]
    async fn test_column_introspection_out_of_range() {
        let mut stmt = Statement::new(MockStatement::new().with_result_set(two_column_set()));
        stmt.execute(&CancellationToken::new()).await.unwrap();
        let rows = stmt.result_set().await.unwrap();
        assert_eq!(rows.column_type_name(1).unwrap(), "VARCHAR");
        assert!(matches!(
            rows.column_type_name(2),
            Err(Error::ColumnIndexOutOfBounds { index: 2, count: 2 })
        ));
    }
}
