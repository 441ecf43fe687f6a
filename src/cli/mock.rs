//! In-process scripted statement handle for tests.
//!
//! `MockStatement` honours the same buffer contract as the native library:
//! `fetch` writes through the pointers registered with `bind_col`, `execute`
//! reads and writes through the pointers registered with `bind_parameter`,
//! `get_data` hands out a value piecewise with CLI truncation semantics, and
//! `cancel` interrupts an `execute` blocked on another thread.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::cli::constants::*;
use crate::cli::decode::{self, wide};
use crate::cli::handle::{
    CliStatement, ColumnDescription, DiagRecord, FreeStmt, ParamDescription, ParamDirection,
    ParameterBinding, SqlReturn,
};
use crate::cli::types::SqlType;

/// A scripted cell: `None` is NULL, otherwise the bytes in the column's
/// transfer layout (text without terminator).
#[derive(Debug, Clone, PartialEq)]
pub struct MockCell(pub Option<Vec<u8>>);

impl MockCell {
    pub fn null() -> Self {
        MockCell(None)
    }

    pub fn bit(v: bool) -> Self {
        MockCell(Some(vec![v as u8]))
    }

    pub fn long(v: i32) -> Self {
        MockCell(Some(v.to_ne_bytes().to_vec()))
    }

    pub fn bigint(v: i64) -> Self {
        MockCell(Some(v.to_ne_bytes().to_vec()))
    }

    pub fn double(v: f64) -> Self {
        MockCell(Some(v.to_ne_bytes().to_vec()))
    }

    /// Narrow character text.
    pub fn text(v: &str) -> Self {
        MockCell(Some(v.as_bytes().to_vec()))
    }

    /// UTF-16 text.
    pub fn wide(v: &str) -> Self {
        let mut bytes = wide::encode_utf16z(v);
        bytes.truncate(bytes.len() - 2);
        MockCell(Some(bytes))
    }

    pub fn bytes(v: &[u8]) -> Self {
        MockCell(Some(v.to_vec()))
    }

    /// Years a `DATE_STRUCT` cannot hold script a NULL.
    pub fn date(v: NaiveDate) -> Self {
        MockCell(decode::encode_date(v).ok().map(|b| b.to_vec()))
    }

    pub fn time(v: NaiveTime) -> Self {
        MockCell(Some(decode::encode_time(v).to_vec()))
    }

    pub fn timestamp(v: NaiveDateTime) -> Self {
        MockCell(decode::encode_timestamp(v, 9).ok().map(|b| b.to_vec()))
    }
}

/// Description of a scripted result column.
#[derive(Debug, Clone)]
pub struct MockColumn {
    pub name: String,
    pub sql_type: i16,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: i16,
    /// Report `SQL_NO_TOTAL` instead of the remaining length on truncation.
    pub unknown_total: bool,
    /// Most bytes handed out by each successive `get_data` call, whatever
    /// the buffer size. Calls past the end of the list are unlimited.
    pub chunks: Vec<usize>,
}

impl MockColumn {
    pub fn new(name: &str, sql_type: i16, column_size: usize) -> Self {
        Self {
            name: name.to_string(),
            sql_type,
            column_size,
            decimal_digits: 0,
            nullable: SQL_NULLABLE,
            unknown_total: false,
            chunks: Vec::new(),
        }
    }

    pub fn with_decimal_digits(mut self, digits: i16) -> Self {
        self.decimal_digits = digits;
        self
    }

    pub fn with_nullable(mut self, nullable: i16) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_unknown_total(mut self) -> Self {
        self.unknown_total = true;
        self
    }

    /// Hand out the value in pieces of at most these sizes.
    pub fn with_chunks(mut self, chunks: impl IntoIterator<Item = usize>) -> Self {
        self.chunks = chunks.into_iter().collect();
        self
    }
}

/// A scripted result set.
#[derive(Debug, Clone, Default)]
pub struct MockResultSet {
    pub columns: Vec<MockColumn>,
    pub rows: Vec<Vec<MockCell>>,
}

impl MockResultSet {
    pub fn new(columns: Vec<MockColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<MockCell>) -> Self {
        self.rows.push(row);
        self
    }
}

/// A recorded call against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    DescribeCol(u16),
    BindCol(u16),
    GetData { column: u16, buffer_len: usize },
    DescribeParam(u16),
    BindParameter(u16),
    Execute,
    Cancel,
    Fetch,
    RowCount,
    NumResultCols,
    NumParams,
    MoreResults,
    FreeStmt(FreeStmt),
}

/// Operations a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    DescribeCol,
    BindCol,
    DescribeParam,
    BindParameter,
    Execute,
    Fetch,
    RowCount,
    MoreResults,
}

/// A bound parameter as seen by a scripted procedure during `execute`.
pub struct MockParam<'a> {
    pub number: u16,
    pub direction: ParamDirection,
    pub c_type: i16,
    pub sql_type: i16,
    pub column_size: usize,
    buffer: &'a mut [u8],
    indicator: Option<&'a mut isize>,
}

impl MockParam<'_> {
    fn terminator_len(&self) -> usize {
        match self.c_type {
            SQL_C_CHAR => 1,
            SQL_C_WCHAR => 2,
            _ => 0,
        }
    }

    /// Raw indicator value; `None` when no indicator was bound.
    pub fn indicator(&self) -> Option<isize> {
        self.indicator.as_deref().copied()
    }

    /// Valid input bytes, or `None` for NULL input.
    pub fn input_bytes(&self) -> Option<&[u8]> {
        match self.indicator() {
            Some(SQL_NULL_DATA) => None,
            Some(SQL_NTS) => {
                let len = match self.c_type {
                    SQL_C_WCHAR => wide::terminated_len(self.buffer),
                    _ => self
                        .buffer
                        .iter()
                        .position(|b| *b == 0)
                        .unwrap_or(self.buffer.len()),
                };
                Some(&self.buffer[..len])
            }
            Some(n) if n >= 0 => {
                Some(&self.buffer[..(n as usize).min(self.buffer.len())])
            }
            _ => Some(self.buffer),
        }
    }

    /// Input decoded as text, for character parameters.
    pub fn input_text(&self) -> Option<String> {
        let bytes = self.input_bytes()?;
        Some(match self.c_type {
            SQL_C_WCHAR => wide::decode_utf16(bytes),
            _ => String::from_utf8_lossy(bytes).into_owned(),
        })
    }

    /// Write output bytes, truncating to the buffer like the driver does.
    pub fn write_bytes(&mut self, data: &[u8]) {
        let term = self.terminator_len();
        let capacity = self.buffer.len().saturating_sub(term);
        let n = data.len().min(capacity);
        self.buffer[..n].copy_from_slice(&data[..n]);
        let buf_len = self.buffer.len();
        for b in self.buffer[n..(n + term).min(buf_len)].iter_mut() {
            *b = 0;
        }
        if let Some(ind) = self.indicator.as_deref_mut() {
            *ind = data.len() as isize;
        }
    }

    /// Write text in the parameter's character layout.
    pub fn write_text(&mut self, text: &str) {
        if self.c_type == SQL_C_WCHAR {
            let mut bytes = wide::encode_utf16z(text);
            bytes.truncate(bytes.len() - 2);
            self.write_bytes(&bytes);
        } else {
            self.write_bytes(text.as_bytes());
        }
    }

    pub fn write_null(&mut self) {
        if let Some(ind) = self.indicator.as_deref_mut() {
            *ind = SQL_NULL_DATA;
        }
    }

    /// Set the indicator without touching the buffer.
    pub fn set_indicator(&mut self, value: isize) {
        if let Some(ind) = self.indicator.as_deref_mut() {
            *ind = value;
        }
    }
}

type Procedure = Box<dyn FnMut(&mut [MockParam<'_>]) -> Result<(), DiagRecord> + Send>;

struct ColBinding {
    c_type: i16,
    target: *mut u8,
    len: usize,
    indicator: *mut isize,
}

struct GetDataProgress {
    offset: usize,
    calls: usize,
    complete: bool,
}

struct ActiveSet {
    set: MockResultSet,
    row: Option<usize>,
    progress: HashMap<u16, GetDataProgress>,
}

impl ActiveSet {
    fn new(set: MockResultSet) -> Self {
        Self {
            set,
            row: None,
            progress: HashMap::new(),
        }
    }

    fn cell(&self, column: u16) -> Option<(&MockColumn, &MockCell)> {
        let row = self.set.rows.get(self.row?)?;
        let idx = (column as usize).checked_sub(1)?;
        Some((self.set.columns.get(idx)?, row.get(idx)?))
    }
}

#[derive(Default)]
struct MockState {
    result_sets: Vec<MockResultSet>,
    queue: VecDeque<MockResultSet>,
    active: Option<ActiveSet>,
    bound_cols: BTreeMap<u16, ColBinding>,
    params: BTreeMap<u16, ParameterBinding>,
    param_descriptions: HashMap<u16, ParamDescription>,
    num_params: Option<i16>,
    procedure: Option<Procedure>,
    echo: bool,
    row_count: isize,
    execute_return: Option<SqlReturn>,
    execute_delay: Option<Duration>,
    still_executing: u32,
    failures: HashMap<MockOp, DiagRecord>,
    diagnostics: Vec<DiagRecord>,
    calls: Vec<MockCall>,
}

// SAFETY: the raw pointers are only dereferenced under the state lock while
// the engine keeps the memory they point to alive (see `CliStatement`).
unsafe impl Send for MockState {}

impl MockState {
    fn fail(&mut self, op: MockOp) -> Option<SqlReturn> {
        let record = self.failures.remove(&op)?;
        self.diagnostics = vec![record];
        Some(SqlReturn::ERROR)
    }

    fn error(&mut self, state: &str, message: &str) -> SqlReturn {
        self.diagnostics = vec![DiagRecord::new(state, -99999, message)];
        SqlReturn::ERROR
    }
}

/// Scripted `CliStatement`.
pub struct MockStatement {
    state: Mutex<MockState>,
    cancel_requested: Mutex<bool>,
    cancel_signal: Condvar,
}

impl Default for MockStatement {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStatement {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            cancel_requested: Mutex::new(false),
            cancel_signal: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Result set produced by every execute; call repeatedly for
    /// multi-result-set statements.
    pub fn with_result_set(self, set: MockResultSet) -> Self {
        self.lock().result_sets.push(set);
        self
    }

    /// What `SQLDescribeParam` reports for parameter `number`.
    pub fn with_param(self, number: u16, description: ParamDescription) -> Self {
        self.lock().param_descriptions.insert(number, description);
        self
    }

    pub fn with_num_params(self, count: i16) -> Self {
        self.lock().num_params = Some(count);
        self
    }

    /// Run `procedure` over the bound parameters on every execute.
    pub fn with_procedure<F>(self, procedure: F) -> Self
    where
        F: FnMut(&mut [MockParam<'_>]) -> Result<(), DiagRecord> + Send + 'static,
    {
        self.lock().procedure = Some(Box::new(procedure));
        self
    }

    /// Answer every execute with one row holding the input parameters.
    pub fn with_echo(self) -> Self {
        self.lock().echo = true;
        self
    }

    pub fn with_row_count(self, count: isize) -> Self {
        self.lock().row_count = count;
        self
    }

    /// Return code of a successful execute (`SQL_NO_DATA` for searched
    /// statements that touch no rows).
    pub fn with_execute_return(self, ret: SqlReturn) -> Self {
        self.lock().execute_return = Some(ret);
        self
    }

    /// Block every execute for `delay` unless cancelled.
    pub fn with_execute_delay(self, delay: Duration) -> Self {
        self.lock().execute_delay = Some(delay);
        self
    }

    /// Return `SQL_STILL_EXECUTING` from the next `times` executes.
    pub fn with_still_executing(self, times: u32) -> Self {
        self.lock().still_executing = times;
        self
    }

    /// Fail the next call of `op` with `record`.
    pub fn fail_next(&self, op: MockOp, record: DiagRecord) {
        self.lock().failures.insert(op, record);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of parameters currently registered.
    pub fn bound_params(&self) -> usize {
        self.lock().params.len()
    }

    /// Number of columns currently registered.
    pub fn bound_columns(&self) -> usize {
        self.lock().bound_cols.len()
    }

    fn record(&self, call: MockCall) -> MutexGuard<'_, MockState> {
        let mut state = self.lock();
        state.calls.push(call);
        state.diagnostics.clear();
        state
    }

    /// Wait out the configured delay; true when cancelled meanwhile.
    fn block(&self, delay: Option<Duration>) -> bool {
        let guard = self
            .cancel_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut guard = match delay {
            Some(delay) => {
                self.cancel_signal
                    .wait_timeout_while(guard, delay, |cancelled| !*cancelled)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => guard,
        };
        std::mem::replace(&mut *guard, false)
    }

    fn run_procedure(state: &mut MockState) -> Result<(), DiagRecord> {
        let echo = state.echo;
        let mut params: Vec<MockParam<'_>> = state
            .params
            .values()
            .map(|b| {
                // SAFETY: the engine keeps every registered parameter buffer
                // alive and unmoved until execute returns.
                let buffer: &mut [u8] = if b.buffer_len <= 0 {
                    &mut []
                } else {
                    unsafe { std::slice::from_raw_parts_mut(b.value, b.buffer_len as usize) }
                };
                let indicator = unsafe { b.indicator.as_mut() };
                MockParam {
                    number: b.number,
                    direction: b.direction,
                    c_type: b.c_type,
                    sql_type: b.sql_type,
                    column_size: b.column_size,
                    buffer,
                    indicator,
                }
            })
            .collect();

        if let Some(procedure) = state.procedure.as_mut() {
            procedure(&mut params)?;
        }

        if echo {
            let mut columns = Vec::with_capacity(params.len());
            let mut cells = Vec::with_capacity(params.len());
            for p in &params {
                columns.push(MockColumn::new(
                    &format!("P{}", p.number),
                    p.sql_type,
                    p.column_size,
                ));
                cells.push(MockCell(p.input_bytes().map(<[u8]>::to_vec)));
            }
            drop(params);
            state.queue = VecDeque::from(vec![MockResultSet::new(columns).with_row(cells)]);
        }
        Ok(())
    }

    fn write_bound_row(state: &mut MockState) {
        let active = match state.active.as_ref() {
            Some(active) => active,
            None => return,
        };
        for (&column, binding) in &state.bound_cols {
            let (meta, cell) = match active.cell(column) {
                Some(found) => found,
                None => continue,
            };
            let encoding = SqlType(meta.sql_type).encoding();
            // SAFETY: bound column buffers stay alive until SQL_UNBIND.
            unsafe {
                match &cell.0 {
                    None => *binding.indicator = SQL_NULL_DATA,
                    Some(data) => {
                        let term = if binding.c_type == encoding.c_type() {
                            encoding.terminator_len()
                        } else {
                            0
                        };
                        let target = std::slice::from_raw_parts_mut(binding.target, binding.len);
                        let n = data.len().min(binding.len.saturating_sub(term));
                        target[..n].copy_from_slice(&data[..n]);
                        for b in target[n..(n + term).min(binding.len)].iter_mut() {
                            *b = 0;
                        }
                        *binding.indicator = data.len() as isize;
                    }
                }
            }
        }
    }
}

fn terminator_for(c_type: i16) -> usize {
    match c_type {
        SQL_C_CHAR => 1,
        SQL_C_WCHAR => 2,
        _ => 0,
    }
}

impl CliStatement for MockStatement {
    fn describe_col(&self, column: u16, name: &mut [u16]) -> (SqlReturn, ColumnDescription) {
        let mut state = self.record(MockCall::DescribeCol(column));
        if let Some(ret) = state.fail(MockOp::DescribeCol) {
            return (ret, ColumnDescription::default());
        }
        let meta = state
            .active
            .as_ref()
            .and_then(|a| a.set.columns.get((column as usize).wrapping_sub(1)))
            .cloned();
        let meta = match meta {
            Some(meta) => meta,
            None => {
                let ret = state.error("07009", "invalid descriptor index");
                return (ret, ColumnDescription::default());
            }
        };

        let units: Vec<u16> = meta.name.encode_utf16().collect();
        let room = name.len().saturating_sub(1);
        let n = units.len().min(room);
        name[..n].copy_from_slice(&units[..n]);
        if n < name.len() {
            name[n] = 0;
        }
        let desc = ColumnDescription {
            name_len: units.len(),
            data_type: meta.sql_type,
            column_size: meta.column_size,
            decimal_digits: meta.decimal_digits,
            nullable: meta.nullable,
        };
        if units.len() > room {
            state.diagnostics = vec![DiagRecord::new(
                SQLSTATE_STRING_TRUNCATED,
                0,
                "string data right truncated",
            )];
            (SqlReturn::SUCCESS_WITH_INFO, desc)
        } else {
            (SqlReturn::SUCCESS, desc)
        }
    }

    unsafe fn bind_col(
        &self,
        column: u16,
        c_type: i16,
        target: *mut u8,
        buffer_len: isize,
        indicator: *mut isize,
    ) -> SqlReturn {
        let mut state = self.record(MockCall::BindCol(column));
        if let Some(ret) = state.fail(MockOp::BindCol) {
            return ret;
        }
        state.bound_cols.insert(
            column,
            ColBinding {
                c_type,
                target,
                len: buffer_len.max(0) as usize,
                indicator,
            },
        );
        SqlReturn::SUCCESS
    }

    fn get_data(
        &self,
        column: u16,
        c_type: i16,
        target: &mut [u8],
        indicator: &mut isize,
    ) -> SqlReturn {
        let mut state = self.record(MockCall::GetData {
            column,
            buffer_len: target.len(),
        });
        let found = state
            .active
            .as_ref()
            .and_then(|a| a.cell(column))
            .map(|(meta, cell)| (meta.unknown_total, meta.chunks.clone(), cell.0.clone()));
        let (unknown_total, chunks, data) = match found {
            Some(found) => found,
            None => return state.error("24000", "invalid cursor state"),
        };
        let data = match data {
            Some(data) => data,
            None => {
                *indicator = SQL_NULL_DATA;
                return SqlReturn::SUCCESS;
            }
        };
        let (offset, calls) = match state.active.as_ref().and_then(|a| a.progress.get(&column)) {
            Some(progress) if progress.complete => return SqlReturn::NO_DATA,
            Some(progress) => (progress.offset, progress.calls),
            None => (0, 0),
        };

        let term = terminator_for(c_type);
        let remaining = &data[offset..];
        let mut capacity = target.len().saturating_sub(term);
        if let Some(&chunk) = chunks.get(calls) {
            capacity = capacity.min(chunk);
        }
        if c_type == SQL_C_WCHAR {
            capacity &= !1;
        }
        let n = remaining.len().min(capacity);
        target[..n].copy_from_slice(&remaining[..n]);
        let target_len = target.len();
        for b in target[n..(n + term).min(target_len)].iter_mut() {
            *b = 0;
        }
        let truncated = n < remaining.len();
        *indicator = if truncated && unknown_total {
            SQL_NO_TOTAL
        } else {
            remaining.len() as isize
        };
        if let Some(active) = state.active.as_mut() {
            active.progress.insert(
                column,
                GetDataProgress {
                    offset: offset + n,
                    calls: calls + 1,
                    complete: !truncated,
                },
            );
        }

        if truncated {
            state.diagnostics = vec![DiagRecord::new(
                SQLSTATE_STRING_TRUNCATED,
                0,
                "string data right truncated",
            )];
            SqlReturn::SUCCESS_WITH_INFO
        } else {
            SqlReturn::SUCCESS
        }
    }

    fn describe_param(&self, number: u16) -> (SqlReturn, ParamDescription) {
        let mut state = self.record(MockCall::DescribeParam(number));
        if let Some(ret) = state.fail(MockOp::DescribeParam) {
            return (ret, ParamDescription::default());
        }
        match state.param_descriptions.get(&number).copied() {
            Some(desc) => (SqlReturn::SUCCESS, desc),
            None => (
                state.error("07009", "invalid parameter number"),
                ParamDescription::default(),
            ),
        }
    }

    unsafe fn bind_parameter(&self, binding: &ParameterBinding) -> SqlReturn {
        let mut state = self.record(MockCall::BindParameter(binding.number));
        if let Some(ret) = state.fail(MockOp::BindParameter) {
            return ret;
        }
        if binding.value.is_null() && binding.buffer_len > 0 {
            return state.error("HY009", "invalid use of null pointer");
        }
        state.params.insert(binding.number, *binding);
        SqlReturn::SUCCESS
    }

    fn execute(&self) -> SqlReturn {
        let delay = {
            let mut state = self.record(MockCall::Execute);
            if let Some(ret) = state.fail(MockOp::Execute) {
                return ret;
            }
            if state.still_executing > 0 {
                state.still_executing -= 1;
                return SqlReturn::STILL_EXECUTING;
            }
            state.execute_delay
        };

        if self.block(delay) {
            let mut state = self.lock();
            return state.error(SQLSTATE_OPERATION_CANCELLED, "operation canceled");
        }

        let mut state = self.lock();
        let queue: VecDeque<MockResultSet> = state.result_sets.iter().cloned().collect();
        state.active = None;
        state.queue = queue;
        if let Err(record) = Self::run_procedure(&mut state) {
            state.queue.clear();
            state.diagnostics = vec![record];
            return SqlReturn::ERROR;
        }
        state.active = state.queue.pop_front().map(ActiveSet::new);
        state.execute_return.unwrap_or(SqlReturn::SUCCESS)
    }

    fn cancel(&self) -> SqlReturn {
        drop(self.record(MockCall::Cancel));
        let mut cancelled = self
            .cancel_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.cancel_signal.notify_all();
        SqlReturn::SUCCESS
    }

    fn fetch(&self) -> SqlReturn {
        let mut state = self.record(MockCall::Fetch);
        if let Some(ret) = state.fail(MockOp::Fetch) {
            return ret;
        }
        let active = match state.active.as_mut() {
            Some(active) => active,
            None => return state.error("24000", "invalid cursor state"),
        };
        let next = active.row.map_or(0, |r| r + 1);
        if next >= active.set.rows.len() {
            active.row = Some(active.set.rows.len());
            return SqlReturn::NO_DATA;
        }
        active.row = Some(next);
        active.progress.clear();
        Self::write_bound_row(&mut state);
        SqlReturn::SUCCESS
    }

    fn row_count(&self) -> (SqlReturn, isize) {
        let mut state = self.record(MockCall::RowCount);
        if let Some(ret) = state.fail(MockOp::RowCount) {
            return (ret, 0);
        }
        (SqlReturn::SUCCESS, state.row_count)
    }

    fn num_result_cols(&self) -> (SqlReturn, i16) {
        let state = self.record(MockCall::NumResultCols);
        let count = state
            .active
            .as_ref()
            .map_or(0, |a| a.set.columns.len() as i16);
        (SqlReturn::SUCCESS, count)
    }

    fn num_params(&self) -> (SqlReturn, i16) {
        let state = self.record(MockCall::NumParams);
        let count = state.num_params.unwrap_or_else(|| {
            state
                .param_descriptions
                .keys()
                .copied()
                .max()
                .map_or(0, |n| n as i16)
        });
        (SqlReturn::SUCCESS, count)
    }

    fn more_results(&self) -> SqlReturn {
        let mut state = self.record(MockCall::MoreResults);
        if let Some(ret) = state.fail(MockOp::MoreResults) {
            return ret;
        }
        match state.queue.pop_front() {
            Some(set) => {
                state.active = Some(ActiveSet::new(set));
                SqlReturn::SUCCESS
            }
            None => {
                state.active = None;
                SqlReturn::NO_DATA
            }
        }
    }

    fn free_stmt(&self, option: FreeStmt) -> SqlReturn {
        let mut state = self.record(MockCall::FreeStmt(option));
        match option {
            FreeStmt::Close => {
                state.active = None;
                state.queue.clear();
            }
            FreeStmt::Unbind => state.bound_cols.clear(),
            FreeStmt::ResetParams => state.params.clear(),
        }
        SqlReturn::SUCCESS
    }

    fn diagnostics(&self) -> Vec<DiagRecord> {
        self.lock().diagnostics.clone()
    }
}
