//! The statement-handle seam between the engine and the native CLI.
//!
//! `CliStatement` mirrors the subset of DB2 CLI calls the engine issues
//! against one prepared statement handle. The native backend forwards each
//! method to `libdb2`; the test backend scripts them in-process.
//!
//! # Buffer contract
//!
//! `bind_col` and `bind_parameter` hand raw pointers to the implementation.
//! The native library keeps those pointers and reads or writes through them
//! during later `fetch`/`execute` calls, so the memory they point to must stay
//! allocated and must not move until the binding is released (`free_stmt`
//! with `SQL_UNBIND`/`SQL_RESET_PARAMS`) or the call that uses it returns.

use crate::cli::constants::*;
use crate::error::{Error, Result};

/// Return code of a CLI call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlReturn(pub i16);

impl SqlReturn {
    pub const SUCCESS: SqlReturn = SqlReturn(SQL_SUCCESS);
    pub const SUCCESS_WITH_INFO: SqlReturn = SqlReturn(SQL_SUCCESS_WITH_INFO);
    pub const STILL_EXECUTING: SqlReturn = SqlReturn(SQL_STILL_EXECUTING);
    pub const NO_DATA: SqlReturn = SqlReturn(SQL_NO_DATA);
    pub const ERROR: SqlReturn = SqlReturn(SQL_ERROR);
    pub const INVALID_HANDLE: SqlReturn = SqlReturn(SQL_INVALID_HANDLE);

    /// `SQL_SUCCESS` or `SQL_SUCCESS_WITH_INFO`.
    pub fn is_success(self) -> bool {
        self.0 == SQL_SUCCESS || self.0 == SQL_SUCCESS_WITH_INFO
    }

    pub fn is_success_with_info(self) -> bool {
        self.0 == SQL_SUCCESS_WITH_INFO
    }

    pub fn is_no_data(self) -> bool {
        self.0 == SQL_NO_DATA
    }
}

/// One diagnostic record (`SQLGetDiagRec`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagRecord {
    /// Five character SQLSTATE.
    pub sql_state: String,
    /// Vendor SQLCODE.
    pub native_error: i32,
    /// Message text.
    pub message: String,
}

impl DiagRecord {
    pub fn new(sql_state: impl Into<String>, native_error: i32, message: impl Into<String>) -> Self {
        Self {
            sql_state: sql_state.into(),
            native_error,
            message: message.into(),
        }
    }
}

/// Output of `SQLDescribeCol`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDescription {
    /// Full length of the column name in UTF-16 units, even when truncated.
    pub name_len: usize,
    pub data_type: i16,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: i16,
}

/// Output of `SQLDescribeParam`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamDescription {
    pub data_type: i16,
    pub parameter_size: usize,
    pub decimal_digits: i16,
    pub nullable: i16,
}

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    Input,
    InputOutput,
    Output,
}

impl ParamDirection {
    /// CLI code for `SQLBindParameter`.
    pub fn code(self) -> i16 {
        match self {
            ParamDirection::Input => SQL_PARAM_INPUT,
            ParamDirection::InputOutput => SQL_PARAM_INPUT_OUTPUT,
            ParamDirection::Output => SQL_PARAM_OUTPUT,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            SQL_PARAM_INPUT => Some(ParamDirection::Input),
            SQL_PARAM_INPUT_OUTPUT => Some(ParamDirection::InputOutput),
            SQL_PARAM_OUTPUT => Some(ParamDirection::Output),
            _ => None,
        }
    }

    /// Whether the native library writes into the buffer during execute.
    pub fn is_output(self) -> bool {
        !matches!(self, ParamDirection::Input)
    }
}

/// Arguments of one `SQLBindParameter` call.
#[derive(Debug, Clone, Copy)]
pub struct ParameterBinding {
    /// 1-based parameter number.
    pub number: u16,
    pub direction: ParamDirection,
    pub c_type: i16,
    pub sql_type: i16,
    pub column_size: usize,
    pub decimal_digits: i16,
    /// Start of the transfer buffer; dangling (never null) for empty buffers.
    pub value: *mut u8,
    pub buffer_len: isize,
    pub indicator: *mut isize,
}

/// Options for `SQLFreeStmt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeStmt {
    Close,
    Unbind,
    ResetParams,
}

impl FreeStmt {
    pub fn code(self) -> u16 {
        match self {
            FreeStmt::Close => SQL_CLOSE,
            FreeStmt::Unbind => SQL_UNBIND,
            FreeStmt::ResetParams => SQL_RESET_PARAMS,
        }
    }
}

/// A prepared statement handle of the native CLI.
///
/// Every method takes `&self`: the engine never runs two calls against the
/// same handle at once, except `cancel`, which the CLI explicitly allows
/// from another thread while `execute` is outstanding.
pub trait CliStatement: Send + Sync + 'static {
    /// `SQLDescribeColW`; writes up to `name.len()` UTF-16 units of the name.
    fn describe_col(&self, column: u16, name: &mut [u16]) -> (SqlReturn, ColumnDescription);

    /// `SQLBindCol`.
    ///
    /// # Safety
    ///
    /// `target` must be valid for `buffer_len` bytes and `indicator` for one
    /// `isize`; both must stay allocated and in place until the column is
    /// unbound.
    unsafe fn bind_col(
        &self,
        column: u16,
        c_type: i16,
        target: *mut u8,
        buffer_len: isize,
        indicator: *mut isize,
    ) -> SqlReturn;

    /// `SQLGetData` for a column that has no bound buffer.
    fn get_data(
        &self,
        column: u16,
        c_type: i16,
        target: &mut [u8],
        indicator: &mut isize,
    ) -> SqlReturn;

    /// `SQLDescribeParam`.
    fn describe_param(&self, number: u16) -> (SqlReturn, ParamDescription);

    /// `SQLBindParameter`.
    ///
    /// # Safety
    ///
    /// `binding.value` must be valid for `binding.buffer_len` bytes and
    /// `binding.indicator` for one `isize`; both must stay allocated and in
    /// place until the parameters are reset or the execute that uses them
    /// has returned.
    unsafe fn bind_parameter(&self, binding: &ParameterBinding) -> SqlReturn;

    /// `SQLExecute`. Blocks until the statement finishes or is cancelled.
    fn execute(&self) -> SqlReturn;

    /// `SQLCancel`. Safe to call from another thread while `execute` runs.
    fn cancel(&self) -> SqlReturn;

    /// `SQLFetch`.
    fn fetch(&self) -> SqlReturn;

    /// `SQLRowCount`.
    fn row_count(&self) -> (SqlReturn, isize);

    /// `SQLNumResultCols`.
    fn num_result_cols(&self) -> (SqlReturn, i16);

    /// `SQLNumParams`.
    fn num_params(&self) -> (SqlReturn, i16);

    /// `SQLMoreResults`.
    fn more_results(&self) -> SqlReturn;

    /// `SQLFreeStmt`.
    fn free_stmt(&self, option: FreeStmt) -> SqlReturn;

    /// Diagnostic records left by the most recent call on this handle.
    fn diagnostics(&self) -> Vec<DiagRecord>;
}

/// Convenience checks shared by every `CliStatement`.
pub trait CliStatementExt: CliStatement {
    /// Map a failed return code to an `Error` built from diagnostics.
    fn check(&self, ret: SqlReturn) -> Result<SqlReturn> {
        if ret.is_success() {
            Ok(ret)
        } else {
            Err(Error::from_diagnostics(&self.diagnostics()))
        }
    }

    /// SQLSTATE of the first diagnostic record, if any.
    fn first_sql_state(&self) -> Option<String> {
        self.diagnostics().into_iter().next().map(|r| r.sql_state)
    }
}

impl<T: CliStatement + ?Sized> CliStatementExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_return_success() {
        assert!(SqlReturn::SUCCESS.is_success());
        assert!(SqlReturn::SUCCESS_WITH_INFO.is_success());
        assert!(SqlReturn::SUCCESS_WITH_INFO.is_success_with_info());
        assert!(!SqlReturn::ERROR.is_success());
        assert!(!SqlReturn::NO_DATA.is_success());
        assert!(SqlReturn::NO_DATA.is_no_data());
    }

    #[test]
    fn test_param_direction_codes() {
        for dir in [
            ParamDirection::Input,
            ParamDirection::InputOutput,
            ParamDirection::Output,
        ] {
            assert_eq!(ParamDirection::from_code(dir.code()), Some(dir));
        }
        assert!(!ParamDirection::Input.is_output());
        assert!(ParamDirection::InputOutput.is_output());
        assert_eq!(ParamDirection::from_code(3), None);
    }
}
