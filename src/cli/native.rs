//! `libdb2` backend.
//!
//! Thin `CliStatement` implementation over the IBM DB2 call-level interface.
//! Only statement-level calls live here; connecting and preparing belong to
//! the connection layer, which hands prepared handles to
//! [`NativeStatement::from_raw`].

use std::ffi::c_void;
use std::ptr;

use crate::cli::constants::*;
use crate::cli::handle::{
    CliStatement, ColumnDescription, DiagRecord, FreeStmt, ParamDescription, ParameterBinding,
    SqlReturn,
};
use crate::error::{Error, Result};

/// Raw CLI handle (`SQLHANDLE`).
pub type SqlHandle = *mut c_void;

#[link(name = "db2")]
extern "C" {
    fn SQLAllocHandle(handle_type: i16, input: SqlHandle, output: *mut SqlHandle) -> i16;
    fn SQLFreeHandle(handle_type: i16, handle: SqlHandle) -> i16;
    fn SQLSetEnvAttr(env: SqlHandle, attribute: i32, value: *mut c_void, length: i32) -> i16;
    fn SQLGetDiagRecW(
        handle_type: i16,
        handle: SqlHandle,
        record: i16,
        sql_state: *mut u16,
        native_error: *mut i32,
        message: *mut u16,
        buffer_len: i16,
        text_len: *mut i16,
    ) -> i16;
    fn SQLDescribeColW(
        stmt: SqlHandle,
        column: u16,
        name: *mut u16,
        buffer_len: i16,
        name_len: *mut i16,
        data_type: *mut i16,
        column_size: *mut usize,
        decimal_digits: *mut i16,
        nullable: *mut i16,
    ) -> i16;
    fn SQLBindCol(
        stmt: SqlHandle,
        column: u16,
        c_type: i16,
        target: *mut c_void,
        buffer_len: isize,
        indicator: *mut isize,
    ) -> i16;
    fn SQLGetData(
        stmt: SqlHandle,
        column: u16,
        c_type: i16,
        target: *mut c_void,
        buffer_len: isize,
        indicator: *mut isize,
    ) -> i16;
    fn SQLDescribeParam(
        stmt: SqlHandle,
        number: u16,
        data_type: *mut i16,
        parameter_size: *mut usize,
        decimal_digits: *mut i16,
        nullable: *mut i16,
    ) -> i16;
    fn SQLBindParameter(
        stmt: SqlHandle,
        number: u16,
        direction: i16,
        c_type: i16,
        sql_type: i16,
        column_size: usize,
        decimal_digits: i16,
        value: *mut c_void,
        buffer_len: isize,
        indicator: *mut isize,
    ) -> i16;
    fn SQLExecute(stmt: SqlHandle) -> i16;
    fn SQLCancel(stmt: SqlHandle) -> i16;
    fn SQLFetch(stmt: SqlHandle) -> i16;
    fn SQLRowCount(stmt: SqlHandle, count: *mut isize) -> i16;
    fn SQLNumResultCols(stmt: SqlHandle, count: *mut i16) -> i16;
    fn SQLNumParams(stmt: SqlHandle, count: *mut i16) -> i16;
    fn SQLMoreResults(stmt: SqlHandle) -> i16;
    fn SQLFreeStmt(stmt: SqlHandle, option: u16) -> i16;
}

/// Process-wide CLI environment.
///
/// Create one at startup and pass it to the connection layer; the
/// environment handle is freed on drop, so it must outlive every connection
/// allocated from it.
#[derive(Debug)]
pub struct Environment {
    henv: SqlHandle,
}

// SAFETY: the CLI environment handle is thread-safe once allocated.
unsafe impl Send for Environment {}
unsafe impl Sync for Environment {}

impl Environment {
    /// Allocate the environment handle and select ODBC 3 behaviour.
    pub fn new() -> Result<Self> {
        let mut henv: SqlHandle = ptr::null_mut();
        // SAFETY: `henv` is a valid out pointer.
        let ret = SqlReturn(unsafe { SQLAllocHandle(SQL_HANDLE_ENV, ptr::null_mut(), &mut henv) });
        if !ret.is_success() {
            return Err(Error::Cli {
                sql_state: "HY001".to_string(),
                sql_code: 0,
                message: "failed to allocate CLI environment handle".to_string(),
            });
        }
        let env = Self { henv };
        // SAFETY: SQL_ATTR_ODBC_VERSION takes the version as an integer
        // smuggled through the pointer argument.
        let ret = SqlReturn(unsafe {
            SQLSetEnvAttr(
                env.henv,
                SQL_ATTR_ODBC_VERSION,
                SQL_OV_ODBC3 as *mut c_void,
                0,
            )
        });
        if !ret.is_success() {
            return Err(Error::from_diagnostics(&diagnostics(SQL_HANDLE_ENV, env.henv)));
        }
        Ok(env)
    }

    /// The raw `SQLHENV`.
    pub fn as_raw(&self) -> SqlHandle {
        self.henv
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` and freed exactly once.
        unsafe {
            SQLFreeHandle(SQL_HANDLE_ENV, self.henv);
        }
    }
}

/// A prepared statement handle owned by the connection layer.
#[derive(Debug)]
pub struct NativeStatement {
    hstmt: SqlHandle,
}

// SAFETY: CLI statement handles may move between threads; the engine never
// issues concurrent calls on one handle except `SQLCancel`, which the CLI
// allows during `SQLExecute`.
unsafe impl Send for NativeStatement {}
unsafe impl Sync for NativeStatement {}

impl NativeStatement {
    /// Wrap a prepared `SQLHSTMT`.
    ///
    /// # Safety
    ///
    /// `hstmt` must be a valid statement handle that stays allocated for the
    /// lifetime of the returned value. It is not freed on drop.
    pub unsafe fn from_raw(hstmt: SqlHandle) -> Self {
        Self { hstmt }
    }

    pub fn as_raw(&self) -> SqlHandle {
        self.hstmt
    }
}

impl CliStatement for NativeStatement {
    fn describe_col(&self, column: u16, name: &mut [u16]) -> (SqlReturn, ColumnDescription) {
        let mut name_len = 0i16;
        let mut data_type = 0i16;
        let mut column_size = 0usize;
        let mut decimal_digits = 0i16;
        let mut nullable = 0i16;
        let buffer_len = name.len().min(i16::MAX as usize) as i16;
        // SAFETY: every pointer refers to a live local or to `name`, which is
        // valid for `buffer_len` units.
        let ret = unsafe {
            SQLDescribeColW(
                self.hstmt,
                column,
                name.as_mut_ptr(),
                buffer_len,
                &mut name_len,
                &mut data_type,
                &mut column_size,
                &mut decimal_digits,
                &mut nullable,
            )
        };
        (
            SqlReturn(ret),
            ColumnDescription {
                name_len: name_len.max(0) as usize,
                data_type,
                column_size,
                decimal_digits,
                nullable,
            },
        )
    }

    unsafe fn bind_col(
        &self,
        column: u16,
        c_type: i16,
        target: *mut u8,
        buffer_len: isize,
        indicator: *mut isize,
    ) -> SqlReturn {
        SqlReturn(SQLBindCol(
            self.hstmt,
            column,
            c_type,
            target.cast(),
            buffer_len,
            indicator,
        ))
    }

    fn get_data(
        &self,
        column: u16,
        c_type: i16,
        target: &mut [u8],
        indicator: &mut isize,
    ) -> SqlReturn {
        // SAFETY: `target` and `indicator` are valid for the whole call and
        // SQLGetData does not retain them.
        SqlReturn(unsafe {
            SQLGetData(
                self.hstmt,
                column,
                c_type,
                target.as_mut_ptr().cast(),
                target.len() as isize,
                indicator,
            )
        })
    }

    fn describe_param(&self, number: u16) -> (SqlReturn, ParamDescription) {
        let mut desc = ParamDescription::default();
        // SAFETY: out pointers refer to fields of a live local.
        let ret = unsafe {
            SQLDescribeParam(
                self.hstmt,
                number,
                &mut desc.data_type,
                &mut desc.parameter_size,
                &mut desc.decimal_digits,
                &mut desc.nullable,
            )
        };
        (SqlReturn(ret), desc)
    }

    unsafe fn bind_parameter(&self, binding: &ParameterBinding) -> SqlReturn {
        SqlReturn(SQLBindParameter(
            self.hstmt,
            binding.number,
            binding.direction.code(),
            binding.c_type,
            binding.sql_type,
            binding.column_size,
            binding.decimal_digits,
            binding.value.cast(),
            binding.buffer_len,
            binding.indicator,
        ))
    }

    fn execute(&self) -> SqlReturn {
        // SAFETY: the handle is valid; bound buffers are kept alive by the caller.
        SqlReturn(unsafe { SQLExecute(self.hstmt) })
    }

    fn cancel(&self) -> SqlReturn {
        // SAFETY: the handle is valid; SQLCancel may run concurrently with SQLExecute.
        SqlReturn(unsafe { SQLCancel(self.hstmt) })
    }

    fn fetch(&self) -> SqlReturn {
        // SAFETY: the handle is valid; bound column buffers are kept alive by the caller.
        SqlReturn(unsafe { SQLFetch(self.hstmt) })
    }

    fn row_count(&self) -> (SqlReturn, isize) {
        let mut count = 0isize;
        // SAFETY: `count` is a valid out pointer.
        let ret = unsafe { SQLRowCount(self.hstmt, &mut count) };
        (SqlReturn(ret), count)
    }

    fn num_result_cols(&self) -> (SqlReturn, i16) {
        let mut count = 0i16;
        // SAFETY: `count` is a valid out pointer.
        let ret = unsafe { SQLNumResultCols(self.hstmt, &mut count) };
        (SqlReturn(ret), count)
    }

    fn num_params(&self) -> (SqlReturn, i16) {
        let mut count = 0i16;
        // SAFETY: `count` is a valid out pointer.
        let ret = unsafe { SQLNumParams(self.hstmt, &mut count) };
        (SqlReturn(ret), count)
    }

    fn more_results(&self) -> SqlReturn {
        // SAFETY: the handle is valid.
        SqlReturn(unsafe { SQLMoreResults(self.hstmt) })
    }

    fn free_stmt(&self, option: FreeStmt) -> SqlReturn {
        // SAFETY: the handle is valid; the caller drops released buffers afterwards.
        SqlReturn(unsafe { SQLFreeStmt(self.hstmt, option.code()) })
    }

    fn diagnostics(&self) -> Vec<DiagRecord> {
        diagnostics(SQL_HANDLE_STMT, self.hstmt)
    }
}

/// Read every diagnostic record attached to `handle`.
fn diagnostics(handle_type: i16, handle: SqlHandle) -> Vec<DiagRecord> {
    let mut records = Vec::new();
    for record in 1..=i16::MAX {
        let mut state = [0u16; 6];
        let mut native_error = 0i32;
        let mut message = vec![0u16; SQL_MAX_MESSAGE_LENGTH];
        let mut text_len = 0i16;
        // SAFETY: `state` holds five units plus terminator; `message` is
        // valid for its full length.
        let ret = SqlReturn(unsafe {
            SQLGetDiagRecW(
                handle_type,
                handle,
                record,
                state.as_mut_ptr(),
                &mut native_error,
                message.as_mut_ptr(),
                message.len() as i16,
                &mut text_len,
            )
        });
        if !ret.is_success() {
            break;
        }
        let text_len = (text_len.max(0) as usize).min(message.len());
        records.push(DiagRecord::new(
            String::from_utf16_lossy(&state[..5]),
            native_error,
            String::from_utf16_lossy(&message[..text_len]),
        ));
    }
    records
}
