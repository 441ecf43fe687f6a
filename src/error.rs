//! Error types for the DB2 CLI adapter.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::cli::constants::{
    SQLSTATE_CLASS_CONNECTION, SQLSTATE_COMPLETION_UNKNOWN, SQLSTATE_OPERATION_CANCELLED,
};
use crate::cli::handle::DiagRecord;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Where a value lives: a result column or a statement parameter (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Column(usize),
    Parameter(usize),
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Column(n) => write!(f, "column {}", n),
            Site::Parameter(n) => write!(f, "parameter {}", n),
        }
    }
}

/// Why an execute was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Signal,
    /// The configured query timeout elapsed.
    Deadline(Duration),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Signal => write!(f, "cancelled by caller"),
            CancelReason::Deadline(timeout) => write!(f, "query timeout after {:?}", timeout),
        }
    }
}

/// Error type for DB2 CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A native CLI call failed.
    #[error("[SQLSTATE {sql_state}|SQLCODE {sql_code}] {message}")]
    Cli {
        sql_state: String,
        sql_code: i32,
        message: String,
    },

    /// A native CLI call failed in a way that leaves the connection unusable.
    #[error("bad connection [SQLSTATE {sql_state}|SQLCODE {sql_code}] {message}")]
    BadConnection {
        sql_state: String,
        sql_code: i32,
        message: String,
    },

    /// Wire type outside the supported set.
    #[error("Unsupported database type {type_name} ({sql_type}) at {site}")]
    UnsupportedType {
        site: Site,
        sql_type: i16,
        type_name: &'static str,
    },

    /// Host value that cannot be bound.
    #[error("Unsupported parameter type {type_name} at parameter {position}")]
    UnsupportedParameter {
        position: usize,
        type_name: &'static str,
    },

    /// The native layer reported truncation that cannot be recovered from.
    #[error("Truncated data at {site}: {message}")]
    Truncation { site: Site, message: String },

    /// INOUT input does not fit the server-declared output buffer.
    #[error("Parameter {position} needs {needed} bytes but the output buffer holds {capacity}")]
    ParameterTooLarge {
        position: usize,
        needed: usize,
        capacity: usize,
    },

    /// Execute was abandoned before the native call returned.
    #[error("SQL operation was cancelled: {reason}")]
    Cancelled { reason: CancelReason },

    /// An output parameter was bound without a destination.
    #[error("No destination for output parameter {position}")]
    OutDestinationMissing { position: usize },

    /// The destination of an output parameter was dropped before the write.
    #[error("Destination for output parameter {position} is no longer writable")]
    OutDestinationClosed { position: usize },

    /// One or more output parameters failed to decode; the others were written.
    #[error("{} output parameter(s) failed: {}", .failures.len(), join_errors(.failures))]
    OutParameters { failures: Vec<Error> },

    /// Type conversion error.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Column index out of bounds.
    #[error("Column index {index} out of bounds (columns: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    /// No column of the result set has this name.
    #[error("No column named {name:?}")]
    ColumnNotFound { name: String },

    /// A query produced no result set.
    #[error("Statement did not produce a result set")]
    NoResultSet,

    /// The background execute task did not run to completion.
    #[error("Background execute failed: {message}")]
    Background { message: String },
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Build a native-call error from the statement's diagnostic records.
    ///
    /// The first record supplies SQLSTATE and SQLCODE; messages of all records
    /// are concatenated.
    pub fn from_diagnostics(records: &[DiagRecord]) -> Self {
        let (sql_state, sql_code) = records
            .first()
            .map(|r| (r.sql_state.clone(), r.native_error))
            .unwrap_or_else(|| ("HY000".to_string(), 0));
        let message = if records.is_empty() {
            "CLI call failed without diagnostics".to_string()
        } else {
            records
                .iter()
                .map(|r| r.message.as_str())
                .collect::<Vec<_>>()
                .join("")
        };

        if is_connection_state(&sql_state) {
            Self::BadConnection {
                sql_state,
                sql_code,
                message,
            }
        } else {
            Self::Cli {
                sql_state,
                sql_code,
                message,
            }
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create a truncation error.
    pub fn truncation(site: Site, message: impl Into<String>) -> Self {
        Self::Truncation {
            site,
            message: message.into(),
        }
    }

    /// Whether the connection behind this error should be discarded.
    pub fn is_bad_connection(&self) -> bool {
        matches!(self, Self::BadConnection { .. })
    }

    /// Whether this error reports a cancelled or timed-out execute.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// SQLSTATE associated with the error, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Cli { sql_state, .. } | Self::BadConnection { sql_state, .. } => {
                Some(sql_state)
            }
            Self::Cancelled { .. } => Some(SQLSTATE_OPERATION_CANCELLED),
            _ => None,
        }
    }

    /// Vendor SQLCODE associated with the error, if any.
    pub fn sql_code(&self) -> Option<i32> {
        match self {
            Self::Cli { sql_code, .. } | Self::BadConnection { sql_code, .. } => Some(*sql_code),
            _ => None,
        }
    }
}

fn is_connection_state(sql_state: &str) -> bool {
    sql_state.starts_with(SQLSTATE_CLASS_CONNECTION) || sql_state == SQLSTATE_COMPLETION_UNKNOWN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: &str, code: i32, message: &str) -> DiagRecord {
        DiagRecord {
            sql_state: state.to_string(),
            native_error: code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_from_diagnostics_uses_first_record() {
        let err = Error::from_diagnostics(&[
            record("42704", -204, "undefined name. "),
            record("01000", 0, "warning text"),
        ]);
        assert_eq!(err.sql_state(), Some("42704"));
        assert_eq!(err.sql_code(), Some(-204));
        assert!(!err.is_bad_connection());
        assert_eq!(
            err.to_string(),
            "[SQLSTATE 42704|SQLCODE -204] undefined name. warning text"
        );
    }

    #[test]
    fn test_communication_failure_is_bad_connection() {
        let err = Error::from_diagnostics(&[record("08S01", -30081, "link failure")]);
        assert!(err.is_bad_connection());

        let err = Error::from_diagnostics(&[record("40003", -30108, "completion unknown")]);
        assert!(err.is_bad_connection());
    }

    #[test]
    fn test_from_empty_diagnostics() {
        let err = Error::from_diagnostics(&[]);
        assert_eq!(err.sql_state(), Some("HY000"));
    }

    #[test]
    fn test_cancelled_reports_hy008() {
        let err = Error::Cancelled {
            reason: CancelReason::Deadline(Duration::from_secs(2)),
        };
        assert!(err.is_cancelled());
        assert_eq!(err.sql_state(), Some("HY008"));
        assert!(err.to_string().contains("query timeout"));
    }

    #[test]
    fn test_out_parameters_lists_failures() {
        let err = Error::OutParameters {
            failures: vec![
                Error::OutDestinationMissing { position: 1 },
                Error::type_conversion("bad decimal"),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 output parameter(s) failed"));
        assert!(text.contains("output parameter 1"));
        assert!(text.contains("bad decimal"));
    }
}
