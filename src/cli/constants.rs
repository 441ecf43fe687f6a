//! DB2 CLI constants.
//!
//! These values mirror `sqlcli1.h` / `sqlext.h` as shipped with the IBM Data
//! Server Driver. DB2-specific wire types (GRAPHIC, CLOB, XML, ...) carry their
//! vendor codes.

// Return codes
pub const SQL_SUCCESS: i16 = 0;
pub const SQL_SUCCESS_WITH_INFO: i16 = 1;
pub const SQL_STILL_EXECUTING: i16 = 2;
pub const SQL_NEED_DATA: i16 = 99;
pub const SQL_NO_DATA: i16 = 100;
pub const SQL_ERROR: i16 = -1;
pub const SQL_INVALID_HANDLE: i16 = -2;

// Length/indicator sentinels
pub const SQL_NULL_DATA: isize = -1;
pub const SQL_NTS: isize = -3;
pub const SQL_NO_TOTAL: isize = -4;

// Wire (SQL) type codes
pub const SQL_UNKNOWN_TYPE: i16 = 0;
pub const SQL_CHAR: i16 = 1;
pub const SQL_NUMERIC: i16 = 2;
pub const SQL_DECIMAL: i16 = 3;
pub const SQL_INTEGER: i16 = 4;
pub const SQL_SMALLINT: i16 = 5;
pub const SQL_FLOAT: i16 = 6;
pub const SQL_REAL: i16 = 7;
pub const SQL_DOUBLE: i16 = 8;
pub const SQL_VARCHAR: i16 = 12;
pub const SQL_BOOLEAN: i16 = 16;
pub const SQL_TYPE_DATE: i16 = 91;
pub const SQL_TYPE_TIME: i16 = 92;
pub const SQL_TYPE_TIMESTAMP: i16 = 93;
pub const SQL_LONGVARCHAR: i16 = -1;
pub const SQL_BINARY: i16 = -2;
pub const SQL_VARBINARY: i16 = -3;
pub const SQL_LONGVARBINARY: i16 = -4;
pub const SQL_BIGINT: i16 = -5;
pub const SQL_TINYINT: i16 = -6;
pub const SQL_BIT: i16 = -7;
pub const SQL_WCHAR: i16 = -8;
pub const SQL_WVARCHAR: i16 = -9;
pub const SQL_WLONGVARCHAR: i16 = -10;
pub const SQL_GRAPHIC: i16 = -95;
pub const SQL_VARGRAPHIC: i16 = -96;
pub const SQL_LONGVARGRAPHIC: i16 = -97;
pub const SQL_BLOB: i16 = -98;
pub const SQL_CLOB: i16 = -99;
pub const SQL_DBCLOB: i16 = -350;
pub const SQL_DECFLOAT: i16 = -360;
pub const SQL_XML: i16 = -370;

// Transfer (C) type codes
pub const SQL_C_CHAR: i16 = 1;
pub const SQL_C_LONG: i16 = 4;
pub const SQL_C_DOUBLE: i16 = 8;
pub const SQL_C_TYPE_DATE: i16 = 91;
pub const SQL_C_TYPE_TIME: i16 = 92;
pub const SQL_C_TYPE_TIMESTAMP: i16 = 93;
pub const SQL_C_BINARY: i16 = -2;
pub const SQL_C_BIT: i16 = -7;
pub const SQL_C_WCHAR: i16 = -8;
pub const SQL_C_SBIGINT: i16 = -25;
pub const SQL_C_DEFAULT: i16 = 99;

// Parameter directions
pub const SQL_PARAM_INPUT: i16 = 1;
pub const SQL_PARAM_INPUT_OUTPUT: i16 = 2;
pub const SQL_PARAM_OUTPUT: i16 = 4;

// SQLFreeStmt options
pub const SQL_CLOSE: u16 = 0;
pub const SQL_DROP: u16 = 1;
pub const SQL_UNBIND: u16 = 2;
pub const SQL_RESET_PARAMS: u16 = 3;

// Nullability
pub const SQL_NO_NULLS: i16 = 0;
pub const SQL_NULLABLE: i16 = 1;
pub const SQL_NULLABLE_UNKNOWN: i16 = 2;

// Handle types
pub const SQL_HANDLE_ENV: i16 = 1;
pub const SQL_HANDLE_DBC: i16 = 2;
pub const SQL_HANDLE_STMT: i16 = 3;

// Environment attributes
pub const SQL_ATTR_ODBC_VERSION: i32 = 200;
pub const SQL_OV_ODBC3: usize = 3;

// SQLSTATE values the engine reacts to
pub const SQLSTATE_STRING_TRUNCATED: &str = "01004";
pub const SQLSTATE_OPERATION_CANCELLED: &str = "HY008";
pub const SQLSTATE_COMPLETION_UNKNOWN: &str = "40003";
pub const SQLSTATE_CLASS_CONNECTION: &str = "08";

/// Size of the column-name buffer handed to the first describe call.
pub const COLUMN_NAME_BUFFER_LEN: usize = 150;
/// Maximum length of a diagnostic message (`SQL_MAX_MESSAGE_LENGTH`).
pub const SQL_MAX_MESSAGE_LENGTH: usize = 1024;
