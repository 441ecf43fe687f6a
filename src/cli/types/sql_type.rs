//! Type mapping table between wire type codes and transfer encodings.
//!
//! A wire type code says how the database represents a value; the transfer
//! encoding says which C layout the value crosses the CLI boundary in.
//! Several wire types share one encoding (DECIMAL, NUMERIC and DECFLOAT all
//! travel as character text), and every code maps to exactly one encoding.
//! Codes the adapter does not understand map to `TransferEncoding::Unsupported`.

use std::fmt;

use crate::cli::constants::*;
use crate::cli::decode::{DATE_STRUCT_LEN, TIMESTAMP_STRUCT_LEN, TIME_STRUCT_LEN};

/// In-memory layout a wire type is exchanged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// One byte, zero or one (`SQL_C_BIT`).
    Bit,
    /// Native-endian `i32` (`SQL_C_LONG`).
    Long,
    /// Native-endian `i64` (`SQL_C_SBIGINT`).
    BigInt,
    /// Native-endian `f64` (`SQL_C_DOUBLE`).
    Double,
    /// Null-terminated narrow character text (`SQL_C_CHAR`).
    Char,
    /// Null-terminated UTF-16 text (`SQL_C_WCHAR`).
    WChar,
    /// `DATE_STRUCT` (`SQL_C_TYPE_DATE`).
    Date,
    /// `TIME_STRUCT` (`SQL_C_TYPE_TIME`).
    Time,
    /// `TIMESTAMP_STRUCT` (`SQL_C_TYPE_TIMESTAMP`).
    Timestamp,
    /// Raw bytes (`SQL_C_BINARY`).
    Binary,
    /// No transfer layout known for the wire type.
    Unsupported,
}

impl TransferEncoding {
    /// C type code passed to bind/get-data calls.
    pub fn c_type(self) -> i16 {
        match self {
            TransferEncoding::Bit => SQL_C_BIT,
            TransferEncoding::Long => SQL_C_LONG,
            TransferEncoding::BigInt => SQL_C_SBIGINT,
            TransferEncoding::Double => SQL_C_DOUBLE,
            TransferEncoding::Char => SQL_C_CHAR,
            TransferEncoding::WChar => SQL_C_WCHAR,
            TransferEncoding::Date => SQL_C_TYPE_DATE,
            TransferEncoding::Time => SQL_C_TYPE_TIME,
            TransferEncoding::Timestamp => SQL_C_TYPE_TIMESTAMP,
            TransferEncoding::Binary => SQL_C_BINARY,
            TransferEncoding::Unsupported => SQL_C_DEFAULT,
        }
    }

    /// Byte size of fixed-width layouts.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            TransferEncoding::Bit => Some(1),
            TransferEncoding::Long => Some(4),
            TransferEncoding::BigInt | TransferEncoding::Double => Some(8),
            TransferEncoding::Date => Some(DATE_STRUCT_LEN),
            TransferEncoding::Time => Some(TIME_STRUCT_LEN),
            TransferEncoding::Timestamp => Some(TIMESTAMP_STRUCT_LEN),
            _ => None,
        }
    }

    /// Bytes the native library reserves for a terminator in this layout.
    pub fn terminator_len(self) -> usize {
        match self {
            TransferEncoding::Char => 1,
            TransferEncoding::WChar => 2,
            _ => 0,
        }
    }

    /// Transfer buffer size for a value of `declared_size` (precision).
    ///
    /// Returns `None` when the buffer cannot be sized up front: the declared
    /// size is zero (XML, huge LOBs) or the encoding is unsupported. Such
    /// values are fetched on demand.
    pub fn buffer_len(self, declared_size: usize) -> Option<usize> {
        if let Some(size) = self.fixed_size() {
            return Some(size);
        }
        match self {
            TransferEncoding::Char | TransferEncoding::WChar | TransferEncoding::Binary
                if declared_size == 0 =>
            {
                None
            }
            TransferEncoding::Char => Some(declared_size + 1),
            TransferEncoding::WChar => Some((declared_size + 1) * 2),
            TransferEncoding::Binary => Some(declared_size),
            _ => None,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferEncoding::Bit => "SQL_C_BIT",
            TransferEncoding::Long => "SQL_C_LONG",
            TransferEncoding::BigInt => "SQL_C_SBIGINT",
            TransferEncoding::Double => "SQL_C_DOUBLE",
            TransferEncoding::Char => "SQL_C_CHAR",
            TransferEncoding::WChar => "SQL_C_WCHAR",
            TransferEncoding::Date => "SQL_C_TYPE_DATE",
            TransferEncoding::Time => "SQL_C_TYPE_TIME",
            TransferEncoding::Timestamp => "SQL_C_TYPE_TIMESTAMP",
            TransferEncoding::Binary => "SQL_C_BINARY",
            TransferEncoding::Unsupported => "UNSUPPORTED",
        };
        f.write_str(name)
    }
}

/// Host type a column decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Bool,
    Int32,
    Int64,
    Float64,
    String,
    Bytes,
    Timestamp,
    Time,
    Unknown,
}

/// A wire type code as reported by the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlType(pub i16);

impl SqlType {
    /// Raw wire type code.
    pub fn code(self) -> i16 {
        self.0
    }

    /// Transfer encoding the wire type is bound with.
    pub fn encoding(self) -> TransferEncoding {
        match self.0 {
            SQL_BIT | SQL_BOOLEAN => TransferEncoding::Bit,
            SQL_TINYINT | SQL_SMALLINT | SQL_INTEGER => TransferEncoding::Long,
            SQL_BIGINT => TransferEncoding::BigInt,
            SQL_FLOAT | SQL_REAL | SQL_DOUBLE => TransferEncoding::Double,
            SQL_DECIMAL | SQL_NUMERIC | SQL_DECFLOAT => TransferEncoding::Char,
            SQL_CHAR | SQL_VARCHAR | SQL_LONGVARCHAR | SQL_CLOB => TransferEncoding::Char,
            SQL_WCHAR | SQL_WVARCHAR | SQL_WLONGVARCHAR | SQL_GRAPHIC | SQL_VARGRAPHIC
            | SQL_LONGVARGRAPHIC | SQL_DBCLOB => TransferEncoding::WChar,
            SQL_TYPE_DATE => TransferEncoding::Date,
            SQL_TYPE_TIME => TransferEncoding::Time,
            SQL_TYPE_TIMESTAMP => TransferEncoding::Timestamp,
            SQL_BINARY | SQL_VARBINARY | SQL_LONGVARBINARY | SQL_BLOB | SQL_XML => {
                TransferEncoding::Binary
            }
            _ => TransferEncoding::Unsupported,
        }
    }

    /// Database type name.
    pub fn name(self) -> &'static str {
        match self.0 {
            SQL_BIT => "BIT",
            SQL_BOOLEAN => "BOOLEAN",
            SQL_TINYINT | SQL_SMALLINT => "SMALLINT",
            SQL_INTEGER => "INTEGER",
            SQL_BIGINT => "BIGINT",
            SQL_DOUBLE => "DOUBLE",
            SQL_DECIMAL => "DECIMAL",
            SQL_NUMERIC => "NUMERIC",
            SQL_DECFLOAT => "DECFLOAT",
            SQL_FLOAT => "FLOAT",
            SQL_REAL => "REAL",
            SQL_TYPE_TIMESTAMP => "TIMESTAMP",
            SQL_TYPE_DATE => "DATE",
            SQL_TYPE_TIME => "TIME",
            SQL_CHAR | SQL_WCHAR => "CHARACTER",
            SQL_VARCHAR | SQL_WVARCHAR => "VARCHAR",
            SQL_LONGVARCHAR | SQL_WLONGVARCHAR => "LONG VARCHAR",
            SQL_GRAPHIC => "GRAPHIC",
            SQL_VARGRAPHIC => "VARGRAPHIC",
            SQL_LONGVARGRAPHIC => "LONG VARGRAPHIC",
            SQL_CLOB => "CLOB",
            SQL_DBCLOB => "DBCLOB",
            SQL_BLOB => "BLOB",
            SQL_BINARY => "BINARY",
            SQL_VARBINARY => "VARBINARY",
            SQL_LONGVARBINARY => "LONG VARBINARY",
            SQL_XML => "XML",
            _ => "UNKNOWN",
        }
    }

    /// Host type values of this wire type decode into.
    pub fn scan_type(self) -> ScanType {
        match self.encoding() {
            TransferEncoding::Bit => ScanType::Bool,
            TransferEncoding::Long => ScanType::Int32,
            TransferEncoding::BigInt => ScanType::Int64,
            TransferEncoding::Double => ScanType::Float64,
            TransferEncoding::Char if self.is_decimal_text() => ScanType::Float64,
            TransferEncoding::Char | TransferEncoding::WChar => ScanType::String,
            TransferEncoding::Date | TransferEncoding::Timestamp => ScanType::Timestamp,
            TransferEncoding::Time => ScanType::Time,
            TransferEncoding::Binary => ScanType::Bytes,
            TransferEncoding::Unsupported => ScanType::Unknown,
        }
    }

    /// Decimal-like types that travel as text but decode to a number.
    pub fn is_decimal_text(self) -> bool {
        matches!(self.0, SQL_DECIMAL | SQL_NUMERIC | SQL_DECFLOAT)
    }

    /// Types whose declared size is a maximum rather than a fixed width.
    pub fn is_variable_length(self) -> bool {
        matches!(
            self.0,
            SQL_VARCHAR
                | SQL_WVARCHAR
                | SQL_LONGVARCHAR
                | SQL_WLONGVARCHAR
                | SQL_VARGRAPHIC
                | SQL_LONGVARGRAPHIC
                | SQL_CLOB
                | SQL_DBCLOB
                | SQL_BLOB
                | SQL_VARBINARY
                | SQL_LONGVARBINARY
                | SQL_XML
        )
    }

    /// Transfer buffer size for a value of this type with `declared_size`.
    ///
    /// Decimal text needs room for sign, decimal point and exponent on top of
    /// the digit count.
    pub fn buffer_len(self, declared_size: usize) -> Option<usize> {
        match self.0 {
            SQL_DECIMAL | SQL_NUMERIC => Some(declared_size + 3),
            SQL_DECFLOAT => Some(declared_size.max(34) + 9),
            _ => self.encoding().buffer_len(declared_size),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_code_has_an_encoding() {
        let known = [
            SQL_BIT,
            SQL_BOOLEAN,
            SQL_TINYINT,
            SQL_SMALLINT,
            SQL_INTEGER,
            SQL_BIGINT,
            SQL_FLOAT,
            SQL_REAL,
            SQL_DOUBLE,
            SQL_DECIMAL,
            SQL_NUMERIC,
            SQL_DECFLOAT,
            SQL_CHAR,
            SQL_VARCHAR,
            SQL_LONGVARCHAR,
            SQL_CLOB,
            SQL_WCHAR,
            SQL_WVARCHAR,
            SQL_WLONGVARCHAR,
            SQL_GRAPHIC,
            SQL_VARGRAPHIC,
            SQL_LONGVARGRAPHIC,
            SQL_DBCLOB,
            SQL_TYPE_DATE,
            SQL_TYPE_TIME,
            SQL_TYPE_TIMESTAMP,
            SQL_BINARY,
            SQL_VARBINARY,
            SQL_LONGVARBINARY,
            SQL_BLOB,
            SQL_XML,
        ];
        for code in known {
            let t = SqlType(code);
            assert_ne!(t.encoding(), TransferEncoding::Unsupported, "{}", code);
            assert_ne!(t.name(), "UNKNOWN", "{}", code);
        }
    }

    #[test]
    fn test_unknown_code_is_unsupported() {
        let t = SqlType(-9999);
        assert_eq!(t.encoding(), TransferEncoding::Unsupported);
        assert_eq!(t.name(), "UNKNOWN");
        assert_eq!(t.buffer_len(10), None);
    }

    #[test]
    fn test_decimal_travels_as_text() {
        assert_eq!(SqlType(SQL_DECIMAL).encoding(), TransferEncoding::Char);
        assert!(SqlType(SQL_DECIMAL).is_decimal_text());
        assert!(!SqlType(SQL_VARCHAR).is_decimal_text());
        assert_eq!(SqlType(SQL_DECIMAL).buffer_len(5), Some(8));
    }

    #[test]
    fn test_buffer_sizes() {
        assert_eq!(SqlType(SQL_INTEGER).buffer_len(10), Some(4));
        assert_eq!(SqlType(SQL_BIGINT).buffer_len(19), Some(8));
        assert_eq!(SqlType(SQL_VARCHAR).buffer_len(20), Some(21));
        assert_eq!(SqlType(SQL_WVARCHAR).buffer_len(20), Some(42));
        assert_eq!(SqlType(SQL_VARBINARY).buffer_len(16), Some(16));
        assert_eq!(SqlType(SQL_TYPE_TIMESTAMP).buffer_len(26), Some(16));
        assert_eq!(SqlType(SQL_XML).buffer_len(0), None);
    }

    #[test]
    fn test_scan_types() {
        assert_eq!(SqlType(SQL_NUMERIC).scan_type(), ScanType::Float64);
        assert_eq!(SqlType(SQL_CLOB).scan_type(), ScanType::String);
        assert_eq!(SqlType(SQL_TYPE_DATE).scan_type(), ScanType::Timestamp);
        assert_eq!(SqlType(SQL_SMALLINT).scan_type(), ScanType::Int32);
        assert_eq!(SqlType(-9999).scan_type(), ScanType::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SqlType(SQL_WVARCHAR)), "VARCHAR");
        assert_eq!(format!("{}", TransferEncoding::WChar), "SQL_C_WCHAR");
    }
}
