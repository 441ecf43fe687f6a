//! Column metadata as reported by `SQLDescribeCol`.
//!
//! This struct keeps the raw describe output. For the user-facing view, use
//! `Column`.

use crate::cli::constants::{SQL_NO_NULLS, SQL_NULLABLE};

use super::sql_type::SqlType;

/// Raw column description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    /// 1-based column number.
    pub ordinal: u16,
    /// Column name.
    pub name: String,
    /// Wire type code.
    pub sql_type: SqlType,
    /// Declared size (precision for numeric types, characters for text).
    pub column_size: usize,
    /// Declared scale.
    pub decimal_digits: i16,
    /// `SQL_NO_NULLS`, `SQL_NULLABLE` or `SQL_NULLABLE_UNKNOWN`.
    pub nullable: i16,
}

impl ColumnMetadata {
    /// Whether the column admits NULL; `None` when the driver does not know.
    pub fn is_nullable(&self) -> Option<bool> {
        match self.nullable {
            SQL_NO_NULLS => Some(false),
            SQL_NULLABLE => Some(true),
            _ => None,
        }
    }
}
