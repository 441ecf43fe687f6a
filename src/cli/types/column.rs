//! Column and ColumnInfo types for the user-facing API.
//!
//! These provide the per-column introspection of an open result set,
//! derived from the internal `ColumnMetadata`.

use super::metadata::ColumnMetadata;
use super::sql_type::{ScanType, SqlType};

/// A column in a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Wire type code.
    pub sql_type: SqlType,
    /// Declared size.
    pub column_size: usize,
    /// Declared scale.
    pub decimal_digits: i16,
    /// Nullability; `None` when unknown.
    pub nullable: Option<bool>,
}

impl Column {
    pub fn from_metadata(meta: &ColumnMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            sql_type: meta.sql_type,
            column_size: meta.column_size,
            decimal_digits: meta.decimal_digits,
            nullable: meta.is_nullable(),
        }
    }

    /// Database type name, e.g. `VARCHAR`.
    pub fn type_name(&self) -> &'static str {
        self.sql_type.name()
    }

    /// Precision and scale, for types that carry a scale.
    pub fn precision_scale(&self) -> Option<(usize, i16)> {
        (self.decimal_digits > 0).then_some((self.column_size, self.decimal_digits))
    }

    /// Declared maximum length of variable-length types.
    pub fn length(&self) -> Option<usize> {
        self.sql_type
            .is_variable_length()
            .then_some(self.column_size)
    }

    pub fn scan_type(&self) -> ScanType {
        self.sql_type.scan_type()
    }
}

/// Shared column information for all rows in a result set.
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    /// Column definitions.
    pub columns: Vec<Column>,
}

impl ColumnInfo {
    pub fn from_metadata(metadata: &[ColumnMetadata]) -> Self {
        Self {
            columns: metadata.iter().map(Column::from_metadata).collect(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index (0-based).
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Find column index by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::constants::*;

    fn make_test_metadata() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata {
                ordinal: 1,
                name: "AMOUNT".to_string(),
                sql_type: SqlType(SQL_DECIMAL),
                column_size: 10,
                decimal_digits: 2,
                nullable: SQL_NO_NULLS,
            },
            ColumnMetadata {
                ordinal: 2,
                name: "NAME".to_string(),
                sql_type: SqlType(SQL_WVARCHAR),
                column_size: 100,
                decimal_digits: 0,
                nullable: SQL_NULLABLE,
            },
            ColumnMetadata {
                ordinal: 3,
                name: "ID".to_string(),
                sql_type: SqlType(SQL_INTEGER),
                column_size: 10,
                decimal_digits: 0,
                nullable: SQL_NULLABLE_UNKNOWN,
            },
        ]
    }

    #[test]
    fn test_column_introspection() {
        let info = ColumnInfo::from_metadata(&make_test_metadata());

        let amount = info.get(0).unwrap();
        assert_eq!(amount.type_name(), "DECIMAL");
        assert_eq!(amount.nullable, Some(false));
        assert_eq!(amount.precision_scale(), Some((10, 2)));
        assert_eq!(amount.length(), None);
        assert_eq!(amount.scan_type(), ScanType::Float64);

        let name = info.get(1).unwrap();
        assert_eq!(name.type_name(), "VARCHAR");
        assert_eq!(name.precision_scale(), None);
        assert_eq!(name.length(), Some(100));
        assert_eq!(name.scan_type(), ScanType::String);

        assert_eq!(info.get(2).unwrap().nullable, None);
    }

    #[test]
    fn test_column_info_lookup() {
        let info = ColumnInfo::from_metadata(&make_test_metadata());
        assert_eq!(info.len(), 3);
        assert_eq!(info.column_names(), vec!["AMOUNT", "NAME", "ID"]);
        assert_eq!(info.find_by_name("name"), Some(1));
        assert_eq!(info.find_by_name("UNKNOWN"), None);
    }
}
