//! Decoded rows.
//!
//! A `Row` holds one value per column of the result set it came from and
//! shares that set's `ColumnInfo`, so typed access can be checked against
//! what the column was described as rather than only what was decoded.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveTime};

use super::column::{Column, ColumnInfo};
use super::sql_type::ScanType;
use super::value::Value;
use crate::error::{Error, Result};

/// One fetched row.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    info: Arc<ColumnInfo>,
}

impl Row {
    pub(crate) fn new(values: Vec<Value>, info: Arc<ColumnInfo>) -> Self {
        Self { values, info }
    }

    /// Value at 0-based `index`, `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the column named `name`, compared case-insensitively.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.info
            .find_by_name(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Index of the column named `name`.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.info.find_by_name(name).ok_or_else(|| Error::ColumnNotFound {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn column_info(&self) -> &Arc<ColumnInfo> {
        &self.info
    }

    /// `BIT`/`BOOLEAN` column.
    pub fn get_bool(&self, index: usize) -> Result<Option<bool>> {
        self.typed(index, &[ScanType::Bool], Value::as_bool)
    }

    /// Any integer column; `SMALLINT` and `INTEGER` widen.
    pub fn get_i64(&self, index: usize) -> Result<Option<i64>> {
        self.typed(index, &[ScanType::Int32, ScanType::Int64], |v| match v {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        })
    }

    /// Floating and decimal columns.
    pub fn get_f64(&self, index: usize) -> Result<Option<f64>> {
        self.typed(index, &[ScanType::Float64], |v| match v {
            Value::Float64(n) => Some(*n),
            _ => None,
        })
    }

    /// Narrow or wide character column.
    pub fn get_str(&self, index: usize) -> Result<Option<&str>> {
        self.typed(index, &[ScanType::String], Value::as_str)
    }

    /// Binary, LOB and XML columns.
    pub fn get_bytes(&self, index: usize) -> Result<Option<&[u8]>> {
        self.typed(index, &[ScanType::Bytes], Value::as_bytes)
    }

    /// `TIMESTAMP` and `DATE` columns, in the statement's time zone.
    pub fn get_timestamp(&self, index: usize) -> Result<Option<DateTime<FixedOffset>>> {
        self.typed(index, &[ScanType::Timestamp], Value::as_timestamp)
    }

    pub fn get_time(&self, index: usize) -> Result<Option<NaiveTime>> {
        self.typed(index, &[ScanType::Time], Value::as_time)
    }

    fn column(&self, index: usize) -> Result<(&Column, &Value)> {
        match (self.info.get(index), self.values.get(index)) {
            (Some(column), Some(value)) => Ok((column, value)),
            _ => Err(Error::ColumnIndexOutOfBounds {
                index,
                count: self.values.len(),
            }),
        }
    }

    /// Read `index` as one of `accepted` scan types. NULL is `Ok(None)`.
    fn typed<'a, T>(
        &'a self,
        index: usize,
        accepted: &[ScanType],
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>> {
        let (column, value) = self.column(index)?;
        let scan_type = column.scan_type();
        if !accepted.contains(&scan_type) {
            return Err(Error::type_conversion(format!(
                "column {} ({}) scans as {:?}, not {:?}",
                column.name,
                column.type_name(),
                scan_type,
                accepted[0]
            )));
        }
        if value.is_null() {
            return Ok(None);
        }
        extract(value).map(Some).ok_or_else(|| {
            Error::type_conversion(format!(
                "column {} holds a {} value",
                column.name,
                value.kind()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::constants::*;
    use crate::cli::types::SqlType;

    fn column(name: &str, sql_type: i16, column_size: usize) -> Column {
        Column {
            name: name.to_string(),
            sql_type: SqlType(sql_type),
            column_size,
            decimal_digits: 0,
            nullable: Some(true),
        }
    }

    fn order_row(values: Vec<Value>) -> Row {
        let info = ColumnInfo {
            columns: vec![
                column("ITEM", SQL_WVARCHAR, 100),
                column("QTY", SQL_SMALLINT, 5),
                column("TOTAL", SQL_DECIMAL, 10),
                column("SHIPPED", SQL_TYPE_DATE, 10),
            ],
        };
        Row::new(values, Arc::new(info))
    }

    #[test]
    fn test_lookup_by_name() {
        let row = order_row(vec![
            Value::String("widget".into()),
            Value::Int32(42),
            Value::Float64(9.5),
            Value::Null,
        ]);
        assert_eq!(row.get_by_name("qty"), Some(&Value::Int32(42)));
        assert_eq!(row.index_of("Total").unwrap(), 2);
        assert!(matches!(
            row.index_of("missing"),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_typed_getters_follow_scan_type() {
        let row = order_row(vec![
            Value::String("widget".into()),
            Value::Int32(42),
            Value::Float64(9.5),
            Value::Null,
        ]);
        assert_eq!(row.get_str(0).unwrap(), Some("widget"));
        assert_eq!(row.get_i64(1).unwrap(), Some(42));
        assert_eq!(row.get_f64(2).unwrap(), Some(9.5));
        assert_eq!(row.get_timestamp(3).unwrap(), None);

        assert!(matches!(row.get_i64(0), Err(Error::TypeConversion { .. })));
        assert!(matches!(row.get_bytes(2), Err(Error::TypeConversion { .. })));
        assert!(matches!(
            row.get_str(4),
            Err(Error::ColumnIndexOutOfBounds { index: 4, count: 4 })
        ));
    }
}
