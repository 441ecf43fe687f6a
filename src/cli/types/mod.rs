//! Wire types, host values and result-set shapes.

mod column;
mod metadata;
mod row;
mod sql_type;
mod value;

pub use column::{Column, ColumnInfo};
pub use metadata::ColumnMetadata;
pub use row::Row;
pub use sql_type::{ScanType, SqlType, TransferEncoding};
pub use value::{BindValue, Value};
