//! DB2 CLI statement engine for Rust
//!
//! Binds host values to DB2 call-level interface parameters, executes
//! prepared statements with cancellation and timeouts, and decodes result
//! columns and output parameters back into [`Value`]s.
//!
//! Connections and statement preparation are left to the caller: anything
//! implementing [`CliStatement`] can be driven, including the native
//! `libdb2` backend behind the `db2` feature.
//!
//! # Example
//!
//! ```no_run
//! use db2_cli_rs::{Arg, CliStatement, Cursor, OutSlot, Result, Statement};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run<H: CliStatement>(handle: H) -> Result<()> {
//!     let mut stmt = Statement::new(handle);
//!     let cancel = CancellationToken::new();
//!
//!     // CALL PROC(?, ?)
//!     let total = OutSlot::new();
//!     stmt.exec(vec![Arg::input(42i64), Arg::output(&total)], &cancel).await?;
//!     println!("total = {:?}", total.get());
//!
//!     // SELECT ID, NAME FROM T WHERE ID > ?
//!     let mut rows = stmt.query(vec![Arg::input(10i64)], &cancel).await?;
//!     while let Some(row) = rows.next()? {
//!         println!("{:?}", row.get_by_name("NAME"));
//!     }
//!     rows.close()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod cursor;
pub mod error;
pub mod options;
pub mod statement;

// Re-export main types
pub use cli::handle::{CliStatement, CliStatementExt, DiagRecord, SqlReturn};
pub use cli::out::{OutDest, OutSlot};
pub use cli::param::Arg;
pub use cli::types::{
    BindValue, Column, ColumnInfo, ColumnMetadata, Row, ScanType, SqlType, TransferEncoding,
    Value,
};
pub use cursor::{Cursor, Rows};
pub use error::{CancelReason, Error, Result, Site};
pub use options::{StatementOptions, TimeZonePolicy};
pub use statement::{Statement, StatementState};

#[cfg(feature = "db2")]
pub use cli::native::{Environment, NativeStatement};
