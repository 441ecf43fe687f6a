//! DB2 CLI layer.
//!
//! This module contains the pieces between the statement engine and the
//! native call-level interface:
//! - `constants`: CLI return codes, type codes and indicator values
//! - `handle`: the `CliStatement` seam every backend implements
//! - `types`: SQL type mapping, column metadata, values and rows
//! - `decode`: wire struct and UTF-16 conversions
//! - `column`: result column binding and the get-data loop
//! - `param`: parameter encoding
//! - `out`: output parameter sizing and write-back

pub(crate) mod column;
pub mod constants;
pub mod decode;
pub mod handle;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
#[cfg(feature = "db2")]
pub mod native;
pub mod out;
pub mod param;
pub mod types;
