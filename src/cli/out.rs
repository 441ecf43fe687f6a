//! INOUT and OUT parameters of stored procedure calls.
//!
//! Output parameters are sized from the server's description of the
//! parameter rather than from the input value, because a procedure can
//! return more than it was given. After execute the buffer is decoded with
//! the same rules as result columns and written to the caller's `OutSlot`.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::debug;

use crate::cli::constants::*;
use crate::cli::decode::{decode_value, wide};
use crate::cli::handle::{CliStatement, ParamDirection};
use crate::cli::param::{describe, supported, BoundParam};
use crate::cli::types::{BindValue, SqlType, TransferEncoding, Value};
use crate::error::{Error, Result, Site};
use crate::options::{StatementOptions, TimeZonePolicy};

type SlotCell = Mutex<Option<Value>>;

/// Caller-owned storage an output parameter is written into.
///
/// The slot stays empty until a successful execute writes it. Clones share
/// the same storage.
#[derive(Debug, Clone, Default)]
pub struct OutSlot {
    cell: Arc<SlotCell>,
}

impl OutSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A destination handle to pass in an argument list.
    pub fn dest(&self) -> OutDest {
        OutDest {
            slot: Some(Arc::downgrade(&self.cell)),
        }
    }

    /// Value written by the last execute, if any.
    pub fn get(&self) -> Option<Value> {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take the written value, leaving the slot empty.
    pub fn take(&self) -> Option<Value> {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Where an output parameter's value goes.
///
/// Holds a weak reference: dropping every `OutSlot` makes the destination
/// closed rather than keeping the storage alive.
#[derive(Debug, Clone, Default)]
pub struct OutDest {
    slot: Option<Weak<SlotCell>>,
}

impl OutDest {
    /// A destination that refers to nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve the destination before anything is decoded.
    fn resolve(&self, position: usize) -> Result<Arc<SlotCell>> {
        let slot = self
            .slot
            .as_ref()
            .ok_or(Error::OutDestinationMissing { position })?;
        slot.upgrade()
            .ok_or(Error::OutDestinationClosed { position })
    }
}

/// Encode an output parameter.
///
/// `input` is `None` for output-only parameters.
pub(crate) fn encode_output<H: CliStatement + ?Sized>(
    handle: &H,
    position: usize,
    input: Option<&BindValue>,
    dest: OutDest,
    options: &StatementOptions,
) -> Result<BoundParam> {
    let mut param = match input {
        None => {
            let mut param = described_buffer(handle, position, options)?;
            param.direction = ParamDirection::Output;
            param
        }
        Some(value) => {
            let mut param = encode_inout(handle, position, value, options)?;
            param.direction = ParamDirection::InputOutput;
            param
        }
    };
    param.dest = Some(dest);
    Ok(param)
}

fn out_capacity(sql_type: SqlType, declared: usize, options: &StatementOptions) -> usize {
    sql_type
        .buffer_len(declared)
        .unwrap_or(options.unsized_out_capacity)
}

/// Describe the parameter and allocate a buffer for its declared type.
fn described_buffer<H: CliStatement + ?Sized>(
    handle: &H,
    position: usize,
    options: &StatementOptions,
) -> Result<BoundParam> {
    let desc = describe(handle, position)?;
    let sql_type = SqlType(desc.data_type);
    let encoding = supported(sql_type, position)?;
    let capacity = out_capacity(sql_type, desc.parameter_size, options);
    debug!(position, %sql_type, size = desc.parameter_size, capacity, "allocating output parameter");
    Ok(BoundParam::new(
        position,
        encoding.c_type(),
        sql_type,
        desc.parameter_size,
        desc.decimal_digits,
        vec![0u8; capacity],
        0,
    ))
}

fn encode_inout<H: CliStatement + ?Sized>(
    handle: &H,
    position: usize,
    value: &BindValue,
    options: &StatementOptions,
) -> Result<BoundParam> {
    match value {
        BindValue::Null => {
            let mut param = described_buffer(handle, position, options)?;
            *param.indicator = SQL_NULL_DATA;
            Ok(param)
        }
        BindValue::String(s) => {
            let desc = describe(handle, position)?;
            let capacity = if desc.parameter_size == 0 {
                options.unsized_out_capacity
            } else {
                desc.parameter_size * 2 + 2
            };
            let mut param = BoundParam::text(position, s, Some(capacity))?;
            param.column_size = desc.parameter_size.max(1);
            param.decimal_digits = desc.decimal_digits;
            Ok(param)
        }
        BindValue::Bytes(b) => {
            let desc = describe(handle, position)?;
            let sql_type = SqlType(desc.data_type);
            let encoding = supported(sql_type, position)?;
            let capacity = out_capacity(sql_type, desc.parameter_size, options);
            if b.len() > capacity {
                return Err(Error::ParameterTooLarge {
                    position,
                    needed: b.len(),
                    capacity,
                });
            }
            let mut buffer = vec![0u8; capacity];
            buffer[..b.len()].copy_from_slice(b);
            Ok(BoundParam::new(
                position,
                encoding.c_type(),
                sql_type,
                desc.parameter_size,
                desc.decimal_digits,
                buffer,
                b.len() as isize,
            ))
        }
        fixed => BoundParam::encode(handle, position, fixed, options),
    }
}

/// The bytes of an output buffer the indicator marks as valid.
fn output_bytes(param: &BoundParam) -> Result<Option<&[u8]>> {
    let indicator = *param.indicator;
    if indicator == SQL_NULL_DATA {
        return Ok(None);
    }
    let encoding = param.sql_type.encoding();
    if encoding.fixed_size().is_some() {
        return Ok(Some(&param.buffer));
    }
    let buffer = &param.buffer[..];
    if indicator == SQL_NTS {
        let len = match encoding {
            TransferEncoding::WChar => wide::terminated_len(buffer),
            TransferEncoding::Char => buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len()),
            _ => buffer.len(),
        };
        return Ok(Some(&buffer[..len]));
    }
    let capacity = buffer.len().saturating_sub(encoding.terminator_len());
    if indicator < 0 || indicator as usize > capacity {
        return Err(Error::truncation(
            Site::Parameter(param.position),
            format!(
                "output indicator {} exceeds the {} byte buffer",
                indicator, capacity
            ),
        ));
    }
    Ok(Some(&buffer[..indicator as usize]))
}

/// Decode an output parameter after execute.
pub(crate) fn decode_output(param: &BoundParam, time_zone: &TimeZonePolicy) -> Result<Value> {
    let data = output_bytes(param)?;
    decode_value(
        param.sql_type,
        data,
        time_zone,
        Site::Parameter(param.position),
    )
}

/// Write every output parameter to its destination, in position order.
///
/// Failures are collected; a failing parameter does not stop the others
/// from being written.
pub(crate) fn write_outputs(params: &[BoundParam], time_zone: &TimeZonePolicy) -> Result<()> {
    let mut failures = Vec::new();
    for param in params.iter().filter(|p| p.is_output()) {
        let written = param
            .dest
            .as_ref()
            .ok_or(Error::OutDestinationMissing {
                position: param.position,
            })
            .and_then(|dest| dest.resolve(param.position))
            .and_then(|slot| {
                let value = decode_output(param, time_zone)?;
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
                Ok(())
            });
        if let Err(err) = written {
            debug!(position = param.position, error = %err, "output parameter not written");
            failures.push(err);
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::OutParameters { failures })
    }
}
