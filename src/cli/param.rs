//! Parameter encoding.
//!
//! A `BoundParam` owns the transfer buffer and indicator of one parameter
//! marker. Once registered, the driver reads (and for output directions
//! writes) through pointers into both, so a `BoundParam` must outlive the
//! execute that uses it and must not be dropped while the driver still holds
//! the binding. The statement keeps them until it resets its parameters.

use tracing::trace;

use crate::cli::constants::*;
use crate::cli::decode::{encode_timestamp, wide};
use crate::cli::handle::{
    CliStatement, CliStatementExt, ParamDescription, ParamDirection, ParameterBinding,
};
use crate::cli::out::{encode_output, OutDest, OutSlot};
use crate::cli::types::{BindValue, SqlType, TransferEncoding, Value};
use crate::error::{Error, Result, Site};
use crate::options::StatementOptions;

/// One parameter marker with its owned transfer buffer.
#[derive(Debug)]
pub(crate) struct BoundParam {
    /// 1-based position.
    pub(crate) position: usize,
    pub(crate) direction: ParamDirection,
    pub(crate) c_type: i16,
    pub(crate) sql_type: SqlType,
    pub(crate) column_size: usize,
    pub(crate) decimal_digits: i16,
    pub(crate) buffer: Box<[u8]>,
    pub(crate) indicator: Box<isize>,
    /// Where the decoded output goes, for output directions.
    pub(crate) dest: Option<OutDest>,
}

impl BoundParam {
    /// Encode an input-only parameter.
    ///
    /// NULL carries no type, so the driver is asked for the parameter's
    /// declared type and a buffer of that size is still allocated.
    pub(crate) fn encode<H: CliStatement + ?Sized>(
        handle: &H,
        position: usize,
        value: &BindValue,
        options: &StatementOptions,
    ) -> Result<Self> {
        let param = match value {
            BindValue::Null => {
                let desc = describe(handle, position)?;
                let sql_type = SqlType(desc.data_type);
                let encoding = supported(sql_type, position)?;
                let len = sql_type.buffer_len(desc.parameter_size).unwrap_or(0);
                Self::new(
                    position,
                    encoding.c_type(),
                    sql_type,
                    desc.parameter_size,
                    desc.decimal_digits,
                    vec![0u8; len],
                    SQL_NULL_DATA,
                )
            }
            BindValue::String(s) => Self::text(position, s, None)?,
            BindValue::Int64(v) => Self::fixed(
                position,
                TransferEncoding::BigInt,
                SQL_BIGINT,
                19,
                v.to_ne_bytes().to_vec(),
            ),
            BindValue::Float64(v) => Self::fixed(
                position,
                TransferEncoding::Double,
                SQL_DOUBLE,
                15,
                v.to_ne_bytes().to_vec(),
            ),
            BindValue::Bool(v) => {
                Self::fixed(position, TransferEncoding::Bit, SQL_BIT, 1, vec![*v as u8])
            }
            BindValue::Timestamp(ts) => {
                let scale = options.timestamp_scale.min(9);
                let wall = options.time_zone.wall_clock(ts);
                let mut param = Self::fixed(
                    position,
                    TransferEncoding::Timestamp,
                    SQL_TYPE_TIMESTAMP,
                    timestamp_column_size(scale),
                    encode_timestamp(wall, scale)?.to_vec(),
                );
                param.decimal_digits = scale as i16;
                param
            }
            BindValue::Bytes(b) => {
                let len = b.len() as isize;
                Self::new(
                    position,
                    SQL_C_BINARY,
                    SqlType(SQL_VARBINARY),
                    b.len().max(1),
                    0,
                    b.clone(),
                    len,
                )
            }
        };
        Ok(param)
    }

    pub(crate) fn new(
        position: usize,
        c_type: i16,
        sql_type: SqlType,
        column_size: usize,
        decimal_digits: i16,
        buffer: Vec<u8>,
        indicator: isize,
    ) -> Self {
        Self {
            position,
            direction: ParamDirection::Input,
            c_type,
            sql_type,
            column_size,
            decimal_digits,
            buffer: buffer.into_boxed_slice(),
            indicator: Box::new(indicator),
            dest: None,
        }
    }

    fn fixed(
        position: usize,
        encoding: TransferEncoding,
        sql_type: i16,
        column_size: usize,
        bytes: Vec<u8>,
    ) -> Self {
        let len = bytes.len() as isize;
        Self::new(
            position,
            encoding.c_type(),
            SqlType(sql_type),
            column_size,
            0,
            bytes,
            len,
        )
    }

    /// Encode text as null-terminated UTF-16.
    ///
    /// `capacity` sizes the buffer for output directions; the text must fit.
    pub(crate) fn text(position: usize, s: &str, capacity: Option<usize>) -> Result<Self> {
        let mut bytes = wide::encode_utf16z(s);
        let units = bytes.len() / 2 - 1;
        if let Some(capacity) = capacity {
            if bytes.len() > capacity {
                return Err(Error::ParameterTooLarge {
                    position,
                    needed: bytes.len(),
                    capacity,
                });
            }
            bytes.resize(capacity, 0);
        }
        Ok(Self::new(
            position,
            SQL_C_WCHAR,
            SqlType(SQL_WVARCHAR),
            units.max(1),
            0,
            bytes,
            SQL_NTS,
        ))
    }

    pub(crate) fn is_output(&self) -> bool {
        self.direction.is_output()
    }

    fn binding(&mut self) -> ParameterBinding {
        ParameterBinding {
            number: self.position as u16,
            direction: self.direction,
            c_type: self.c_type,
            sql_type: self.sql_type.code(),
            column_size: self.column_size,
            decimal_digits: self.decimal_digits,
            value: self.buffer.as_mut_ptr(),
            buffer_len: self.buffer.len() as isize,
            indicator: &mut *self.indicator,
        }
    }

    /// Register the buffer with the statement.
    pub(crate) fn register<H: CliStatement + ?Sized>(&mut self, handle: &H) -> Result<()> {
        let binding = self.binding();
        trace!(
            position = self.position,
            direction = ?self.direction,
            c_type = self.c_type,
            sql_type = self.sql_type.code(),
            buffer_len = binding.buffer_len,
            "binding parameter"
        );
        // SAFETY: buffer and indicator are boxed and owned by `self`; the
        // statement keeps `self` alive until the parameters are reset.
        let ret = unsafe { handle.bind_parameter(&binding) };
        handle.check(ret)?;
        Ok(())
    }
}

/// `SQLDescribeParam` for 1-based `position`.
pub(crate) fn describe<H: CliStatement + ?Sized>(
    handle: &H,
    position: usize,
) -> Result<ParamDescription> {
    let (ret, desc) = handle.describe_param(position as u16);
    handle.check(ret)?;
    Ok(desc)
}

/// Reject a described type the adapter cannot exchange.
pub(crate) fn supported(sql_type: SqlType, position: usize) -> Result<TransferEncoding> {
    match sql_type.encoding() {
        TransferEncoding::Unsupported => Err(Error::UnsupportedType {
            site: Site::Parameter(position),
            sql_type: sql_type.code(),
            type_name: sql_type.name(),
        }),
        encoding => Ok(encoding),
    }
}

/// One argument of a statement execution.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Input-only value.
    In(Value),
    /// Output-only parameter written to the destination after execute.
    Out(OutDest),
    /// Input value whose parameter is overwritten by the call.
    InOut(Value, OutDest),
}

impl Arg {
    pub fn input(value: impl Into<Value>) -> Self {
        Arg::In(value.into())
    }

    pub fn output(slot: &OutSlot) -> Self {
        Arg::Out(slot.dest())
    }

    pub fn inout(value: impl Into<Value>, slot: &OutSlot) -> Self {
        Arg::InOut(value.into(), slot.dest())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::In(value)
    }
}

/// An argument narrowed to bindable values, ready for encoding.
#[derive(Debug)]
pub(crate) enum PreparedArg {
    In(BindValue),
    Out(OutDest),
    InOut(BindValue, OutDest),
}

impl PreparedArg {
    /// Narrow `arg` at 1-based `position`; makes no native call.
    pub(crate) fn prepare(position: usize, arg: Arg) -> Result<Self> {
        Ok(match arg {
            Arg::In(value) => PreparedArg::In(BindValue::from_value(value, position)?),
            Arg::Out(dest) => PreparedArg::Out(dest),
            Arg::InOut(value, dest) => {
                PreparedArg::InOut(BindValue::from_value(value, position)?, dest)
            }
        })
    }

    /// Encode and register the argument.
    pub(crate) fn bind<H: CliStatement + ?Sized>(
        self,
        handle: &H,
        position: usize,
        options: &StatementOptions,
    ) -> Result<BoundParam> {
        let mut param = match self {
            PreparedArg::In(value) => BoundParam::encode(handle, position, &value, options)?,
            PreparedArg::Out(dest) => encode_output(handle, position, None, dest, options)?,
            PreparedArg::InOut(value, dest) => {
                encode_output(handle, position, Some(&value), dest, options)?
            }
        };
        param.register(handle)?;
        Ok(param)
    }
}

/// Column size of a timestamp string with `scale` fractional digits.
fn timestamp_column_size(scale: u8) -> usize {
    if scale == 0 {
        19
    } else {
        20 + scale as usize
    }
}
