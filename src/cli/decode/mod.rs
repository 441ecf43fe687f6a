//! Decoding of CLI transfer buffers into host values.
//!
//! Columns and output parameters share these rules; they differ only in how
//! they find the valid bytes of a buffer.

mod datetime;
pub mod wide;

pub use datetime::{
    decode_date, decode_time, decode_timestamp, encode_date, encode_time, encode_timestamp,
    truncate_fraction, DATE_STRUCT_LEN, TIMESTAMP_STRUCT_LEN, TIME_STRUCT_LEN,
};

use crate::cli::types::{SqlType, TransferEncoding, Value};
use crate::error::{Error, Result, Site};
use crate::options::TimeZonePolicy;

fn fixed<const N: usize>(data: &[u8], sql_type: SqlType) -> Result<[u8; N]> {
    data.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| {
            Error::type_conversion(format!(
                "{} value needs {} bytes, got {}",
                sql_type,
                N,
                data.len()
            ))
        })
}

/// Decode the valid bytes of a transfer buffer.
///
/// `data` is `None` when the indicator reported NULL or no buffer exists;
/// the bytes are never looked at in that case. Text slices exclude the
/// terminator.
pub fn decode_value(
    sql_type: SqlType,
    data: Option<&[u8]>,
    time_zone: &TimeZonePolicy,
    site: Site,
) -> Result<Value> {
    let data = match data {
        Some(data) => data,
        None => return Ok(Value::Null),
    };

    match sql_type.encoding() {
        TransferEncoding::Bit => Ok(Value::Bool(fixed::<1>(data, sql_type)?[0] != 0)),
        TransferEncoding::Long => Ok(Value::Int32(i32::from_ne_bytes(fixed(data, sql_type)?))),
        TransferEncoding::BigInt => Ok(Value::Int64(i64::from_ne_bytes(fixed(data, sql_type)?))),
        TransferEncoding::Double => {
            Ok(Value::Float64(f64::from_ne_bytes(fixed(data, sql_type)?)))
        }
        TransferEncoding::Char => {
            let text = std::str::from_utf8(data).map_err(|err| {
                Error::type_conversion(format!(
                    "{} text at {} is not valid UTF-8: {}",
                    sql_type, site, err
                ))
            })?;
            if sql_type.is_decimal_text() {
                parse_decimal(text, sql_type, site).map(Value::Float64)
            } else {
                Ok(Value::String(text.to_owned()))
            }
        }
        TransferEncoding::WChar => Ok(Value::String(wide::decode_utf16(data))),
        TransferEncoding::Date => {
            let date = decode_date(data)?;
            let midnight = date.and_time(chrono::NaiveTime::MIN);
            time_zone.attach(midnight).map(Value::Timestamp)
        }
        TransferEncoding::Time => decode_time(data).map(Value::Time),
        TransferEncoding::Timestamp => {
            let naive = decode_timestamp(data)?;
            time_zone.attach(naive).map(Value::Timestamp)
        }
        TransferEncoding::Binary => Ok(Value::Bytes(data.to_vec())),
        TransferEncoding::Unsupported => Err(Error::UnsupportedType {
            site,
            sql_type: sql_type.code(),
            type_name: sql_type.name(),
        }),
    }
}

fn parse_decimal(text: &str, sql_type: SqlType, site: Site) -> Result<f64> {
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    trimmed.parse::<f64>().map_err(|_| {
        Error::type_conversion(format!(
            "{} text {:?} at {} is not a number",
            sql_type, trimmed, site
        ))
    })
}
