//! CLI date/time struct codecs.
//!
//! The CLI exchanges dates and times as C structs of native-endian integers:
//!
//! ```text
//! DATE_STRUCT       year:i16 month:u16 day:u16                          (6 bytes)
//! TIME_STRUCT       hour:u16 minute:u16 second:u16                      (6 bytes)
//! TIMESTAMP_STRUCT  year:i16 month:u16 day:u16 hour:u16 minute:u16
//!                   second:u16 fraction:u32 (nanoseconds)               (16 bytes)
//! ```

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};

pub const DATE_STRUCT_LEN: usize = 6;
pub const TIME_STRUCT_LEN: usize = 6;
pub const TIMESTAMP_STRUCT_LEN: usize = 16;

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_ne_bytes([data[offset], data[offset + 1]])
}

fn i16_at(data: &[u8], offset: usize) -> i16 {
    i16::from_ne_bytes([data[offset], data[offset + 1]])
}

fn expect_len(data: &[u8], len: usize, what: &str) -> Result<()> {
    if data.len() < len {
        return Err(Error::type_conversion(format!(
            "{} value must be {} bytes, got {}",
            what,
            len,
            data.len()
        )));
    }
    Ok(())
}

fn date_from_fields(year: i16, month: u16, day: u16) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).ok_or_else(|| {
        Error::type_conversion(format!(
            "Invalid DATE: year={}, month={}, day={}",
            year, month, day
        ))
    })
}

fn time_from_fields(hour: u16, minute: u16, second: u16, nanos: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_nano_opt(hour as u32, minute as u32, second as u32, nanos).ok_or_else(
        || {
            Error::type_conversion(format!(
                "Invalid TIME: hour={}, minute={}, second={}, fraction={}",
                hour, minute, second, nanos
            ))
        },
    )
}

/// Decode a `DATE_STRUCT`.
pub fn decode_date(data: &[u8]) -> Result<NaiveDate> {
    expect_len(data, DATE_STRUCT_LEN, "DATE")?;
    date_from_fields(i16_at(data, 0), u16_at(data, 2), u16_at(data, 4))
}

/// Decode a `TIME_STRUCT`.
pub fn decode_time(data: &[u8]) -> Result<NaiveTime> {
    expect_len(data, TIME_STRUCT_LEN, "TIME")?;
    time_from_fields(u16_at(data, 0), u16_at(data, 2), u16_at(data, 4), 0)
}

/// Decode a `TIMESTAMP_STRUCT`.
pub fn decode_timestamp(data: &[u8]) -> Result<NaiveDateTime> {
    expect_len(data, TIMESTAMP_STRUCT_LEN, "TIMESTAMP")?;
    let date = date_from_fields(i16_at(data, 0), u16_at(data, 2), u16_at(data, 4))?;
    let fraction = u32::from_ne_bytes([data[12], data[13], data[14], data[15]]);
    let time = time_from_fields(u16_at(data, 6), u16_at(data, 8), u16_at(data, 10), fraction)?;
    Ok(NaiveDateTime::new(date, time))
}

/// Encode a `DATE_STRUCT`. Years outside the `i16` range are rejected.
pub fn encode_date(date: NaiveDate) -> Result<[u8; DATE_STRUCT_LEN]> {
    let year = i16::try_from(date.year()).map_err(|_| {
        Error::type_conversion(format!("year {} does not fit a DATE_STRUCT", date.year()))
    })?;
    let mut out = [0u8; DATE_STRUCT_LEN];
    out[0..2].copy_from_slice(&year.to_ne_bytes());
    out[2..4].copy_from_slice(&(date.month() as u16).to_ne_bytes());
    out[4..6].copy_from_slice(&(date.day() as u16).to_ne_bytes());
    Ok(out)
}

pub fn encode_time(time: NaiveTime) -> [u8; TIME_STRUCT_LEN] {
    let mut out = [0u8; TIME_STRUCT_LEN];
    out[0..2].copy_from_slice(&(time.hour() as u16).to_ne_bytes());
    out[2..4].copy_from_slice(&(time.minute() as u16).to_ne_bytes());
    out[4..6].copy_from_slice(&(time.second() as u16).to_ne_bytes());
    out
}

/// Encode a `TIMESTAMP_STRUCT`, keeping `scale` fractional-second digits.
///
/// Digits below the scale are truncated, not rounded. A leap second
/// (`nanosecond() >= 1e9`) is folded into the last representable fraction.
pub fn encode_timestamp(value: NaiveDateTime, scale: u8) -> Result<[u8; TIMESTAMP_STRUCT_LEN]> {
    let mut out = [0u8; TIMESTAMP_STRUCT_LEN];
    out[0..6].copy_from_slice(&encode_date(value.date())?);
    out[6..8].copy_from_slice(&(value.hour() as u16).to_ne_bytes());
    out[8..10].copy_from_slice(&(value.minute() as u16).to_ne_bytes());
    out[10..12].copy_from_slice(&(value.second() as u16).to_ne_bytes());
    out[12..16].copy_from_slice(&truncate_fraction(value.nanosecond(), scale).to_ne_bytes());
    Ok(out)
}

/// Drop fractional-second digits beyond `scale`.
pub fn truncate_fraction(nanos: u32, scale: u8) -> u32 {
    let nanos = nanos.min(999_999_999);
    let unit = 10u32.pow(9 - u32::from(scale.min(9)));
    nanos - nanos % unit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(nanos: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 21)
            .unwrap()
            .and_hms_nano_opt(12, 36, 5, nanos)
            .unwrap()
    }

    #[test]
    fn test_timestamp_layout() {
        let bytes = encode_timestamp(stamp(123_000_000), 3).unwrap();
        assert_eq!(i16::from_ne_bytes([bytes[0], bytes[1]]), 2024);
        assert_eq!(u16::from_ne_bytes([bytes[2], bytes[3]]), 10);
        assert_eq!(u16::from_ne_bytes([bytes[4], bytes[5]]), 21);
        assert_eq!(u16::from_ne_bytes([bytes[6], bytes[7]]), 12);
        assert_eq!(
            u32::from_ne_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            123_000_000
        );
        assert_eq!(decode_timestamp(&bytes).unwrap(), stamp(123_000_000));
    }

    #[test]
    fn test_timestamp_scale_truncates() {
        let bytes = encode_timestamp(stamp(123_456_789), 3).unwrap();
        assert_eq!(decode_timestamp(&bytes).unwrap(), stamp(123_000_000));

        let bytes = encode_timestamp(stamp(123_456_789), 0).unwrap();
        assert_eq!(decode_timestamp(&bytes).unwrap(), stamp(0));

        let bytes = encode_timestamp(stamp(123_456_789), 9).unwrap();
        assert_eq!(decode_timestamp(&bytes).unwrap(), stamp(123_456_789));
    }

    #[test]
    fn test_date_and_time() {
        let date = NaiveDate::from_ymd_opt(1999, 6, 15).unwrap();
        assert_eq!(decode_date(&encode_date(date).unwrap()).unwrap(), date);

        let time = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(decode_time(&encode_time(time)).unwrap(), time);
    }

    #[test]
    fn test_decode_short_buffer() {
        assert!(decode_timestamp(&[0u8; 6]).is_err());
        assert!(decode_date(&[0u8; 3]).is_err());
    }

    #[test]
    fn test_year_outside_struct_range_is_rejected() {
        let far = NaiveDate::from_ymd_opt(40_000, 1, 1).unwrap();
        assert!(matches!(
            encode_date(far),
            Err(Error::TypeConversion { .. })
        ));
        assert!(encode_timestamp(far.and_hms_opt(0, 0, 0).unwrap(), 3).is_err());
        let edge = NaiveDate::from_ymd_opt(i16::MAX as i32, 12, 31).unwrap();
        assert_eq!(decode_date(&encode_date(edge).unwrap()).unwrap(), edge);
    }

    #[test]
    fn test_decode_invalid_month() {
        let mut bytes = encode_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()).unwrap();
        bytes[2..4].copy_from_slice(&13u16.to_ne_bytes());
        assert!(decode_date(&bytes).is_err());
    }
}
