//! Per-statement configuration.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// Default fractional-second digits sent with timestamp parameters.
pub const DEFAULT_TIMESTAMP_SCALE: u8 = 3;
/// Default initial scratch size for columns fetched on demand.
pub const DEFAULT_GET_DATA_CHUNK: usize = 1024;
/// Default cap on growth steps when the driver cannot report a total length.
pub const DEFAULT_MAX_UNKNOWN_GROWTHS: u32 = 32;
/// Default buffer size for output parameters declared without a size.
pub const DEFAULT_UNSIZED_OUT_CAPACITY: usize = 32 * 1024;

/// Time zone the CLI date/time structs are interpreted in.
///
/// The CLI exchanges wall-clock fields with no offset. Decoded timestamps get
/// this zone attached; bound timestamps are converted into it before their
/// fields are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZonePolicy {
    /// The process-local zone, the convention of the DB2 client library.
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl TimeZonePolicy {
    /// Attach this zone to a wall-clock value read from the database.
    ///
    /// A local time that falls in a daylight-saving gap is moved forward by
    /// the size of the gap; an ambiguous one resolves to the earlier instant.
    pub fn attach(&self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
        match self {
            TimeZonePolicy::Utc => Ok(Utc.from_utc_datetime(&naive).fixed_offset()),
            TimeZonePolicy::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| Error::type_conversion(format!("invalid local time {}", naive))),
            TimeZonePolicy::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .or_else(|| {
                    Local
                        .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                        .earliest()
                })
                .map(|dt| dt.fixed_offset())
                .ok_or_else(|| Error::type_conversion(format!("invalid local time {}", naive))),
        }
    }

    /// Wall-clock fields of `value` in this zone.
    pub fn wall_clock(&self, value: &DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            TimeZonePolicy::Utc => value.naive_utc(),
            TimeZonePolicy::Fixed(offset) => value.with_timezone(offset).naive_local(),
            TimeZonePolicy::Local => value.with_timezone(&Local).naive_local(),
        }
    }
}

/// Options applied to every bind, execute and fetch of a statement.
#[derive(Debug, Clone)]
pub struct StatementOptions {
    /// Deadline after which a running execute is cancelled.
    pub query_timeout: Option<Duration>,
    /// Zone used for date/time conversion.
    pub time_zone: TimeZonePolicy,
    /// Fractional-second digits of bound timestamps (0..=9).
    pub timestamp_scale: u8,
    /// Initial scratch buffer for columns read with get-data.
    pub get_data_chunk: usize,
    /// Growth steps allowed while the driver reports an unknown total.
    pub max_unknown_growths: u32,
    /// Buffer size for output parameters the server declares with size 0.
    pub unsized_out_capacity: usize,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            query_timeout: None,
            time_zone: TimeZonePolicy::Local,
            timestamp_scale: DEFAULT_TIMESTAMP_SCALE,
            get_data_chunk: DEFAULT_GET_DATA_CHUNK,
            max_unknown_growths: DEFAULT_MAX_UNKNOWN_GROWTHS,
            unsized_out_capacity: DEFAULT_UNSIZED_OUT_CAPACITY,
        }
    }
}

impl StatementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel executes that run longer than `timeout`.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_time_zone(mut self, time_zone: TimeZonePolicy) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Set the fractional-second digits of bound timestamps; clamped to 9.
    pub fn with_timestamp_scale(mut self, scale: u8) -> Self {
        self.timestamp_scale = scale.min(9);
        self
    }

    /// Set the initial get-data scratch size; at least 16 bytes.
    pub fn with_get_data_chunk(mut self, size: usize) -> Self {
        self.get_data_chunk = size.max(16);
        self
    }

    pub fn with_max_unknown_growths(mut self, limit: u32) -> Self {
        self.max_unknown_growths = limit;
        self
    }

    pub fn with_unsized_out_capacity(mut self, size: usize) -> Self {
        self.unsized_out_capacity = size;
        self
    }
}
