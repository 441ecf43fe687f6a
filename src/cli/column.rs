//! Result-column decoding.
//!
//! Each column of an open result set owns a transfer buffer that the driver
//! fills on every fetch. Columns whose size cannot be known up front (XML,
//! LOBs declared with size 0) get no buffer and are read after the fetch with
//! repeated `SQLGetData` calls.

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::cli::constants::*;
use crate::cli::decode::decode_value;
use crate::cli::handle::{CliStatement, CliStatementExt, SqlReturn};
use crate::cli::types::{ColumnMetadata, SqlType, TransferEncoding, Value};
use crate::error::{Error, Result, Site};
use crate::options::StatementOptions;

/// Describe column `ordinal` (1-based).
///
/// The name buffer starts at `COLUMN_NAME_BUFFER_LEN` units; if the driver
/// reports a longer name the call is repeated once with a buffer that fits.
pub(crate) fn describe<H: CliStatement + ?Sized>(
    handle: &H,
    ordinal: u16,
) -> Result<ColumnMetadata> {
    let mut name = vec![0u16; COLUMN_NAME_BUFFER_LEN];
    let (mut ret, mut desc) = handle.describe_col(ordinal, &mut name);
    if ret.is_success_with_info() && desc.name_len >= name.len() {
        debug!(ordinal, name_len = desc.name_len, "column name truncated, describing again");
        name = vec![0u16; desc.name_len + 1];
        (ret, desc) = handle.describe_col(ordinal, &mut name);
    }
    handle.check(ret)?;

    let len = desc.name_len.min(name.len());
    let name = String::from_utf16_lossy(&name[..len])
        .trim_end_matches('\0')
        .to_string();
    Ok(ColumnMetadata {
        ordinal,
        name,
        sql_type: SqlType(desc.data_type),
        column_size: desc.column_size,
        decimal_digits: desc.decimal_digits,
        nullable: desc.nullable,
    })
}

/// One result column together with its transfer buffer.
///
/// The buffer and indicator are boxed so their addresses survive moves of the
/// `BoundColumn`; the driver holds both pointers from `bind` until the
/// statement's columns are unbound.
#[derive(Debug)]
pub(crate) struct BoundColumn {
    pub(crate) meta: ColumnMetadata,
    buffer: Option<Box<[u8]>>,
    indicator: Box<isize>,
}

impl BoundColumn {
    /// Size the transfer buffer for `meta`.
    ///
    /// Unsupported wire types are rejected here, before any fetch.
    pub(crate) fn allocate(meta: ColumnMetadata) -> Result<Self> {
        if meta.sql_type.encoding() == TransferEncoding::Unsupported {
            return Err(Error::UnsupportedType {
                site: Site::Column(meta.ordinal as usize),
                sql_type: meta.sql_type.code(),
                type_name: meta.sql_type.name(),
            });
        }
        let buffer = meta
            .sql_type
            .buffer_len(meta.column_size)
            .map(|len| vec![0u8; len].into_boxed_slice());
        Ok(Self {
            meta,
            buffer,
            indicator: Box::new(0),
        })
    }

    /// Whether the column is read with get-data after each fetch.
    pub(crate) fn is_unbound(&self) -> bool {
        self.buffer.is_none()
    }

    fn site(&self) -> Site {
        Site::Column(self.meta.ordinal as usize)
    }

    fn encoding(&self) -> TransferEncoding {
        self.meta.sql_type.encoding()
    }

    /// Register the transfer buffer so `SQLFetch` writes into it.
    pub(crate) fn bind<H: CliStatement + ?Sized>(&mut self, handle: &H) -> Result<()> {
        let c_type = self.encoding().c_type();
        let indicator: *mut isize = &mut *self.indicator;
        let buffer = match self.buffer.as_mut() {
            Some(buffer) => buffer,
            None => return Ok(()),
        };
        // SAFETY: both allocations are boxed and owned by `self`, which the
        // result set keeps alive until it unbinds its columns.
        let ret = unsafe {
            handle.bind_col(
                self.meta.ordinal,
                c_type,
                buffer.as_mut_ptr(),
                buffer.len() as isize,
                indicator,
            )
        };
        handle.check(ret)?;
        Ok(())
    }

    /// Decode the current row's value.
    pub(crate) fn value<H: CliStatement + ?Sized>(
        &self,
        handle: &H,
        options: &StatementOptions,
    ) -> Result<Value> {
        let site = self.site();
        match self.buffer.as_deref() {
            Some(buffer) => {
                let data = self.valid_bytes(buffer)?;
                decode_value(self.meta.sql_type, data, &options.time_zone, site)
            }
            None => {
                let data = fetch_unbound(handle, self.meta.ordinal, self.encoding(), options)?;
                decode_value(
                    self.meta.sql_type,
                    data.as_deref(),
                    &options.time_zone,
                    site,
                )
            }
        }
    }

    /// The bytes of `buffer` the indicator marks as valid.
    fn valid_bytes<'a>(&self, buffer: &'a [u8]) -> Result<Option<&'a [u8]>> {
        let indicator = *self.indicator;
        if indicator == SQL_NULL_DATA {
            return Ok(None);
        }
        let encoding = self.encoding();
        if encoding.fixed_size().is_some() {
            return Ok(Some(buffer));
        }
        let capacity = buffer.len().saturating_sub(encoding.terminator_len());
        if indicator == SQL_NO_TOTAL || indicator < 0 || indicator as usize > capacity {
            return Err(Error::truncation(
                self.site(),
                format!(
                    "value of {} bytes does not fit the {} byte buffer",
                    if indicator < 0 {
                        "unknown".to_string()
                    } else {
                        indicator.to_string()
                    },
                    capacity
                ),
            ));
        }
        Ok(Some(&buffer[..indicator as usize]))
    }
}

/// Cut the last truncated piece down to what the driver actually wrote.
///
/// A driver may stop short of the buffer (a character boundary, an internal
/// LOB chunk). The drop between two known remaining lengths is the true size
/// of the piece in between.
fn trim_last_piece(total: &mut BytesMut, last_piece: Option<(usize, usize)>, indicator: isize) {
    let (start, before) = match (last_piece, usize::try_from(indicator)) {
        (Some(last), Ok(_)) => last,
        _ => return,
    };
    let held = before.saturating_sub(indicator as usize);
    if start + held < total.len() {
        total.truncate(start + held);
    }
}

/// Bytes of `buf` the driver filled on a truncated get-data call.
fn filled_len(encoding: TransferEncoding, buf_len: usize) -> usize {
    let usable = buf_len.saturating_sub(encoding.terminator_len());
    if encoding == TransferEncoding::WChar {
        usable & !1
    } else {
        usable
    }
}

/// Read a column that has no bound buffer with repeated `SQLGetData` calls.
///
/// Returns `None` for NULL. On truncation the bytes received so far are kept
/// and the scratch buffer grows to the remaining size the driver reports
/// (plus room for a wide terminator). When the driver cannot report the
/// remaining size the buffer doubles, at most `max_unknown_growths` times.
pub(crate) fn fetch_unbound<H: CliStatement + ?Sized>(
    handle: &H,
    ordinal: u16,
    encoding: TransferEncoding,
    options: &StatementOptions,
) -> Result<Option<Vec<u8>>> {
    let site = Site::Column(ordinal as usize);
    let c_type = encoding.c_type();
    let mut buf = vec![0u8; options.get_data_chunk.max(2) & !1];
    let mut total = BytesMut::new();
    let mut unknown_growths = 0u32;
    // start of the last truncated piece and the remaining length reported with it
    let mut last_piece: Option<(usize, usize)> = None;

    loop {
        let mut indicator: isize = 0;
        let ret = handle.get_data(ordinal, c_type, &mut buf, &mut indicator);
        match ret {
            SqlReturn::SUCCESS => {
                if indicator == SQL_NULL_DATA {
                    return Ok(None);
                }
                trim_last_piece(&mut total, last_piece, indicator);
                let len = if indicator < 0 {
                    filled_len(encoding, buf.len())
                } else {
                    (indicator as usize).min(buf.len())
                };
                total.extend_from_slice(&buf[..len]);
                return Ok(Some(total.to_vec()));
            }
            SqlReturn::SUCCESS_WITH_INFO => {
                let state = handle.first_sql_state();
                if state.as_deref() != Some(SQLSTATE_STRING_TRUNCATED) {
                    return Err(Error::from_diagnostics(&handle.diagnostics()));
                }
                if indicator == SQL_NULL_DATA {
                    return Ok(None);
                }
                trim_last_piece(&mut total, last_piece, indicator);
                let written = filled_len(encoding, buf.len());
                last_piece = usize::try_from(indicator)
                    .ok()
                    .map(|remaining| (total.len(), remaining));
                total.extend_from_slice(&buf[..written]);

                if indicator == SQL_NO_TOTAL {
                    unknown_growths += 1;
                    if unknown_growths > options.max_unknown_growths {
                        return Err(Error::truncation(
                            site,
                            format!(
                                "total length still unknown after {} buffer growths ({} bytes read)",
                                options.max_unknown_growths,
                                total.len()
                            ),
                        ));
                    }
                    let grown = buf.len() * 2;
                    trace!(ordinal, from = buf.len(), to = grown, "get-data total unknown, growing");
                    buf.resize(grown, 0);
                } else if indicator >= 0 {
                    let remaining = (indicator as usize).saturating_sub(written);
                    let needed = (remaining + 2 + 1) & !1;
                    trace!(ordinal, received = total.len(), remaining, "get-data truncated");
                    if buf.len() < needed {
                        buf.resize(needed, 0);
                    }
                } else {
                    return Err(Error::truncation(
                        site,
                        format!("driver reported truncation with indicator {}", indicator),
                    ));
                }
            }
            SqlReturn::NO_DATA => return Ok(Some(total.to_vec())),
            _ => return Err(Error::from_diagnostics(&handle.diagnostics())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::mock::{MockCall, MockCell, MockColumn, MockResultSet, MockStatement};

    fn meta(sql_type: i16, size: usize) -> ColumnMetadata {
        ColumnMetadata {
            ordinal: 1,
            name: "C1".into(),
            sql_type: SqlType(sql_type),
            column_size: size,
            decimal_digits: 0,
            nullable: SQL_NULLABLE,
        }
    }

    fn one_cell(column: MockColumn, cell: MockCell) -> MockStatement {
        let mock = MockStatement::new()
            .with_result_set(MockResultSet::new(vec![column]).with_row(vec![cell]));
        assert!(mock.execute().is_success());
        assert!(mock.fetch().is_success());
        mock
    }

    #[test]
    fn test_null_indicator_ignores_garbage() {
        let mut column = BoundColumn::allocate(meta(SQL_INTEGER, 10)).unwrap();
        if let Some(buffer) = column.buffer.as_mut() {
            buffer.copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        }
        *column.indicator = SQL_NULL_DATA;
        let value = column
            .value(&MockStatement::new(), &StatementOptions::default())
            .unwrap();
        assert!(value.is_null());

        let mut text = BoundColumn::allocate(meta(SQL_VARCHAR, 4)).unwrap();
        if let Some(buffer) = text.buffer.as_mut() {
            buffer.copy_from_slice(b"junk\x01");
        }
        *text.indicator = SQL_NULL_DATA;
        assert!(text
            .value(&MockStatement::new(), &StatementOptions::default())
            .unwrap()
            .is_null());
    }

    #[test]
    fn test_bound_overflow_is_truncation() {
        let mut column = BoundColumn::allocate(meta(SQL_VARCHAR, 4)).unwrap();
        *column.indicator = 9;
        match column.value(&MockStatement::new(), &StatementOptions::default()) {
            Err(Error::Truncation { site, .. }) => assert_eq!(site, Site::Column(1)),
            other => panic!("expected truncation, got {:?}", other),
        }
        *column.indicator = SQL_NO_TOTAL;
        assert!(column
            .value(&MockStatement::new(), &StatementOptions::default())
            .is_err());
    }

    #[test]
    fn test_allocate_rejects_unsupported() {
        match BoundColumn::allocate(meta(-9999, 4)) {
            Err(Error::UnsupportedType { site, .. }) => assert_eq!(site, Site::Column(1)),
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_size_is_fetched_on_demand() {
        assert!(BoundColumn::allocate(meta(SQL_XML, 0)).unwrap().is_unbound());
        assert!(!BoundColumn::allocate(meta(SQL_VARCHAR, 1)).unwrap().is_unbound());
    }

    #[test]
    fn test_growth_uses_reported_remaining_size() {
        let payload = vec![7u8; 2085];
        let mock = one_cell(
            MockColumn::new("DOC", SQL_BLOB, 0),
            MockCell::bytes(&payload),
        );
        let data = fetch_unbound(&mock, 1, TransferEncoding::Binary, &StatementOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(data, payload);

        let sizes: Vec<usize> = mock
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::GetData { buffer_len, .. } => Some(buffer_len),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![1024, 1064]);
    }

    #[test]
    fn test_short_pieces_are_reassembled() {
        let mut payload = vec![b'a'; 1024];
        payload.extend(vec![b'b'; 1024]);
        payload.extend(vec![b'c'; 37]);
        let column = MockColumn::new("DOC", SQL_BLOB, 0).with_chunks([1024, 1024, 37]);

        // the scripted driver: two truncated pieces with known remaining length
        let mock = one_cell(column.clone(), MockCell::bytes(&payload));
        let mut buf = vec![0u8; 4096];
        let mut results = Vec::new();
        for _ in 0..3 {
            let mut indicator = 0isize;
            let ret = mock.get_data(1, SQL_C_BINARY, &mut buf, &mut indicator);
            results.push((ret, mock.first_sql_state(), indicator));
        }
        let truncated = Some(SQLSTATE_STRING_TRUNCATED.to_string());
        assert_eq!(
            results,
            vec![
                (SqlReturn::SUCCESS_WITH_INFO, truncated.clone(), 2085),
                (SqlReturn::SUCCESS_WITH_INFO, truncated, 1061),
                (SqlReturn::SUCCESS, None, 37),
            ]
        );

        let mock = one_cell(column, MockCell::bytes(&payload));
        let data = fetch_unbound(&mock, 1, TransferEncoding::Binary, &StatementOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(data.len(), 2085);
        assert_eq!(data, payload);
        let calls = mock
            .calls()
            .into_iter()
            .filter(|call| matches!(call, MockCall::GetData { .. }))
            .count();
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_wide_growth_keeps_whole_units() {
        let text: String = "é".repeat(700);
        let mock = one_cell(MockColumn::new("T", SQL_DBCLOB, 0), MockCell::wide(&text));
        let data = fetch_unbound(&mock, 1, TransferEncoding::WChar, &StatementOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(crate::cli::decode::wide::decode_utf16(&data), text);
    }

    #[test]
    fn test_get_data_null() {
        let mock = one_cell(MockColumn::new("DOC", SQL_XML, 0), MockCell::null());
        let data =
            fetch_unbound(&mock, 1, TransferEncoding::Binary, &StatementOptions::default()).unwrap();
        assert!(data.is_none());
    }

    #[test]
    fn test_describe_retries_long_name() {
        let long_name = "N".repeat(200);
        let mock = MockStatement::new().with_result_set(MockResultSet::new(vec![
            MockColumn::new(&long_name, SQL_INTEGER, 10),
        ]));
        assert!(mock.execute().is_success());
        let meta = describe(&mock, 1).unwrap();
        assert_eq!(meta.name, long_name);
        let describes = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::DescribeCol(1)))
            .count();
        assert_eq!(describes, 2);
    }
}
