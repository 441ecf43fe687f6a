//! Binding and execution against the scripted CLI.

use chrono::{FixedOffset, TimeZone};
use db2_cli_rs::cli::constants::*;
use db2_cli_rs::cli::handle::ParamDescription;
use db2_cli_rs::cli::mock::{MockCall, MockOp, MockStatement};
use db2_cli_rs::{
    Arg, Cursor, DiagRecord, Error, SqlReturn, Statement, StatementOptions, StatementState,
    TimeZonePolicy, Value,
};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn plus_two() -> FixedOffset {
    FixedOffset::east_opt(2 * 3600).unwrap()
}

fn echo_statement() -> Statement<MockStatement> {
    let options = StatementOptions::new().with_time_zone(TimeZonePolicy::Fixed(plus_two()));
    Statement::with_options(MockStatement::new().with_echo(), options)
}

async fn echo(stmt: &mut Statement<MockStatement>, args: Vec<Arg>) -> Vec<Value> {
    let mut rows = stmt.query(args, &CancellationToken::new()).await.unwrap();
    let row = rows.next().unwrap().expect("echo returns one row");
    assert!(rows.next().unwrap().is_none());
    row.values().to_vec()
}

#[tokio::test]
async fn test_round_trip_supported_values() {
    let mut stmt = echo_statement();
    let ts = plus_two()
        .with_ymd_and_hms(2024, 2, 29, 23, 59, 58)
        .unwrap()
        + chrono::Duration::milliseconds(250);
    let values = vec![
        Value::String("Hello, 世界".into()),
        Value::Int64(-9_007_199_254_740_993),
        Value::Float64(2.5e-3),
        Value::Bool(true),
        Value::Bool(false),
        Value::Timestamp(ts),
        Value::Bytes(vec![0, 1, 2, 0xff]),
    ];
    let args = values.iter().cloned().map(Arg::In).collect();

    let decoded = echo(&mut stmt, args).await;
    assert_eq!(decoded, values);
}

#[tokio::test]
async fn test_int32_widens_to_int64() {
    let mut stmt = echo_statement();
    let decoded = echo(&mut stmt, vec![Arg::input(7i32)]).await;
    assert_eq!(decoded, vec![Value::Int64(7)]);
}

#[tokio::test]
async fn test_timestamp_truncated_to_configured_scale() {
    let options = StatementOptions::new()
        .with_time_zone(TimeZonePolicy::Utc)
        .with_timestamp_scale(3);
    let mut stmt = Statement::with_options(MockStatement::new().with_echo(), options);
    let ts = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2023, 6, 1, 12, 0, 0)
        .unwrap()
        + chrono::Duration::nanoseconds(123_456_789);

    let decoded = echo(&mut stmt, vec![Arg::input(Value::Timestamp(ts))]).await;
    let expected = ts - chrono::Duration::nanoseconds(456_789);
    assert_eq!(decoded, vec![Value::Timestamp(expected)]);
}

#[tokio::test]
async fn test_empty_string_and_bytes_stay_non_null() {
    let mut stmt = echo_statement();
    let decoded = echo(&mut stmt, vec![Arg::input(""), Arg::input(Vec::<u8>::new())]).await;
    assert_eq!(decoded, vec![Value::String(String::new()), Value::Bytes(Vec::new())]);
}

#[tokio::test]
async fn test_null_parameter_uses_described_type() {
    let mock = MockStatement::new().with_echo().with_param(
        1,
        ParamDescription {
            data_type: SQL_INTEGER,
            parameter_size: 10,
            ..Default::default()
        },
    );
    let mut stmt = Statement::new(mock);
    let decoded = echo(&mut stmt, vec![Arg::input(Value::Null)]).await;
    assert_eq!(decoded, vec![Value::Null]);
    assert!(stmt.handle().calls().contains(&MockCall::DescribeParam(1)));
}

#[tokio::test]
async fn test_null_parameter_of_unsupported_type_is_rejected() {
    let mock = MockStatement::new().with_param(
        1,
        ParamDescription {
            data_type: 999,
            parameter_size: 8,
            ..Default::default()
        },
    );
    let mut stmt = Statement::new(mock);
    let err = assert_err!(stmt.bind(vec![Arg::input(Value::Null)]).await);
    assert!(matches!(
        err,
        Error::UnsupportedType {
            sql_type: 999,
            ..
        }
    ));
    assert_eq!(stmt.handle().calls(), vec![MockCall::DescribeParam(1)]);
    assert_eq!(stmt.handle().bound_params(), 0);
}

#[tokio::test]
async fn test_exec_reports_rows_affected() {
    let mut stmt = Statement::new(MockStatement::new().with_row_count(3));
    let count = stmt
        .exec(vec![Arg::input("x")], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(stmt.state(), StatementState::Succeeded);
}

#[tokio::test]
async fn test_no_data_execute_is_success() {
    let mock = MockStatement::new().with_execute_return(SqlReturn::NO_DATA);
    let mut stmt = Statement::new(mock);
    let count = assert_ok!(stmt.exec(vec![], &CancellationToken::new()).await);
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_still_executing_is_polled() {
    let mut stmt = Statement::new(MockStatement::new().with_still_executing(3));
    assert_ok!(stmt.execute(&CancellationToken::new()).await);
    let executes = stmt
        .handle()
        .calls()
        .into_iter()
        .filter(|c| *c == MockCall::Execute)
        .count();
    assert_eq!(executes, 4);
}

#[tokio::test]
async fn test_execute_failure_carries_diagnostics() {
    let mut stmt = Statement::new(MockStatement::new());
    stmt.handle().fail_next(
        MockOp::Execute,
        DiagRecord::new("42704", -204, "undefined name"),
    );
    let err = assert_err!(stmt.execute(&CancellationToken::new()).await);
    assert_eq!(err.sql_state(), Some("42704"));
    assert_eq!(err.sql_code(), Some(-204));
    assert!(!err.is_bad_connection());
    assert_eq!(stmt.state(), StatementState::Failed);
}

#[tokio::test]
async fn test_communication_failure_is_bad_connection() {
    let mut stmt = Statement::new(MockStatement::new());
    stmt.handle().fail_next(
        MockOp::Execute,
        DiagRecord::new("08S01", -30081, "communication error"),
    );
    let err = assert_err!(stmt.execute(&CancellationToken::new()).await);
    assert!(err.is_bad_connection());
}

#[tokio::test]
async fn test_failed_bind_releases_registered_params() {
    // parameter 2 is NULL and cannot be described
    let mut stmt = Statement::new(MockStatement::new());
    let err = assert_err!(
        stmt.bind(vec![Arg::input(1i64), Arg::input(Value::Null)])
            .await
    );
    assert_eq!(err.sql_state(), Some("07009"));
    assert_eq!(
        stmt.handle().calls(),
        vec![
            MockCall::BindParameter(1),
            MockCall::DescribeParam(2),
            MockCall::FreeStmt(db2_cli_rs::cli::handle::FreeStmt::ResetParams),
        ]
    );
    assert_eq!(stmt.handle().bound_params(), 0);
    assert_eq!(stmt.state(), StatementState::Failed);
}

#[tokio::test]
async fn test_bind_parameter_failure_surfaces_diagnostic() {
    let mut stmt = Statement::new(MockStatement::new());
    stmt.handle().fail_next(
        MockOp::BindParameter,
        DiagRecord::new("HY003", -99999, "invalid application buffer type"),
    );
    let err = assert_err!(stmt.bind(vec![Arg::input(1.5f64)]).await);
    assert!(matches!(err, Error::Cli { .. }));
    assert_eq!(err.sql_state(), Some("HY003"));
}

#[tokio::test]
async fn test_num_params() {
    let mut stmt = Statement::new(MockStatement::new().with_num_params(4));
    assert_eq!(stmt.num_params().await.unwrap(), 4);
}

#[tokio::test]
async fn test_row_count_failure_does_not_undo_execute() {
    let mut stmt = Statement::new(MockStatement::new());
    stmt.execute(&CancellationToken::new()).await.unwrap();
    stmt.handle()
        .fail_next(MockOp::RowCount, DiagRecord::new("HY010", -99999, "sequence error"));
    assert_err!(stmt.rows_affected().await);
    assert_eq!(stmt.state(), StatementState::Succeeded);
}
