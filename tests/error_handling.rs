//! Error handling at the seams a user can hit: unreadable files, malformed
//! lines, bad table names and rejected queries.

use std::path::{Path, PathBuf};

use tickjoin_core::{
    DatasetError, InferenceConfig, LayoutError, LayoutKind, ParseError, ParseOptions,
};
use tickjoin_warehouse::analysis::load_dataset;
use tickjoin_warehouse::{QueryGuardrails, Warehouse, WarehouseError};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name)
}

fn load(
    warehouse: &Warehouse,
    kind: LayoutKind,
    path: &Path,
    table: &str,
    options: ParseOptions,
) -> Result<tickjoin_warehouse::LoadReport, WarehouseError> {
    load_dataset(
        warehouse,
        kind,
        path,
        table,
        options,
        &InferenceConfig::default(),
    )
}

#[test]
fn when_the_csv_file_is_missing_the_error_names_the_path() {
    // Given: A path that does not exist
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");
    let path = fixture("does_not_exist.csv");

    // When: It is loaded
    let error = load(
        &warehouse,
        LayoutKind::Dividends,
        &path,
        "dividends",
        ParseOptions::default(),
    )
    .expect_err("missing file");

    // Then: The I/O error carries the path
    match error {
        WarehouseError::Dataset(DatasetError::Io { path: reported, .. }) => {
            assert_eq!(reported, path);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn when_a_line_has_a_non_numeric_value_loading_stops_at_that_line() {
    // Given: A price file with "n/a" in a numeric column on line 3
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");

    // When: It is loaded with the default policy
    let error = load(
        &warehouse,
        LayoutKind::DailyPrices,
        &fixture("daily_prices_malformed.csv"),
        "daily_prices",
        ParseOptions::default(),
    )
    .expect_err("malformed");

    // Then: The error points at the line and column, and nothing was registered
    match error {
        WarehouseError::Dataset(DatasetError::Parse(ParseError::InvalidNumber {
            line,
            ref column,
            ref value,
        })) => {
            assert_eq!(line, 3);
            assert_eq!(column, "stock_price_high");
            assert_eq!(value, "n/a");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(warehouse.list_tables().expect("list").is_empty());
}

#[test]
fn when_malformed_lines_are_skipped_the_good_rows_still_load() {
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");

    let report = load(
        &warehouse,
        LayoutKind::DailyPrices,
        &fixture("daily_prices_malformed.csv"),
        "daily_prices",
        ParseOptions::default().skipping_malformed(),
    )
    .expect("skip policy loads");

    assert_eq!(report.table.row_count, 2);
    assert_eq!(report.parse.malformed_rows_skipped, 2);
    assert_eq!(report.parse.warnings, vec!["2 malformed line(s) skipped"]);
}

#[test]
fn when_a_price_file_is_empty_there_is_no_header_to_read() {
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");
    let temp = tempfile::NamedTempFile::new().expect("temp file");

    let error = load(
        &warehouse,
        LayoutKind::DailyPrices,
        temp.path(),
        "daily_prices",
        ParseOptions::default(),
    )
    .expect_err("empty price file");

    assert!(matches!(
        error,
        WarehouseError::Dataset(DatasetError::Layout(LayoutError::MissingHeader))
    ));
}

#[test]
fn when_a_dividend_file_is_empty_the_declared_schema_is_used() {
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");
    let temp = tempfile::NamedTempFile::new().expect("temp file");

    let report = load(
        &warehouse,
        LayoutKind::Dividends,
        temp.path(),
        "dividends",
        ParseOptions::default(),
    )
    .expect("empty dividends load");

    assert_eq!(report.table.row_count, 0);
    assert_eq!(report.schema.len(), 4);
    assert_eq!(report.parse.warnings.len(), 1);
    let schema = warehouse.describe_table("dividends").expect("describe");
    assert_eq!(schema.column_names(), vec!["exchange", "stock_symbol", "date", "dividends"]);
}

#[test]
fn when_a_table_name_is_not_an_identifier_it_is_rejected() {
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");

    for name in ["", "2024_prices", "prices;drop", "schema_migrations"] {
        let error = load(
            &warehouse,
            LayoutKind::Dividends,
            &fixture("dividends.csv"),
            name,
            ParseOptions::default(),
        )
        .expect_err("invalid name");
        assert!(
            matches!(error, WarehouseError::InvalidIdentifier { .. }),
            "{name}: {error:?}"
        );
    }
}

#[test]
fn when_read_only_queries_try_to_write_they_are_rejected() {
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");

    for sql in [
        "DROP TABLE tickjoin_catalog",
        "INSERT INTO tickjoin_catalog VALUES ('x')",
        "SELECT 1; DELETE FROM tickjoin_catalog",
        "EXPLAIN ANALYZE DELETE FROM dividends",
        "WITH x AS (SELECT 1) DELETE FROM tickjoin_catalog",
        "   ",
    ] {
        let error = warehouse
            .execute_query(sql, QueryGuardrails::default(), false)
            .expect_err("rejected");
        assert!(matches!(error, WarehouseError::QueryRejected(_)), "{sql}");
    }
}

#[test]
fn when_a_rejected_write_targets_loaded_data_the_data_is_unchanged() {
    // Given: Dividends registered alongside the catalog
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");
    load(
        &warehouse,
        LayoutKind::Dividends,
        &fixture("dividends.csv"),
        "dividends",
        ParseOptions::default(),
    )
    .expect("load");

    // When: Writes disguised as queries are sent in read-only mode
    for sql in [
        "EXPLAIN ANALYZE DELETE FROM dividends",
        "WITH x AS (SELECT 1) DELETE FROM tickjoin_catalog",
        "WITH x AS (SELECT 1) UPDATE dividends SET dividends = 0",
    ] {
        assert!(warehouse
            .execute_query(sql, QueryGuardrails::default(), false)
            .is_err());
    }

    // Then: Every row and the catalog entry survive
    let count = warehouse
        .execute_query(
            "SELECT COUNT(*) AS c, SUM(dividends) > 0 AS paid FROM dividends",
            QueryGuardrails::default(),
            false,
        )
        .expect("count");
    assert_eq!(count.rows[0][0], serde_json::json!(6));
    assert_eq!(count.rows[0][1], serde_json::json!(true));
    assert_eq!(warehouse.list_tables().expect("list").len(), 1);
}

#[test]
fn when_guardrails_are_zero_the_query_is_rejected_before_running() {
    let warehouse = Warehouse::open_in_memory().expect("warehouse open");

    let error = warehouse
        .execute_query(
            "SELECT 1",
            QueryGuardrails {
                max_rows: 0,
                query_timeout_ms: 1_000,
            },
            false,
        )
        .expect_err("rejected");

    assert!(matches!(error, WarehouseError::QueryRejected(_)));
}
