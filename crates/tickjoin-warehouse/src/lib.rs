//! # tickjoin warehouse
//!
//! Embedded `DuckDB` storage for CSV datasets.
//!
//! A [`Dataset`] parsed by `tickjoin-core` is registered under a table name
//! with [`Warehouse::register_dataset`]; afterwards it is addressable from
//! SQL through [`Warehouse::execute_query`], which runs under
//! [`QueryGuardrails`] (row limit, timeout, read-only by default).
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tickjoin_core::{Dataset, InferenceConfig, LayoutKind, ParseOptions};
//! use tickjoin_warehouse::{QueryGuardrails, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_in_memory()?;
//!     let dividends = Dataset::read_csv(
//!         Path::new("data/NYSE_dividends_A.csv"),
//!         LayoutKind::Dividends,
//!         ParseOptions::default(),
//!         &InferenceConfig::default(),
//!     )?;
//!     warehouse.register_dataset("dividends", &dividends, None)?;
//!
//!     let result = warehouse.execute_query(
//!         "SELECT stock_symbol, SUM(dividends) FROM dividends GROUP BY 1",
//!         QueryGuardrails::default(),
//!         false,
//!     )?;
//!     println!("{} symbols", result.row_count);
//!     Ok(())
//! }
//! ```
//!
//! Registered datasets are tracked in the `tickjoin_catalog` table.

pub mod analysis;
pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::{appender_params_from_iter, params, Connection, ToSql};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;
use tickjoin_core::{DataType, Dataset, DatasetError, SchemaField, TableSchema};

pub use analysis::{AnalysisOutcome, AnalysisStep, LoadReport, SessionSources, ANALYSIS_STEPS};
pub use duckdb::{AccessMode, DatabaseLocation, DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A CSV file could not be turned into a dataset.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Query was rejected due to policy violation.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// Query execution timed out.
    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    #[error("table '{table}' does not exist")]
    UnknownTable { table: String },

    #[error("invalid table name '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    #[error("column '{column}' of table '{table}' has unsupported type {sql_type}")]
    UnsupportedColumnType {
        table: String,
        column: String,
        sql_type: String,
    },
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for tickjoin data.
    pub tickjoin_home: PathBuf,
    pub location: DatabaseLocation,
    /// Maximum number of idle connections kept per access mode.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let tickjoin_home = resolve_tickjoin_home();
        let db_path = tickjoin_home.join("cache").join("warehouse.duckdb");
        Self {
            tickjoin_home,
            location: DatabaseLocation::File(db_path),
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    pub fn in_memory() -> Self {
        Self {
            location: DatabaseLocation::InMemory,
            ..Self::default()
        }
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = DatabaseLocation::File(path.into());
        self
    }
}

/// Guardrails for query execution to prevent resource exhaustion.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    /// Maximum number of rows to return.
    pub max_rows: usize,
    /// Query timeout in milliseconds.
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

/// Column metadata for query results.
#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

/// Result of a SQL query execution.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    /// Row data as JSON values, in column order.
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// Whether rows were dropped because of `max_rows`.
    pub truncated: bool,
}

impl QueryResult {
    fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

/// Catalog entry for a dataset registered as a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredTable {
    pub table_name: String,
    pub layout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    pub row_count: u64,
    pub column_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<String>,
}

#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::in_memory())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.location.path().and_then(Path::parent) {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.location.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn location(&self) -> &DatabaseLocation {
        self.manager.location()
    }

    /// Create (or replace) `table` from `dataset` and record it in the catalog.
    ///
    /// Table creation, row loading and the catalog update share one
    /// transaction; on failure nothing is left behind.
    pub fn register_dataset(
        &self,
        table: &str,
        dataset: &Dataset,
        source: Option<&Path>,
    ) -> Result<RegisteredTable, WarehouseError> {
        let table = normalize_table_name(table)?;
        let schema = dataset.schema();
        let ddl = create_table_sql(&table, schema);
        debug!("{ddl}");

        let source_path = source.map(|path| path.to_string_lossy().into_owned());
        let row_count = dataset.row_count() as u64;
        let column_count = schema.len() as u32;

        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            connection.execute_batch(ddl.as_str())?;

            let mut appender = connection.appender(&table)?;
            for row in dataset.rows() {
                appender.append_row(appender_params_from_iter(row.values().iter().map(to_duck_value)))?;
            }
            appender.flush()?;
            drop(appender);

            connection.execute(
                r#"
INSERT OR REPLACE INTO tickjoin_catalog (
    table_name, layout, source_path, row_count, column_count, loaded_at
) VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
"#,
                params![
                    table.as_str(),
                    dataset.kind().as_str(),
                    source_path.as_deref(),
                    row_count as i64,
                    column_count,
                ],
            )?;
            Ok(())
        })();
        finalize_transaction(&connection, result)?;

        info!(
            "registered table {table} ({row_count} rows, {column_count} columns, layout {})",
            dataset.kind()
        );
        Ok(RegisteredTable {
            table_name: table,
            layout: dataset.kind().as_str().to_owned(),
            source_path,
            row_count,
            column_count,
            loaded_at: None,
        })
    }

    /// Column names and types of an existing table.
    pub fn describe_table(&self, table: &str) -> Result<TableSchema, WarehouseError> {
        let table = normalize_table_name(table)?;
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            r#"
SELECT column_name, data_type, is_nullable
FROM information_schema.columns
WHERE table_schema = 'main' AND table_name = ?
ORDER BY ordinal_position
"#,
        )?;
        let columns = statement
            .query_map(params![table.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(WarehouseError::UnknownTable { table });
        }

        let mut fields = Vec::with_capacity(columns.len());
        for (name, sql_type, is_nullable) in columns {
            let Some(data_type) = DataType::from_sql_type(&sql_type) else {
                return Err(WarehouseError::UnsupportedColumnType {
                    table,
                    column: name,
                    sql_type,
                });
            };
            fields.push(SchemaField {
                name,
                data_type,
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
            });
        }

        Ok(TableSchema::new(fields))
    }

    /// Catalog entries, ordered by table name.
    pub fn list_tables(&self) -> Result<Vec<RegisteredTable>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            r#"
SELECT table_name, layout, source_path, row_count, column_count, CAST(loaded_at AS VARCHAR)
FROM tickjoin_catalog
ORDER BY table_name
"#,
        )?;
        let tables = statement
            .query_map([], |row| {
                Ok(RegisteredTable {
                    table_name: row.get(0)?,
                    layout: row.get(1)?,
                    source_path: row.get(2)?,
                    row_count: row.get::<_, i64>(3)?.max(0) as u64,
                    column_count: row.get::<_, i32>(4)?.max(0) as u32,
                    loaded_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        allow_write: bool,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;

        if !allow_write {
            enforce_read_only_query(sql)?;
        }

        let mode = if allow_write {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        debug!("executing ({mode:?}): {sql}");
        let connection = self.manager.acquire(mode)?;
        execute_with_guardrails(&connection, sql, guardrails, allow_write)
    }
}

/// Resolve the data directory: `TICKJOIN_HOME`, then `$HOME/.tickjoin`.
pub fn resolve_tickjoin_home() -> PathBuf {
    if let Some(path) = env::var_os("TICKJOIN_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickjoin");
    }

    PathBuf::from(".tickjoin")
}

/// Commit when `result` is a success, roll back otherwise.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Roll back unconditionally; the query error, if any, wins over a rollback error.
fn rollback_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    let rollback = connection.execute_batch("ROLLBACK");
    let value = result?;
    rollback?;
    Ok(value)
}

/// Validate a table name and fold it to lower case.
fn normalize_table_name(name: &str) -> Result<String, WarehouseError> {
    let trimmed = name.trim();
    let invalid = |reason| WarehouseError::InvalidIdentifier {
        name: name.to_owned(),
        reason,
    };

    let mut chars = trimmed.chars();
    match chars.next() {
        None => return Err(invalid("name must not be empty")),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            return Err(invalid("name must start with a letter or underscore"));
        }
        Some(_) => {}
    }
    if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(invalid("only ASCII letters, digits and underscores are allowed"));
    }

    let normalized = trimmed.to_ascii_lowercase();
    if migrations::RESERVED_TABLES.contains(&normalized.as_str()) {
        return Err(invalid("name is reserved for warehouse metadata"));
    }
    Ok(normalized)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE OR REPLACE TABLE` statement for an inferred schema.
fn create_table_sql(table: &str, schema: &TableSchema) -> String {
    let columns = schema
        .fields
        .iter()
        .map(|field| {
            let constraint = if field.nullable { "" } else { " NOT NULL" };
            format!(
                "{} {}{constraint}",
                quote_identifier(&field.name),
                field.data_type.sql_type()
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE OR REPLACE TABLE {} ({columns})", quote_identifier(table))
}

fn to_duck_value(value: &tickjoin_core::Value) -> DuckValue {
    match value {
        tickjoin_core::Value::Text(text) => DuckValue::Text(text.clone()),
        tickjoin_core::Value::Double(number) => DuckValue::Double(*number),
        tickjoin_core::Value::Null => DuckValue::Null,
    }
}

/// Run `sql` under the row and time limits.
///
/// Read-only queries run inside a transaction that is always rolled back,
/// so nothing they touch is persisted.
fn execute_with_guardrails(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    allow_write: bool,
) -> Result<QueryResult, WarehouseError> {
    let started = Instant::now();
    if !allow_write {
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = execute_select_query(connection, sql, guardrails, started);
        return rollback_transaction(connection, result);
    }

    if is_select_like(sql) {
        execute_select_query(connection, sql, guardrails, started)
    } else {
        connection.execute_batch(sql)?;
        ensure_timeout(started, guardrails.timeout())?;
        Ok(QueryResult::empty())
    }
}

/// Collect column metadata and at most `max_rows` rows.
fn execute_select_query(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    // Column metadata is only available once the statement has run.
    let _ = statement.query([] as [&dyn ToSql; 0])?;

    let column_count = statement.column_count();
    let mut columns = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let name = statement.column_name(index)?.to_string();
        let dtype = statement.column_type(index);
        columns.push(SqlColumn {
            name,
            r#type: dtype.to_string(),
        });
    }

    let mut rows_cursor = statement.query([] as [&dyn ToSql; 0])?;
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows_cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;

        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }

        rows.push(read_row(row, column_count)?);
    }

    ensure_timeout(started, guardrails.timeout())?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

/// DuckDB value to JSON; blobs become hex strings.
fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

/// NaN and infinities have no JSON form and become null.
fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Trim the query and drop trailing semicolons.
fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

/// Keywords that modify data, schema or session state.
const WRITE_KEYWORDS: &[&str] = &[
    "ALTER", "ANALYZE", "ATTACH", "CALL", "CHECKPOINT", "COPY", "CREATE", "DELETE", "DETACH",
    "DROP", "EXPORT", "IMPORT", "INSERT", "INSTALL", "LOAD", "MERGE", "PRAGMA", "RESET", "SET",
    "TRUNCATE", "UPDATE", "USE", "VACUUM",
];

/// Accept a single query statement with no write keyword anywhere in it.
///
/// `EXPLAIN ANALYZE` executes its statement, and a `WITH` clause can lead
/// into `DELETE` or `INSERT`, so the whole statement is scanned.
fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    let scan = scan_sql(sql);
    if scan.statements > 1 {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed in read-only mode",
        )));
    }
    if !is_select_like(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "read-only mode accepts only SELECT/CTE queries; use --write for write statements",
        )));
    }
    if let Some(keyword) = scan
        .words
        .iter()
        .find(|word| WRITE_KEYWORDS.contains(&word.as_str()))
    {
        return Err(WarehouseError::QueryRejected(format!(
            "read-only mode does not allow {keyword}; use --write for write statements"
        )));
    }
    Ok(())
}

/// First keyword is one of the query statements.
fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    )
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SqlScan {
    /// Bare words, upper-cased.
    words: Vec<String>,
    statements: usize,
}

/// Split `sql` into bare words and count its statements. String literals,
/// quoted identifiers and comments contribute no words.
fn scan_sql(sql: &str) -> SqlScan {
    let mut scan = SqlScan::default();
    let mut word = String::new();
    let mut in_statement = false;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            word.push(ch.to_ascii_uppercase());
            in_statement = true;
            continue;
        }
        if !word.is_empty() {
            scan.words.push(std::mem::take(&mut word));
        }

        match ch {
            '\'' | '"' => {
                in_statement = true;
                for next in chars.by_ref() {
                    if next == ch {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        break;
                    }
                }
            }
            ';' => {
                if in_statement {
                    scan.statements += 1;
                    in_statement = false;
                }
            }
            other if !other.is_whitespace() => in_statement = true,
            _ => {}
        }
    }

    if !word.is_empty() {
        scan.words.push(word);
    }
    if in_statement {
        scan.statements += 1;
    }
    scan
}

/// Fail once the elapsed time passes `timeout`.
fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        });
    }
    Ok(())
}
