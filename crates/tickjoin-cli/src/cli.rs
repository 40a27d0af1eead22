//! CLI argument definitions for tickjoin.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Load both CSV files and run the dividend/price analysis |
//! | `load` | Register one CSV file as a table |
//! | `schema` | Print the schema tree of a table |
//! | `tables` | List registered datasets |
//! | `sql` | Run an ad-hoc query |
//!
//! # Examples
//!
//! ```bash
//! tickjoin run --dividends data/NYSE_dividends_A.csv --daily-prices data/NYSE_daily_prices_A.csv
//! tickjoin load daily-prices data/NYSE_daily_prices_A.csv
//! tickjoin sql "SELECT stock_symbol, COUNT(*) FROM daily_prices GROUP BY 1" --format json --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Load NYSE dividend and daily price CSV files into DuckDB and query them.
#[derive(Debug, Parser)]
#[command(name = "tickjoin", author, version, about)]
pub struct Cli {
    /// Output format for results.
    ///
    /// - table: schema trees and `Row(...)` lines (default)
    /// - json: single JSON envelope
    /// - ndjson: one JSON object per result section
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// DuckDB database file (default: $TICKJOIN_HOME/cache/warehouse.duckdb).
    #[arg(long, global = true, conflicts_with = "in_memory")]
    pub db: Option<PathBuf>,

    /// Use a throwaway in-memory database.
    #[arg(long, global = true, default_value_t = false)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Ndjson,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load both CSV files and run the dividend/price analysis.
    ///
    /// Uses an in-memory database unless --db is given. --max-rows caps
    /// every step, the full dividend listing included; a capped step is
    /// reported as a warning.
    Run(RunArgs),

    /// Register one CSV file as a table.
    Load(LoadArgs),

    /// Print the schema tree of a table.
    Schema(SchemaArgs),

    /// List datasets registered in the warehouse catalog.
    Tables,

    /// Run SQL against the warehouse.
    ///
    /// Read-only by default; use --write for data modifications.
    Sql(SqlArgs),
}

/// Parsing switches shared by `run` and `load`.
#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Drop lines that cannot be parsed instead of aborting.
    #[arg(long, default_value_t = false)]
    pub skip_malformed: bool,

    /// Load empty numeric fields as NULL.
    #[arg(long, default_value_t = false)]
    pub empty_as_null: bool,

    /// Rows inspected per column when inferring the schema.
    #[arg(long, default_value_t = 100)]
    pub sample_rows: usize,
}

#[derive(Debug, Args)]
pub struct GuardrailArgs {
    /// Maximum number of rows returned per query.
    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    /// Query timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Dividends CSV (default: $TICKJOIN_DIVIDENDS_CSV or data/NYSE_dividends_A.csv).
    #[arg(long)]
    pub dividends: Option<PathBuf>,

    /// Daily prices CSV (default: $TICKJOIN_DAILY_PRICES_CSV or data/NYSE_daily_prices_A.csv).
    #[arg(long)]
    pub daily_prices: Option<PathBuf>,

    #[command(flatten)]
    pub parse: ParseArgs,

    #[command(flatten)]
    pub guardrails: GuardrailArgs,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Dataset shape: dividends or daily-prices.
    pub kind: String,

    /// CSV file to load.
    pub path: PathBuf,

    /// Table name (default: dividends / daily_prices).
    #[arg(long)]
    pub table: Option<String>,

    #[command(flatten)]
    pub parse: ParseArgs,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Registered table name.
    pub table: String,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL query to execute.
    pub query: String,

    /// Allow write operations (INSERT, UPDATE, DELETE, CREATE, etc.).
    #[arg(long, default_value_t = false)]
    pub write: bool,

    /// Attach the query plan to the output warnings.
    #[arg(long, default_value_t = false)]
    pub explain: bool,

    #[command(flatten)]
    pub guardrails: GuardrailArgs,
}
