//! The exploratory dividend/price session: load both CSV files, then run a
//! fixed sequence of select, join and aggregate queries.

use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use tickjoin_core::{Dataset, InferenceConfig, LayoutKind, ParseOptions, ParseReport, TableSchema};

use crate::{QueryGuardrails, QueryResult, RegisteredTable, Warehouse, WarehouseError};

/// One query of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisStep {
    pub name: &'static str,
    pub title: &'static str,
    pub sql: &'static str,
}

pub const ANALYSIS_STEPS: &[AnalysisStep] = &[
    AnalysisStep {
        name: "all_dividends",
        title: "All dividend records",
        sql: "SELECT * FROM dividends",
    },
    AnalysisStep {
        name: "daily_prices_sample",
        title: "First ten daily prices",
        sql: "SELECT * FROM daily_prices LIMIT 10",
    },
    AnalysisStep {
        name: "dividend_price_join",
        title: "Dividends with the closing prices of the same day",
        sql: r#"SELECT d.exchange, d.stock_symbol, d.date, d.dividends,
    p.stock_price_adj_close, p.stock_price_close
FROM dividends d
INNER JOIN daily_prices p
    ON (d.stock_symbol = p.stock_symbol AND d.date = p.date)
ORDER BY d.stock_symbol, d.date
LIMIT 10"#,
    },
    AnalysisStep {
        name: "max_close_by_symbol",
        title: "Highest close on a dividend date, per symbol",
        sql: r#"SELECT d.stock_symbol, max(p.stock_price_close) AS max_close
FROM dividends d
INNER JOIN daily_prices p
    ON (d.stock_symbol = p.stock_symbol AND d.date = p.date)
GROUP BY d.stock_symbol
ORDER BY d.stock_symbol
LIMIT 10"#,
    },
    AnalysisStep {
        name: "close_stats_by_symbol",
        title: "Close statistics on dividend dates, per symbol",
        sql: r#"SELECT d.stock_symbol, max(p.stock_price_close) AS maximum,
    min(p.stock_price_close) AS minimum, avg(p.stock_price_close) AS average
FROM dividends d
INNER JOIN daily_prices p
    ON (d.stock_symbol = p.stock_symbol AND d.date = p.date)
GROUP BY d.stock_symbol
ORDER BY d.stock_symbol
LIMIT 10"#,
    },
];

/// Input files of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSources {
    pub dividends: PathBuf,
    pub daily_prices: PathBuf,
}

/// What was registered for one CSV file.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: RegisteredTable,
    pub schema: TableSchema,
    /// Column names in file order, as read from the layout.
    pub columns: Vec<String>,
    pub parse: ParseReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub step: AnalysisStep,
    pub result: QueryResult,
}

/// Read one CSV file and register it as `table`.
pub fn load_dataset(
    warehouse: &Warehouse,
    kind: LayoutKind,
    path: &Path,
    table: &str,
    options: ParseOptions,
    inference: &InferenceConfig,
) -> Result<LoadReport, WarehouseError> {
    let dataset = Dataset::read_csv(path, kind, options, inference)?;
    let table = warehouse.register_dataset(table, &dataset, Some(path))?;

    Ok(LoadReport {
        table,
        schema: dataset.schema().clone(),
        columns: dataset.layout().column_names(),
        parse: dataset.report().clone(),
    })
}

/// Register the dividend and daily price files under their session table names.
pub fn load_session(
    warehouse: &Warehouse,
    sources: &SessionSources,
    options: ParseOptions,
    inference: &InferenceConfig,
) -> Result<Vec<LoadReport>, WarehouseError> {
    let mut reports = Vec::with_capacity(2);
    for (kind, path) in [
        (LayoutKind::Dividends, sources.dividends.as_path()),
        (LayoutKind::DailyPrices, sources.daily_prices.as_path()),
    ] {
        reports.push(load_dataset(
            warehouse,
            kind,
            path,
            kind.default_table(),
            options,
            inference,
        )?);
    }
    Ok(reports)
}

/// Run every step in order, stopping at the first failing query.
pub fn run_analysis(
    warehouse: &Warehouse,
    guardrails: QueryGuardrails,
) -> Result<Vec<AnalysisOutcome>, WarehouseError> {
    ANALYSIS_STEPS
        .iter()
        .map(|step| {
            let result = warehouse.execute_query(step.sql, guardrails, false)?;
            info!("{}: {} row(s)", step.name, result.row_count);
            Ok(AnalysisOutcome {
                step: *step,
                result,
            })
        })
        .collect()
}
