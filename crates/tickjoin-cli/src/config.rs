//! Resolution of input paths and database location.
//!
//! Flags win over environment variables, which win over the defaults.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use tickjoin_core::{InferenceConfig, MalformedRowPolicy, ParseOptions};
use tickjoin_warehouse::{QueryGuardrails, SessionSources, WarehouseConfig};

use crate::cli::{Cli, Command, GuardrailArgs, ParseArgs, RunArgs};

pub const DIVIDENDS_ENV: &str = "TICKJOIN_DIVIDENDS_CSV";
pub const DAILY_PRICES_ENV: &str = "TICKJOIN_DAILY_PRICES_CSV";
pub const DEFAULT_DIVIDENDS_CSV: &str = "data/NYSE_dividends_A.csv";
pub const DEFAULT_DAILY_PRICES_CSV: &str = "data/NYSE_daily_prices_A.csv";

/// Warehouse settings for the parsed command line.
///
/// `run` keeps its tables in memory unless `--db` asks for a file.
pub fn warehouse_config(cli: &Cli) -> WarehouseConfig {
    let config = WarehouseConfig::default();
    if let Some(path) = &cli.db {
        return config.with_db_path(path.clone());
    }

    if cli.in_memory || matches!(cli.command, Command::Run(_)) {
        return WarehouseConfig::in_memory();
    }

    config
}

pub fn session_sources(args: &RunArgs) -> SessionSources {
    session_sources_from(args, |key| env::var_os(key))
}

fn session_sources_from(
    args: &RunArgs,
    lookup: impl Fn(&str) -> Option<OsString>,
) -> SessionSources {
    let resolve = |flag: &Option<PathBuf>, key: &str, default: &str| {
        flag.clone()
            .or_else(|| lookup(key).filter(|value| !value.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(default))
    };

    SessionSources {
        dividends: resolve(&args.dividends, DIVIDENDS_ENV, DEFAULT_DIVIDENDS_CSV),
        daily_prices: resolve(&args.daily_prices, DAILY_PRICES_ENV, DEFAULT_DAILY_PRICES_CSV),
    }
}

pub fn parse_options(args: &ParseArgs) -> ParseOptions {
    ParseOptions {
        malformed_rows: if args.skip_malformed {
            MalformedRowPolicy::Skip
        } else {
            MalformedRowPolicy::Fail
        },
        empty_numeric_as_null: args.empty_as_null,
    }
}

pub fn inference_config(args: &ParseArgs) -> InferenceConfig {
    InferenceConfig {
        sample_rows: args.sample_rows.max(1),
    }
}

pub fn guardrails(args: &GuardrailArgs) -> QueryGuardrails {
    QueryGuardrails {
        max_rows: args.max_rows,
        query_timeout_ms: args.query_timeout_ms,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tickjoin_warehouse::DatabaseLocation;

    use super::*;

    fn run_args(cli: &Cli) -> &RunArgs {
        match &cli.command {
            Command::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::parse_from(["tickjoin", "run", "--dividends", "flag.csv"]);
        let sources = session_sources_from(run_args(&cli), |key| {
            Some(OsString::from(format!("{key}.csv")))
        });

        assert_eq!(sources.dividends, PathBuf::from("flag.csv"));
        assert_eq!(
            sources.daily_prices,
            PathBuf::from("TICKJOIN_DAILY_PRICES_CSV.csv")
        );
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let cli = Cli::parse_from(["tickjoin", "run"]);
        let sources = session_sources_from(run_args(&cli), |_| Some(OsString::new()));
        assert_eq!(sources.dividends, PathBuf::from(DEFAULT_DIVIDENDS_CSV));
        assert_eq!(sources.daily_prices, PathBuf::from(DEFAULT_DAILY_PRICES_CSV));
    }

    #[test]
    fn run_is_in_memory_unless_db_is_given() {
        let cli = Cli::parse_from(["tickjoin", "run"]);
        assert_eq!(warehouse_config(&cli).location, DatabaseLocation::InMemory);

        let cli = Cli::parse_from(["tickjoin", "run", "--db", "session.duckdb"]);
        assert_eq!(
            warehouse_config(&cli).location,
            DatabaseLocation::File(PathBuf::from("session.duckdb"))
        );

        let cli = Cli::parse_from(["tickjoin", "tables"]);
        assert!(matches!(warehouse_config(&cli).location, DatabaseLocation::File(_)));
    }

    #[test]
    fn parse_switches_map_to_options() {
        let cli = Cli::parse_from([
            "tickjoin",
            "run",
            "--skip-malformed",
            "--empty-as-null",
            "--sample-rows",
            "0",
        ]);
        let args = run_args(&cli);
        let options = parse_options(&args.parse);
        assert_eq!(options.malformed_rows, MalformedRowPolicy::Skip);
        assert!(options.empty_numeric_as_null);
        assert_eq!(inference_config(&args.parse).sample_rows, 1);
    }
}
