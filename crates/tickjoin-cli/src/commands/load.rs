use serde_json::json;
use tickjoin_core::LayoutKind;
use tickjoin_warehouse::analysis::load_dataset;
use tickjoin_warehouse::Warehouse;

use crate::cli::LoadArgs;
use crate::config;
use crate::error::CliError;
use crate::output::Section;

use super::run::load_warnings;
use super::CommandResult;

pub fn run(args: &LoadArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let kind = args.kind.parse::<LayoutKind>()?;
    let table = args
        .table
        .as_deref()
        .unwrap_or_else(|| kind.default_table());

    let report = load_dataset(
        warehouse,
        kind,
        &args.path,
        table,
        config::parse_options(&args.parse),
        &config::inference_config(&args.parse),
    )?;

    let warnings = load_warnings(std::slice::from_ref(&report));
    let section = Section::Schema {
        table: report.table.table_name.clone(),
        tree: report.schema.tree_string(),
    };

    Ok(CommandResult::ok(json!({ "table": &report }))
        .with_warnings(warnings)
        .with_section(section))
}
