use serde_json::json;
use tickjoin_core::LayoutKind;
use tickjoin_warehouse::analysis::{load_session, run_analysis};
use tickjoin_warehouse::{LoadReport, Warehouse};

use crate::cli::RunArgs;
use crate::config;
use crate::error::CliError;
use crate::output::Section;

use super::CommandResult;

pub fn run(args: &RunArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let sources = config::session_sources(args);
    let loads = load_session(
        warehouse,
        &sources,
        config::parse_options(&args.parse),
        &config::inference_config(&args.parse),
    )?;
    let outcomes = run_analysis(warehouse, config::guardrails(&args.guardrails))?;

    let mut command_result = CommandResult::ok(json!({
        "tables": &loads,
        "steps": &outcomes,
    }))
    .with_warnings(load_warnings(&loads));

    for outcome in &outcomes {
        if outcome.result.truncated {
            command_result = command_result.with_warning(format!(
                "{}: result truncated at {} rows (use --max-rows to increase limit)",
                outcome.step.name, outcome.result.row_count
            ));
        }
    }

    // Each table is described right before the first step that lists it.
    for (load, outcome) in loads.iter().zip(&outcomes) {
        for section in table_sections(load) {
            command_result = command_result.with_section(section);
        }
        command_result =
            command_result.with_section(Section::rows(outcome.step.title, &outcome.result));
    }
    for outcome in outcomes.iter().skip(loads.len()) {
        command_result =
            command_result.with_section(Section::rows(outcome.step.title, &outcome.result));
    }

    Ok(command_result)
}

fn table_sections(load: &LoadReport) -> Vec<Section> {
    let table = load.table.table_name.clone();
    let mut sections = Vec::with_capacity(2);
    if load.table.layout == LayoutKind::DailyPrices.as_str() {
        sections.push(Section::Columns {
            table: table.clone(),
            columns: load.columns.clone(),
        });
    }
    sections.push(Section::Schema {
        table,
        tree: load.schema.tree_string(),
    });
    sections
}

pub(super) fn load_warnings(loads: &[LoadReport]) -> Vec<String> {
    loads
        .iter()
        .flat_map(|load| {
            load.parse
                .warnings
                .iter()
                .map(move |warning| format!("{}: {warning}", load.table.table_name))
        })
        .collect()
}
