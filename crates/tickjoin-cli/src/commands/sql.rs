use tickjoin_warehouse::{QueryGuardrails, Warehouse};

use crate::cli::SqlArgs;
use crate::config;
use crate::error::CliError;
use crate::output::{format_sql_value, Section};

use super::CommandResult;

pub fn run(args: &SqlArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let guardrails = config::guardrails(&args.guardrails);
    let result = warehouse.execute_query(query, guardrails, args.write)?;

    let section = Section::rows("Result", &result);
    let mut command_result = CommandResult::ok(serde_json::to_value(&result)?).with_section(section);

    if result.truncated {
        command_result = command_result.with_warning(format!(
            "result truncated at {} rows (use --max-rows to increase limit)",
            result.row_count
        ));
    }

    if args.explain {
        command_result = command_result.with_warnings(explain_lines(warehouse, query, guardrails));
    }

    Ok(command_result)
}

fn explain_lines(warehouse: &Warehouse, query: &str, guardrails: QueryGuardrails) -> Vec<String> {
    let explain_sql = format!("EXPLAIN {}", query.trim_end_matches(';'));
    let explain_guardrails = QueryGuardrails {
        max_rows: guardrails.max_rows.clamp(1, 256),
        ..guardrails
    };

    match warehouse.execute_query(explain_sql.as_str(), explain_guardrails, false) {
        Ok(explain_result) => {
            let mut lines = explain_result
                .rows
                .iter()
                .map(|row| {
                    let line = row
                        .iter()
                        .map(format_sql_value)
                        .collect::<Vec<_>>()
                        .join(" | ");
                    format!("explain: {line}")
                })
                .collect::<Vec<_>>();

            if lines.is_empty() {
                lines.push(String::from("explain: planner returned no diagnostics"));
            }
            if explain_result.truncated {
                lines.push(String::from(
                    "explain: diagnostics truncated by --max-rows (increase limit to view full plan)",
                ));
            }
            lines
        }
        Err(error) => vec![format!("explain: failed to build query plan: {error}")],
    }
}
