use serde_json::{json, Value};
use tickjoin_warehouse::Warehouse;

use crate::error::CliError;
use crate::output::Section;

use super::CommandResult;

const COLUMNS: [&str; 5] = ["table_name", "layout", "row_count", "column_count", "loaded_at"];

pub fn run(warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let tables = warehouse.list_tables()?;

    let rows = tables
        .iter()
        .map(|table| {
            vec![
                Value::from(table.table_name.as_str()),
                Value::from(table.layout.as_str()),
                Value::from(table.row_count),
                Value::from(table.column_count),
                table.loaded_at.as_deref().map_or(Value::Null, Value::from),
            ]
        })
        .collect();

    let mut command_result = CommandResult::ok(json!({ "tables": &tables })).with_section(
        Section::Rows {
            title: String::from("Registered tables"),
            columns: COLUMNS.iter().map(|name| (*name).to_owned()).collect(),
            rows,
            truncated: false,
        },
    );
    if tables.is_empty() {
        command_result = command_result.with_warning("no datasets registered; use 'tickjoin load'");
    }
    Ok(command_result)
}
