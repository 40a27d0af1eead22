use serde_json::json;
use tickjoin_warehouse::Warehouse;

use crate::cli::SchemaArgs;
use crate::error::CliError;
use crate::output::Section;

use super::CommandResult;

pub fn run(args: &SchemaArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let schema = warehouse.describe_table(&args.table)?;
    let table = args.table.trim().to_ascii_lowercase();

    let data = json!({
        "table": &table,
        "fields": &schema.fields,
    });
    Ok(CommandResult::ok(data).with_section(Section::Schema {
        table,
        tree: schema.tree_string(),
    }))
}
