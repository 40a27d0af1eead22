use std::io::{self, Write};

use serde::Serialize;
use serde_json::{json, Value};
use tickjoin_core::Envelope;
use tickjoin_warehouse::QueryResult;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// A human-readable block of command output.
///
/// Table output prints sections in order; NDJSON emits one line per section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum Section {
    Schema {
        table: String,
        tree: String,
    },
    Columns {
        table: String,
        columns: Vec<String>,
    },
    Rows {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
        truncated: bool,
    },
}

impl Section {
    pub fn rows(title: impl Into<String>, result: &QueryResult) -> Self {
        Self::Rows {
            title: title.into(),
            columns: result.columns.iter().map(|column| column.name.clone()).collect(),
            rows: result.rows.clone(),
            truncated: result.truncated,
        }
    }
}

pub fn render(
    envelope: &Envelope<Value>,
    sections: &[Section],
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Ndjson => {
            writeln!(out, "{}", serde_json::to_string(&json!({ "meta": &envelope.meta }))?)?;
            for section in sections {
                writeln!(out, "{}", serde_json::to_string(section)?)?;
            }
            for error in &envelope.errors {
                writeln!(out, "{}", serde_json::to_string(&json!({ "error": error }))?)?;
            }
        }
        OutputFormat::Table => {
            render_table(&mut out, sections)?;
            for warning in &envelope.meta.warnings {
                eprintln!("warning: {warning}");
            }
        }
    }

    Ok(())
}

fn render_table(out: &mut impl Write, sections: &[Section]) -> Result<(), CliError> {
    for (index, section) in sections.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }

        match section {
            Section::Schema { table, tree } => {
                writeln!(out, "{table}:")?;
                write!(out, "{tree}")?;
            }
            Section::Columns { table, columns } => {
                writeln!(out, "{table} columns: {}", columns.join(", "))?;
            }
            Section::Rows {
                title,
                columns,
                rows,
                truncated,
            } => {
                writeln!(out, "{title}:")?;
                for row in rows {
                    writeln!(out, "{}", format_row(columns, row))?;
                }
                if *truncated {
                    writeln!(out, "... ({} rows shown)", rows.len())?;
                }
            }
        }
    }
    Ok(())
}

/// `Row(name='text', number=1.5, missing=None)`
pub fn format_row(columns: &[String], values: &[Value]) -> String {
    let fields = columns
        .iter()
        .zip(values)
        .map(|(name, value)| format!("{name}={}", format_value(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Row({fields})")
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::from("None"),
        Value::String(text) => format!("'{}'", text.replace('\'', "\\'")),
        Value::Bool(true) => String::from("True"),
        Value::Bool(false) => String::from("False"),
        _ => value.to_string(),
    }
}

/// Plain rendering of a value, used for EXPLAIN plan lines.
pub fn format_sql_value(value: &Value) -> String {
    match value {
        Value::Null => String::from("null"),
        Value::String(text) => text.clone(),
        _ => value.to_string(),
    }
}
