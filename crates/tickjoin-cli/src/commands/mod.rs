mod load;
mod run;
mod schema;
mod sql;
mod tables;

use std::time::Instant;

use log::{debug, warn};
use serde_json::Value;
use tickjoin_core::{Envelope, EnvelopeError, EnvelopeMeta};
use tickjoin_warehouse::Warehouse;

use crate::cli::{Cli, Command, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::metadata::{Metadata, SCHEMA_VERSION};
use crate::output::Section;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub sections: Vec<Section>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }
}

/// Result of one invocation: the envelope plus its human-readable sections.
pub struct Rendered {
    pub envelope: Envelope<Value>,
    pub sections: Vec<Section>,
    /// Set when the command failed and the failure is reported in the envelope.
    pub exit_code: Option<u8>,
}

/// Run the selected command.
///
/// In the JSON formats a failed command still produces an envelope, with the
/// failure in `errors` and null `data`. Table output returns the error.
pub fn run(cli: &Cli) -> Result<Rendered, CliError> {
    let started = Instant::now();
    match execute(cli) {
        Ok(command_result) => {
            let CommandResult {
                data,
                warnings,
                sections,
            } = command_result;
            let meta = envelope_meta(started, warnings)?;
            Ok(Rendered {
                envelope: Envelope::success(meta, data),
                sections,
                exit_code: None,
            })
        }
        Err(error) if cli.format != OutputFormat::Table => {
            warn!("command failed: {error}");
            let meta = envelope_meta(started, Vec::new())?;
            let errors = vec![EnvelopeError::new(error.code(), error.to_string())?];
            Ok(Rendered {
                envelope: Envelope::with_errors(meta, Value::Null, errors)?,
                sections: Vec::new(),
                exit_code: Some(error.exit_code()),
            })
        }
        Err(error) => Err(error),
    }
}

fn execute(cli: &Cli) -> Result<CommandResult, CliError> {
    let warehouse_config = config::warehouse_config(cli);
    debug!("opening warehouse at {:?}", warehouse_config.location);
    let warehouse = Warehouse::open(warehouse_config)?;

    match &cli.command {
        Command::Run(args) => run::run(args, &warehouse),
        Command::Load(args) => load::run(args, &warehouse),
        Command::Schema(args) => schema::run(args, &warehouse),
        Command::Tables => tables::run(&warehouse),
        Command::Sql(args) => sql::run(args, &warehouse),
    }
}

fn envelope_meta(started: Instant, warnings: Vec<String>) -> Result<EnvelopeMeta, CliError> {
    let latency_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
    let mut metadata = Metadata::new(latency_ms);
    for warning in warnings {
        metadata.push_warning(warning);
    }
    Ok(metadata.into_envelope_meta(SCHEMA_VERSION)?)
}
