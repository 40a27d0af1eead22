//! Core contracts for tickjoin.
//!
//! This crate contains:
//! - Record layouts for the dividend and daily price CSV shapes
//! - Line parsing with positional numeric casts
//! - Schema inference and schema tree rendering
//! - Response envelope and structured errors

pub mod dataset;
pub mod envelope;
pub mod error;
pub mod layout;
pub mod parse;
pub mod schema;
pub mod timestamp;
pub mod value;

pub use dataset::Dataset;
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{DatasetError, LayoutError, ParseError, SchemaError, ValidationError};
pub use layout::{ColumnKind, ColumnSpec, LayoutKind, RecordLayout, KEY_TEXT_COLUMNS};
pub use parse::{MalformedRowPolicy, ParseOptions, ParseReport};
pub use schema::{DataType, InferenceConfig, SchemaField, TableSchema};
pub use timestamp::UtcDateTime;
pub use value::{Row, Value};
