//! Line-oriented CSV parsing.
//!
//! Lines are read as comma-separated records with no quoting rules, header
//! lines are dropped, and double columns are cast positionally according to
//! the layout.

use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use serde::Serialize;

use crate::layout::{ColumnKind, RecordLayout};
use crate::value::{Row, Value};
use crate::ParseError;

/// What to do with a line that cannot be cast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedRowPolicy {
    /// Abort on the first malformed line.
    #[default]
    Fail,
    /// Drop the line and keep going.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub malformed_rows: MalformedRowPolicy,
    /// Treat an empty numeric field as null instead of a malformed line.
    pub empty_numeric_as_null: bool,
}

impl ParseOptions {
    pub fn skipping_malformed(mut self) -> Self {
        self.malformed_rows = MalformedRowPolicy::Skip;
        self
    }
}

/// Counters collected during one parsing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub rows_parsed: usize,
    pub header_lines_skipped: usize,
    pub blank_lines_skipped: usize,
    pub malformed_rows_skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Parse every data line of `text` into rows shaped by `layout`.
pub fn parse_lines(
    text: &str,
    layout: &RecordLayout,
    options: ParseOptions,
) -> Result<(Vec<Row>, ParseReport), ParseError> {
    let mut rows = Vec::new();
    let mut report = ParseReport::default();
    let mut rows_with_extra_fields = 0_usize;
    let mut records_read = 0_usize;
    let marker = layout.header_marker();

    let mut reader = record_reader(text);
    for result in reader.records() {
        let record = result.map_err(record_error)?;
        records_read += 1;
        if is_blank(&record) {
            report.blank_lines_skipped += 1;
            continue;
        }

        if record.get(0).map(str::trim) == Some(marker) {
            report.header_lines_skipped += 1;
            continue;
        }

        match parse_record(&record, layout, options) {
            Ok(row) => {
                if record.len() > layout.width() {
                    rows_with_extra_fields += 1;
                }
                rows.push(row);
                report.rows_parsed += 1;
            }
            Err(error) if options.malformed_rows == MalformedRowPolicy::Skip => {
                warn!("skipping malformed row: {error}");
                report.malformed_rows_skipped += 1;
            }
            Err(error) => return Err(error),
        }
    }
    // The reader drops empty lines without yielding a record.
    report.blank_lines_skipped += text.lines().count().saturating_sub(records_read);

    if rows_with_extra_fields > 0 {
        report.warnings.push(format!(
            "{rows_with_extra_fields} line(s) had more than {} fields; extra fields were ignored",
            layout.width()
        ));
    }
    if report.malformed_rows_skipped > 0 {
        report.warnings.push(format!(
            "{} malformed line(s) skipped",
            report.malformed_rows_skipped
        ));
    }

    debug!(
        "parsed {} rows ({} header, {} blank, {} malformed skipped)",
        report.rows_parsed,
        report.header_lines_skipped,
        report.blank_lines_skipped,
        report.malformed_rows_skipped
    );
    Ok((rows, report))
}

/// Fields of the first non-blank line.
pub fn read_header(text: &str) -> Result<Option<Vec<String>>, ParseError> {
    let mut reader = record_reader(text);
    for result in reader.records() {
        let record = result.map_err(record_error)?;
        if !is_blank(&record) {
            return Ok(Some(record.iter().map(str::to_owned).collect()));
        }
    }
    Ok(None)
}

/// Plain comma splitting: no quote handling, ragged lines allowed.
fn record_reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn record_error(error: csv::Error) -> ParseError {
    ParseError::Record {
        line: error.position().map_or(0, |position| position.line() as usize),
        message: error.to_string(),
    }
}

fn record_line(record: &StringRecord) -> usize {
    record
        .position()
        .map_or(0, |position| position.line() as usize)
}

fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(|field| field.trim().is_empty())
}

fn parse_record(
    record: &StringRecord,
    layout: &RecordLayout,
    options: ParseOptions,
) -> Result<Row, ParseError> {
    let line = record_line(record);
    if record.len() < layout.width() {
        return Err(ParseError::MissingFields {
            line,
            expected: layout.width(),
            found: record.len(),
        });
    }

    let mut values = Vec::with_capacity(layout.width());
    for (column, field) in layout.columns().iter().zip(record.iter()) {
        let value = match column.kind {
            ColumnKind::Text => Value::Text(field.to_owned()),
            ColumnKind::Double => {
                let trimmed = field.trim();
                if trimmed.is_empty() && options.empty_numeric_as_null {
                    Value::Null
                } else {
                    let parsed = trimmed.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                        line,
                        column: column.name.clone(),
                        value: field.to_owned(),
                    })?;
                    Value::Double(parsed)
                }
            }
        };
        values.push(value);
    }

    Ok(Row::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIVIDENDS: &str = "exchange,stock_symbol,date,dividends\n\
NYSE,AIT,2009-11-12,0.15\n\
NYSE,AIT,2009-08-12,0.15\n\
NYSE,ALG,2009-10-26,0.06\n";

    #[test]
    fn row_count_is_line_count_minus_header() {
        let (rows, report) =
            parse_lines(DIVIDENDS, &RecordLayout::dividends(), ParseOptions::default())
                .expect("parse");
        assert_eq!(rows.len(), 3);
        assert_eq!(report.header_lines_skipped, 1);
        assert_eq!(report.blank_lines_skipped, 0);
        assert_eq!(rows[2].get(1), Some(&Value::Text(String::from("ALG"))));
        assert_eq!(rows[2].get(3), Some(&Value::Double(0.06)));
    }

    #[test]
    fn repeated_header_lines_are_dropped() {
        let text = format!("{DIVIDENDS}{DIVIDENDS}");
        let (rows, report) =
            parse_lines(&text, &RecordLayout::dividends(), ParseOptions::default())
                .expect("parse");
        assert_eq!(rows.len(), 6);
        assert_eq!(report.header_lines_skipped, 2);
    }

    #[test]
    fn crlf_and_blank_lines_are_tolerated() {
        let text = "exchange,stock_symbol,date,dividends\r\nNYSE,AIT,2009-11-12, 0.15 \r\n\r\n";
        let (rows, report) =
            parse_lines(text, &RecordLayout::dividends(), ParseOptions::default())
                .expect("parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(3), Some(&Value::Double(0.15)));
        assert_eq!(report.blank_lines_skipped, 1);
    }

    #[test]
    fn bad_number_reports_line_and_column() {
        let text = "exchange,stock_symbol,date,dividends\nNYSE,AIT,2009-11-12,abc\n";
        let err = parse_lines(text, &RecordLayout::dividends(), ParseOptions::default())
            .expect_err("must fail");
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                line: 2,
                column: String::from("dividends"),
                value: String::from("abc"),
            }
        );
    }

    #[test]
    fn short_line_is_malformed() {
        let text = "NYSE,AIT\n";
        let err = parse_lines(text, &RecordLayout::dividends(), ParseOptions::default())
            .expect_err("must fail");
        assert!(matches!(err, ParseError::MissingFields { line: 1, expected: 4, found: 2 }));
    }

    #[test]
    fn skip_policy_drops_malformed_lines() {
        let text = "NYSE,AIT,2009-11-12,0.15\nNYSE,AIT,2009-08-12,\nNYSE,ALG\n";
        let options = ParseOptions::default().skipping_malformed();
        let (rows, report) =
            parse_lines(text, &RecordLayout::dividends(), options).expect("parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(report.malformed_rows_skipped, 2);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn empty_numeric_can_become_null() {
        let text = "NYSE,AIT,2009-08-12,\n";
        let options = ParseOptions {
            empty_numeric_as_null: true,
            ..ParseOptions::default()
        };
        let (rows, _) = parse_lines(text, &RecordLayout::dividends(), options).expect("parse");
        assert_eq!(rows[0].get(3), Some(&Value::Null));
    }

    #[test]
    fn extra_fields_are_ignored_with_warning() {
        let text = "NYSE,AIT,2009-11-12,0.15,unexpected\n";
        let (rows, report) =
            parse_lines(text, &RecordLayout::dividends(), ParseOptions::default())
                .expect("parse");
        assert_eq!(rows[0].len(), 4);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn extra_fields_on_rejected_lines_are_not_reported() {
        let text = "NYSE,AIT,2009-11-12,abc,unexpected\nNYSE,AIT,2009-08-12,0.15\n";
        let options = ParseOptions::default().skipping_malformed();
        let (rows, report) =
            parse_lines(text, &RecordLayout::dividends(), options).expect("parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(report.malformed_rows_skipped, 1);
        assert_eq!(report.warnings, vec!["1 malformed line(s) skipped"]);
    }

    #[test]
    fn quotes_are_ordinary_characters() {
        let text = "NYSE,\"AIT,2009-11-12,0.15\n";
        let (rows, _) = parse_lines(text, &RecordLayout::dividends(), ParseOptions::default())
            .expect("parse");
        assert_eq!(rows[0].get(1), Some(&Value::Text(String::from("\"AIT"))));
    }

    #[test]
    fn line_numbers_count_skipped_blank_lines() {
        let text = "exchange,stock_symbol,date,dividends\n\n\nNYSE,AIT,2009-11-12,x\n";
        let err = parse_lines(text, &RecordLayout::dividends(), ParseOptions::default())
            .expect_err("must fail");
        assert_eq!(err.line(), 4);
    }

    #[test]
    fn header_skips_leading_blank_lines() {
        assert_eq!(
            read_header("\n \r\na,b\r\nc,d").expect("header"),
            Some(vec![String::from("a"), String::from("b")])
        );
        assert_eq!(read_header("").expect("header"), None);
    }
}
