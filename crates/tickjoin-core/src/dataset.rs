//! A parsed CSV file together with its inferred schema.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::layout::{LayoutKind, RecordLayout};
use crate::parse::{self, ParseOptions, ParseReport};
use crate::schema::{self, InferenceConfig, TableSchema};
use crate::value::Row;
use crate::{DatasetError, LayoutError};

#[derive(Debug, Clone)]
pub struct Dataset {
    layout: RecordLayout,
    schema: TableSchema,
    rows: Vec<Row>,
    report: ParseReport,
}

impl Dataset {
    /// Read `path` and parse it with the layout for `kind`.
    pub fn read_csv(
        path: &Path,
        kind: LayoutKind,
        options: ParseOptions,
        inference: &InferenceConfig,
    ) -> Result<Self, DatasetError> {
        let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let dataset = Self::from_text(&text, kind, options, inference)?;
        info!(
            "read {} {} rows from {}",
            dataset.row_count(),
            kind,
            path.display()
        );
        Ok(dataset)
    }

    pub fn from_text(
        text: &str,
        kind: LayoutKind,
        options: ParseOptions,
        inference: &InferenceConfig,
    ) -> Result<Self, DatasetError> {
        let layout = match kind {
            LayoutKind::Dividends => RecordLayout::dividends(),
            LayoutKind::DailyPrices => {
                let header = parse::read_header(text)?.ok_or(LayoutError::MissingHeader)?;
                RecordLayout::daily_prices(&header)?
            }
        };

        let (rows, mut report) = parse::parse_lines(text, &layout, options)?;
        let schema = if rows.is_empty() {
            warn!("{kind} has no data rows; using the declared column types");
            report
                .warnings
                .push(String::from("no data rows; schema taken from the column layout"));
            TableSchema::from_layout(&layout)
        } else {
            schema::infer_schema(&layout.column_names(), &rows, inference)?
        };

        Ok(Self {
            layout,
            schema,
            rows,
            report,
        })
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn kind(&self) -> LayoutKind {
        self.layout.kind()
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn report(&self) -> &ParseReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::schema::DataType;
    use crate::value::Value;

    const PRICES: &str = "exchange,stock_symbol,date,stock_price_open,stock_price_high,stock_price_low,stock_price_close,stock_volume,stock_price_adj_close
NYSE,AEA,2010-02-08,4.42,4.42,4.21,4.24,205500,4.24
NYSE,AEA,2010-02-05,4.42,4.54,4.22,4.41,194300,4.41
";

    #[test]
    fn daily_prices_use_header_names() {
        let dataset = Dataset::from_text(
            PRICES,
            LayoutKind::DailyPrices,
            ParseOptions::default(),
            &InferenceConfig::default(),
        )
        .expect("dataset");

        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.schema().len(), 9);
        let volume = dataset.schema().field("stock_volume").expect("volume column");
        assert_eq!(volume.data_type, DataType::Double);
        assert_eq!(dataset.rows()[1].get(7), Some(&Value::Double(194_300.0)));
    }

    #[test]
    fn empty_file_falls_back_to_declared_schema() {
        let dataset = Dataset::from_text(
            "exchange,stock_symbol,date,dividends\n",
            LayoutKind::Dividends,
            ParseOptions::default(),
            &InferenceConfig::default(),
        )
        .expect("dataset");

        assert_eq!(dataset.row_count(), 0);
        assert_eq!(dataset.schema(), &TableSchema::from_layout(&RecordLayout::dividends()));
        assert_eq!(dataset.report().warnings.len(), 1);
    }

    #[test]
    fn daily_prices_without_header_is_an_error() {
        let err = Dataset::from_text(
            "",
            LayoutKind::DailyPrices,
            ParseOptions::default(),
            &InferenceConfig::default(),
        )
        .expect_err("must fail");
        assert!(matches!(err, DatasetError::Layout(LayoutError::MissingHeader)));
    }

    #[test]
    fn header_with_case_insensitive_duplicate_is_rejected() {
        let err = Dataset::from_text(
            "exchange,stock_symbol,date,Close,close\nNYSE,AEA,2010-02-08,4.24,4.24\n",
            LayoutKind::DailyPrices,
            ParseOptions::default(),
            &InferenceConfig::default(),
        )
        .expect_err("must fail");
        assert!(matches!(
            err,
            DatasetError::Layout(LayoutError::DuplicateColumn { ref name }) if name == "close"
        ));
    }

    #[test]
    fn reads_csv_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"exchange,stock_symbol,date,dividends\nNYSE,AIT,2009-11-12,0.15\n")
            .expect("write");

        let dataset = Dataset::read_csv(
            file.path(),
            LayoutKind::Dividends,
            ParseOptions::default(),
            &InferenceConfig::default(),
        )
        .expect("dataset");
        assert_eq!(dataset.row_count(), 1);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = Dataset::read_csv(
            Path::new("/definitely/not/here.csv"),
            LayoutKind::Dividends,
            ParseOptions::default(),
            &InferenceConfig::default(),
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
