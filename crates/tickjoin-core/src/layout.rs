//! Record shapes for the two supported CSV datasets.
//!
//! A [`RecordLayout`] fixes the column names and which positional fields are
//! cast to floating point. Dividend files use a fixed layout; daily price
//! files take their column names from the header line.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{LayoutError, ValidationError};

/// Number of leading text columns (`exchange`, `stock_symbol`, `date`)
/// shared by both dataset shapes.
pub const KEY_TEXT_COLUMNS: usize = 3;

const DIVIDEND_COLUMNS: [(&str, ColumnKind); 4] = [
    ("exchange", ColumnKind::Text),
    ("stock_symbol", ColumnKind::Text),
    ("date", ColumnKind::Text),
    ("dividends", ColumnKind::Double),
];

/// Which dataset a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Dividends,
    DailyPrices,
}

impl LayoutKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dividends => "dividends",
            Self::DailyPrices => "daily_prices",
        }
    }

    /// Table name the exploratory session registers this dataset under.
    pub const fn default_table(self) -> &'static str {
        self.as_str()
    }
}

impl Display for LayoutKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dividends" => Ok(Self::Dividends),
            "daily-prices" | "daily_prices" => Ok(Self::DailyPrices),
            other => Err(ValidationError::InvalidLayoutKind {
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Double,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Column names and positional casts for one record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    kind: LayoutKind,
    columns: Vec<ColumnSpec>,
}

impl RecordLayout {
    pub fn dividends() -> Self {
        Self {
            kind: LayoutKind::Dividends,
            columns: DIVIDEND_COLUMNS
                .iter()
                .map(|(name, kind)| ColumnSpec::new(*name, *kind))
                .collect(),
        }
    }

    pub fn daily_prices<S: AsRef<str>>(header: &[S]) -> Result<Self, LayoutError> {
        Self::from_header(LayoutKind::DailyPrices, header, KEY_TEXT_COLUMNS)
    }

    /// Build a layout from header fields: the first `text_columns` names are
    /// text, every later column is cast to double.
    ///
    /// Names are unique ignoring ASCII case, as SQL identifiers are.
    pub fn from_header<S: AsRef<str>>(
        kind: LayoutKind,
        header: &[S],
        text_columns: usize,
    ) -> Result<Self, LayoutError> {
        let names: Vec<&str> = header.iter().map(|name| name.as_ref().trim()).collect();
        if names.iter().all(|name| name.is_empty()) {
            return Err(LayoutError::MissingHeader);
        }

        if names.len() <= text_columns {
            return Err(LayoutError::NoNumericColumns {
                found: names.len(),
                text_columns,
            });
        }

        let mut seen = HashSet::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for (index, name) in names.into_iter().enumerate() {
            if name.is_empty() {
                return Err(LayoutError::EmptyColumnName { index });
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(LayoutError::DuplicateColumn {
                    name: name.to_owned(),
                });
            }

            let kind = if index < text_columns {
                ColumnKind::Text
            } else {
                ColumnKind::Double
            };
            columns.push(ColumnSpec::new(name, kind));
        }

        Ok(Self { kind, columns })
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Name used to recognise header lines inside the data.
    pub fn header_marker(&self) -> &str {
        self.columns
            .first()
            .map(|column| column.name.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICES_HEADER: [&str; 9] = [
        "exchange",
        "stock_symbol",
        "date",
        "stock_price_open",
        "stock_price_high",
        "stock_price_low",
        "stock_price_close",
        "stock_volume",
        "stock_price_adj_close",
    ];

    #[test]
    fn dividend_layout_casts_only_the_last_column() {
        let layout = RecordLayout::dividends();
        let kinds: Vec<ColumnKind> = layout.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Text,
                ColumnKind::Text,
                ColumnKind::Text,
                ColumnKind::Double
            ]
        );
        assert_eq!(layout.header_marker(), "exchange");
    }

    #[test]
    fn daily_price_layout_takes_names_from_header() {
        let layout = RecordLayout::daily_prices(&PRICES_HEADER).expect("layout");
        assert_eq!(layout.width(), 9);
        assert_eq!(layout.columns()[2].name, "date");
        assert_eq!(layout.columns()[2].kind, ColumnKind::Text);
        assert_eq!(layout.columns()[8].name, "stock_price_adj_close");
        assert_eq!(layout.columns()[8].kind, ColumnKind::Double);
    }

    #[test]
    fn header_names_are_trimmed() {
        let layout = RecordLayout::daily_prices(&["exchange", " stock_symbol ", "date", "close"])
            .expect("layout");
        assert_eq!(
            layout.column_names(),
            vec!["exchange", "stock_symbol", "date", "close"]
        );
    }

    #[test]
    fn rejects_header_without_numeric_columns() {
        let err = RecordLayout::daily_prices(&["exchange", "stock_symbol", "date"]).expect_err("must fail");
        assert!(matches!(err, LayoutError::NoNumericColumns { found: 3, .. }));
    }

    #[test]
    fn rejects_duplicate_and_empty_names() {
        let err = RecordLayout::daily_prices(&["exchange", "stock_symbol", "date", "close", "close"])
            .expect_err("must fail");
        assert!(matches!(err, LayoutError::DuplicateColumn { .. }));

        let err = RecordLayout::daily_prices(&["exchange", "", "date", "close"])
            .expect_err("must fail");
        assert_eq!(err, LayoutError::EmptyColumnName { index: 1 });

        let err = RecordLayout::daily_prices(&["", " "]).expect_err("must fail");
        assert_eq!(err, LayoutError::MissingHeader);
    }

    #[test]
    fn duplicate_names_differing_only_in_case_are_rejected() {
        let err = RecordLayout::daily_prices(&["exchange", "stock_symbol", "date", "Close", "close"])
            .expect_err("must fail");
        assert_eq!(
            err,
            LayoutError::DuplicateColumn {
                name: String::from("close")
            }
        );
    }

    #[test]
    fn parses_layout_kind_aliases() {
        assert_eq!("daily-prices".parse::<LayoutKind>(), Ok(LayoutKind::DailyPrices));
        assert_eq!("DIVIDENDS".parse::<LayoutKind>(), Ok(LayoutKind::Dividends));
        assert!("splits".parse::<LayoutKind>().is_err());
    }
}
