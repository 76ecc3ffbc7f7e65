//! Watchlist rows and the local watchlist store

mod store;

pub use store::{ChangeListener, WatchlistStore};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Longest ticker kept after normalization
pub const MAX_TICKER_LEN: usize = 12;

/// One tracked instrument
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistRow {
    pub ticker: String,
    #[serde(default, deserialize_with = "deserialize_flexible_text")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_flexible_text")]
    pub sector: String,
    #[serde(default, deserialize_with = "deserialize_flexible_text")]
    pub catalyst: String,
}

/// Optional text field written by any client: numbers and booleans keep
/// their text form, null and anything else become empty
fn deserialize_flexible_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleText {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
        Other(serde_json::Value),
    }

    Ok(match FlexibleText::deserialize(deserializer)? {
        FlexibleText::Str(s) => s,
        FlexibleText::Int(i) => i.to_string(),
        FlexibleText::Float(f) => f.to_string(),
        FlexibleText::Bool(b) => b.to_string(),
        FlexibleText::Other(_) => String::new(),
    })
}

impl WatchlistRow {
    /// Row with only a ticker set
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = sector.into();
        self
    }

    pub fn with_catalyst(mut self, catalyst: impl Into<String>) -> Self {
        self.catalyst = catalyst.into();
        self
    }

    /// Mutable access to an editable field
    fn field_mut(&mut self, field: RowField) -> &mut String {
        match field {
            RowField::Name => &mut self.name,
            RowField::Sector => &mut self.sector,
            RowField::Catalyst => &mut self.catalyst,
        }
    }
}

/// Editable row fields. The ticker is the row identity and is not editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowField {
    Name,
    Sector,
    Catalyst,
}

impl std::str::FromStr for RowField {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(RowField::Name),
            "sector" => Ok(RowField::Sector),
            "catalyst" => Ok(RowField::Catalyst),
            other => Err(crate::error::AppError::Validation(format!(
                "Unknown watchlist field: {}",
                other
            ))),
        }
    }
}

/// Uppercase, keep `[A-Z0-9.^=-]`, cap at [`MAX_TICKER_LEN`].
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '^' | '=' | '-'))
        .take(MAX_TICKER_LEN)
        .collect()
}

/// Drop rows whose ticker was already seen, keeping the first occurrence.
pub fn dedupe_rows(rows: Vec<WatchlistRow>) -> Vec<WatchlistRow> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(row.ticker.clone()))
        .collect()
}
