use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::ChunkKey;

/// A single statistic cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Label(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(value) => Some(*value),
            FeatureValue::Label(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<usize> for FeatureValue {
    fn from(value: usize) -> Self {
        FeatureValue::Number(value as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Label(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Label(value)
    }
}

/// Ordered column name → value map produced by a reducer.
pub type FeatureColumns = IndexMap<String, FeatureValue>;

/// One aggregate row for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRow {
    pub key: ChunkKey,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub values: FeatureColumns,
}

impl FeatureRow {
    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.values.get(column)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(FeatureValue::as_number)
    }
}

/// Per-window results of one or more statistic families, in window order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTable {
    pub family: String,
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(family: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            family: family.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.rows.iter().map(|row| row.key)
    }

    /// Appends a derived column computed from each existing row.
    pub fn push_derived_column<F>(&mut self, column: impl Into<String>, derive: F)
    where
        F: Fn(&FeatureRow) -> FeatureValue,
    {
        let column = column.into();
        for row in &mut self.rows {
            let value = derive(row);
            row.values.insert(column.clone(), value);
        }
        if !self.has_column(&column) {
            self.columns.push(column);
        }
    }
}
