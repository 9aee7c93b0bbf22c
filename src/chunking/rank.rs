use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, ChunkResult};
use crate::models::{duration_to_secs, ClipStamp, FeatureRow, FeatureValue, ResultTable};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// What to rank by and how many windows to keep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankSpec {
    /// Sort columns, most significant first. Later columns only break ties.
    pub columns: Vec<String>,
    pub limit: Option<usize>,
}

impl RankSpec {
    pub fn by(column: impl Into<String>) -> Self {
        Self {
            columns: vec![column.into()],
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Sorts `result` best-first on `spec.columns`, truncates to `spec.limit`
/// and returns the survivors as seconds elapsed since the first event.
///
/// The sort is stable: ties left after every column keep window order.
/// NaN and missing values sort after every number.
pub fn rank(result: &mut ResultTable, spec: &RankSpec) -> ChunkResult<Vec<ClipStamp>> {
    if spec.columns.is_empty() {
        return Err(ChunkError::InvalidStatisticSelector {
            requested: String::new(),
            available: result.table.columns.clone(),
        });
    }
    for column in &spec.columns {
        validate_column(result, column)?;
    }

    log_info!(
        "ranking {} windows of {} by [{}], limit {:?}",
        result.table.len(),
        result.stream_id,
        spec.columns.join(", "),
        spec.limit
    );

    let columns = &spec.columns;
    result
        .table
        .rows
        .sort_by(|a, b| compare_rows(a, b, columns));

    if let Some(limit) = spec.limit {
        result.table.rows.truncate(limit);
    }

    let first_stamp = result.first_stamp;
    Ok(result
        .table
        .rows
        .iter()
        .map(|row| ClipStamp {
            key: row.key,
            start_time: duration_to_secs(row.start - first_stamp),
            end_time: duration_to_secs(row.end - first_stamp),
        })
        .collect())
}

fn validate_column(result: &ResultTable, column: &str) -> ChunkResult<()> {
    if !result.table.has_column(column) {
        return Err(ChunkError::InvalidStatisticSelector {
            requested: column.to_string(),
            available: result.table.columns.clone(),
        });
    }
    let labelled = result
        .table
        .rows
        .iter()
        .any(|row| matches!(row.get(column), Some(FeatureValue::Label(_))));
    if labelled {
        return Err(ChunkError::NonNumericColumn {
            column: column.to_string(),
        });
    }
    Ok(())
}

fn compare_rows(a: &FeatureRow, b: &FeatureRow, columns: &[String]) -> Ordering {
    columns
        .iter()
        .map(|column| descending(a.number(column), b.number(column)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.filter(|v| !v.is_nan());
    let b = b.filter(|v| !v.is_nan());
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
