use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chunking::{AggregateOutcome, Chunking};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMetrics {
    pub family: String,
    pub rows: usize,
    pub filtered_windows: usize,
    pub skipped_windows: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub started_at: Option<DateTime<Utc>>,
    pub events: usize,
    pub coarse_partitions: usize,
    pub windows: usize,
    pub degenerate_windows: usize,
    pub merged_rows: usize,
    pub families: Vec<FamilyMetrics>,
}

impl MetricsSnapshot {
    pub fn record_chunking(&mut self, chunking: &Chunking) {
        self.started_at.get_or_insert_with(Utc::now);
        self.events = chunking.stream().len();
        self.coarse_partitions = chunking.coarse_partitions().len();
        self.windows = chunking.windows().len();
        self.degenerate_windows = chunking
            .windows()
            .iter()
            .filter(|window| window.is_degenerate())
            .count();
    }

    pub fn record_family(&mut self, outcome: &AggregateOutcome, elapsed_ms: u64) {
        self.families.push(FamilyMetrics {
            family: outcome.table.family.clone(),
            rows: outcome.table.len(),
            filtered_windows: outcome.filtered.len(),
            skipped_windows: outcome.skipped.len(),
            elapsed_ms,
        });
    }

    pub fn record_merge(&mut self, rows: usize) {
        self.merged_rows = rows;
    }

    /// Skipped windows summed over every family.
    pub fn skipped_windows(&self) -> usize {
        self.families.iter().map(|f| f.skipped_windows).sum()
    }
}
