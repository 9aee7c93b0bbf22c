use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::chunking::indexer::Chunking;
use crate::error::{ChunkError, ChunkResult};
use crate::models::{ChunkKey, FeatureColumns, FeatureRow, FeatureTable, Window};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Inner-joins per-family tables on the canonical `ChunkKey`.
pub struct FeatureMerger {
    /// Canonical windows in chunking order.
    canonical: Vec<(ChunkKey, DateTime<Utc>, DateTime<Utc>)>,
    known: HashSet<ChunkKey>,
}

/// Where a source column lands in the merged table.
struct ColumnPlan {
    source: String,
    /// `None` when the column duplicates an identical earlier one.
    target: Option<String>,
}

impl FeatureMerger {
    pub fn new(chunking: &Chunking) -> Self {
        Self::from_windows(chunking.windows())
    }

    pub fn from_windows(windows: &[Window]) -> Self {
        Self {
            canonical: windows.iter().map(|w| (w.key, w.start, w.end)).collect(),
            known: windows.iter().map(|w| w.key).collect(),
        }
    }

    /// One row per window present in every table, one column per distinct
    /// feature. Start/end come from the canonical window, never from a
    /// family's own rows.
    ///
    /// A column name seen twice is kept once when both tables agree on every
    /// joined row, otherwise the later one is suffixed with its family name.
    /// An empty result is a valid outcome, not an error.
    pub fn merge(&self, tables: &[FeatureTable]) -> ChunkResult<FeatureTable> {
        if tables.is_empty() {
            return Err(ChunkError::NothingToMerge);
        }

        // Step 1: every row must map onto exactly one canonical window
        let mut indexed: Vec<HashMap<ChunkKey, &FeatureRow>> = Vec::with_capacity(tables.len());
        for table in tables {
            indexed.push(self.index_table(table)?);
        }

        // Step 2: inner join, preserving canonical window order
        let joined: Vec<_> = self
            .canonical
            .iter()
            .filter(|(key, _, _)| indexed.iter().all(|rows| rows.contains_key(key)))
            .collect();

        // Step 3: resolve column collisions
        let mut columns: Vec<String> = Vec::new();
        let mut owners: HashMap<String, (usize, String)> = HashMap::new();
        let mut plans: Vec<Vec<ColumnPlan>> = Vec::with_capacity(tables.len());
        for (index, table) in tables.iter().enumerate() {
            let mut plan = Vec::with_capacity(table.columns.len());
            for column in &table.columns {
                let target = match owners.get(column) {
                    None => Some(column.clone()),
                    Some((owner, owner_column)) => {
                        let agrees = joined.iter().all(|(key, _, _)| {
                            indexed[index][key].get(column)
                                == indexed[*owner][key].get(owner_column)
                        });
                        if agrees {
                            None
                        } else {
                            Some(unique_name(&columns, column, &table.family))
                        }
                    }
                };
                if let Some(target) = &target {
                    columns.push(target.clone());
                    owners.insert(target.clone(), (index, column.clone()));
                }
                plan.push(ColumnPlan {
                    source: column.clone(),
                    target,
                });
            }
            plans.push(plan);
        }

        // Step 4: build merged rows
        let rows: Vec<FeatureRow> = joined
            .iter()
            .map(|(key, start, end)| {
                let mut values = FeatureColumns::with_capacity(columns.len());
                for (index, plan) in plans.iter().enumerate() {
                    let row = indexed[index][key];
                    for entry in plan {
                        if let (Some(target), Some(value)) = (&entry.target, row.get(&entry.source)) {
                            values.insert(target.clone(), value.clone());
                        }
                    }
                }
                FeatureRow {
                    key: *key,
                    start: *start,
                    end: *end,
                    values,
                }
            })
            .collect();

        let mut families: Vec<&str> = Vec::new();
        for table in tables {
            if !families.contains(&table.family.as_str()) {
                families.push(&table.family);
            }
        }
        let family = families.join("+");

        if rows.is_empty() {
            log_warn!("merge of {family} produced zero rows");
        } else {
            log_info!("merged {family}: {} rows, {} columns", rows.len(), columns.len());
        }

        Ok(FeatureTable {
            family,
            columns,
            rows,
        })
    }

    fn index_table<'t>(&self, table: &'t FeatureTable) -> ChunkResult<HashMap<ChunkKey, &'t FeatureRow>> {
        let mut rows = HashMap::with_capacity(table.rows.len());
        for row in &table.rows {
            if !self.known.contains(&row.key) {
                return Err(ChunkError::MissingJoinKey {
                    family: table.family.clone(),
                    key: row.key,
                });
            }
            if rows.insert(row.key, row).is_some() {
                return Err(ChunkError::DuplicateJoinKey {
                    family: table.family.clone(),
                    key: row.key,
                });
            }
        }
        Ok(rows)
    }
}

fn unique_name(taken: &[String], column: &str, family: &str) -> String {
    let base = format!("{column}_{family}");
    if !taken.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}
