use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunking::{aggregate, rank, AggregateOutcome, Chunking, EventStream, FeatureMerger, RankSpec};
use crate::consensus::consensus;
use crate::error::{ChunkError, ChunkResult};
use crate::features::{build_reducer, FamilyKind, SentimentScorer};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::models::{ChatEvent, ChunkKey, ClipStamp, FeatureTable, ResultTable};
use crate::settings::PipelineSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// What one run computes and how it ranks the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineRequest {
    /// Families to compute. Empty means "whatever `rank_by` needs".
    pub families: Vec<FamilyKind>,
    pub rank_by: Vec<String>,
    pub limit: Option<usize>,
    /// Rank each `rank_by` column on its own and keep windows that at least
    /// this many of those rankings agree on.
    pub consensus: Option<usize>,
}

impl PipelineRequest {
    pub fn rank_by(column: impl Into<String>) -> Self {
        Self {
            rank_by: vec![column.into()],
            ..Self::default()
        }
    }

    pub fn with_families(mut self, families: Vec<FamilyKind>) -> Self {
        self.families = families;
        self
    }

    /// Families to run, in a stable order and without repeats.
    ///
    /// A request must name at least one column to rank by; without one the
    /// output would not be best-first.
    pub fn resolve_families(&self) -> ChunkResult<Vec<FamilyKind>> {
        if self.rank_by.is_empty() {
            return Err(ChunkError::InvalidStatisticSelector {
                requested: String::new(),
                available: all_columns(),
            });
        }

        let mut families: Vec<FamilyKind> = Vec::new();
        if self.families.is_empty() {
            for column in &self.rank_by {
                let kind = FamilyKind::owning(column).ok_or_else(|| ChunkError::InvalidStatisticSelector {
                    requested: column.clone(),
                    available: all_columns(),
                })?;
                families.push(kind);
            }
        } else {
            families.extend(self.families.iter().copied());
        }

        let mut seen = Vec::with_capacity(families.len());
        families.retain(|kind| {
            let fresh = !seen.contains(kind);
            seen.push(*kind);
            fresh
        });
        Ok(families)
    }
}

fn all_columns() -> Vec<String> {
    FamilyKind::ALL
        .iter()
        .flat_map(|kind| kind.columns().iter().map(|c| c.to_string()))
        .collect()
}

/// A window one family could not reduce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedWindowReport {
    pub family: String,
    pub key: ChunkKey,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub stream_id: String,
    pub run_id: Uuid,
    pub clips: Vec<ClipStamp>,
    pub skipped_windows: Vec<SkippedWindowReport>,
    pub metrics: MetricsSnapshot,
    /// Merged and ranked table, for callers that want more than timestamps
    #[serde(skip)]
    pub result: ResultTable,
}

/// Runs every family one after another on the calling thread.
pub fn run_pipeline(
    stream_id: &str,
    events: Vec<ChatEvent>,
    request: &PipelineRequest,
    settings: &PipelineSettings,
    scorer: Arc<dyn SentimentScorer>,
) -> ChunkResult<PipelineReport> {
    let families = request.resolve_families()?;
    let stream = Arc::new(EventStream::new(stream_id, events)?);
    let chunking = Chunking::build(stream, &settings.chunking)?;

    let mut metrics = MetricsSnapshot::default();
    metrics.record_chunking(&chunking);

    let mut outcomes = Vec::with_capacity(families.len());
    for kind in families {
        let started = Instant::now();
        let reducer = build_reducer(kind, chunking.stream(), &settings.features, &scorer);
        let outcome = aggregate(&chunking, reducer.as_ref());
        metrics.record_family(&outcome, elapsed_ms(started));
        outcomes.push(outcome);
    }

    let (merged, skipped_windows) = merge_outcomes(&chunking, outcomes)?;
    metrics.record_merge(merged.len());
    finish(&chunking, merged, skipped_windows, request, metrics)
}

/// Runs each family on the blocking pool over one shared chunking. Results
/// meet only at the merge, in request order.
pub async fn run_pipeline_concurrent(
    stream_id: &str,
    events: Vec<ChatEvent>,
    request: &PipelineRequest,
    settings: &PipelineSettings,
    scorer: Arc<dyn SentimentScorer>,
) -> ChunkResult<PipelineReport> {
    let families = request.resolve_families()?;
    let stream = Arc::new(EventStream::new(stream_id, events)?);
    let chunking = Arc::new(Chunking::build(stream, &settings.chunking)?);

    let collector = MetricsCollector::new();
    collector.record_chunking(&chunking).await;

    let mut handles = Vec::with_capacity(families.len());
    for kind in families {
        let chunking = Arc::clone(&chunking);
        let features = settings.features.clone();
        let scorer = Arc::clone(&scorer);
        let handle = tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let reducer = build_reducer(kind, chunking.stream(), &features, &scorer);
            let outcome = aggregate(&chunking, reducer.as_ref());
            (outcome, elapsed_ms(started))
        });
        handles.push((kind, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (kind, handle) in handles {
        let (outcome, ms) = handle.await.map_err(|err| ChunkError::FamilyTaskFailed {
            family: kind.name().to_string(),
            reason: err.to_string(),
        })?;
        log_debug!("{kind} finished in {ms} ms");
        collector.record_family(&outcome, ms).await;
        outcomes.push(outcome);
    }

    let (merged, skipped_windows) = merge_outcomes(&chunking, outcomes)?;
    collector.record_merge(merged.len()).await;
    let metrics = collector.snapshot().await;
    finish(&chunking, merged, skipped_windows, request, metrics)
}

/// Joins the family tables and collects the windows each family skipped.
fn merge_outcomes(
    chunking: &Chunking,
    outcomes: Vec<AggregateOutcome>,
) -> ChunkResult<(FeatureTable, Vec<SkippedWindowReport>)> {
    let skipped_windows: Vec<SkippedWindowReport> = outcomes
        .iter()
        .flat_map(|outcome| {
            outcome.skipped.iter().map(|skip| SkippedWindowReport {
                family: outcome.table.family.clone(),
                key: skip.key,
                reason: skip.error.to_string(),
            })
        })
        .collect();

    let tables: Vec<_> = outcomes.into_iter().map(|outcome| outcome.table).collect();
    let merged = FeatureMerger::new(chunking).merge(&tables)?;
    Ok((merged, skipped_windows))
}

fn finish(
    chunking: &Chunking,
    merged: FeatureTable,
    skipped_windows: Vec<SkippedWindowReport>,
    request: &PipelineRequest,
    metrics: MetricsSnapshot,
) -> ChunkResult<PipelineReport> {
    let stream_id = chunking.stream().stream_id().to_string();
    let mut result = ResultTable::new(stream_id.clone(), chunking.first_stamp(), merged);

    let clips = match request.consensus {
        Some(min_agreement) => {
            let mut rankings = Vec::with_capacity(request.rank_by.len());
            for column in &request.rank_by {
                let spec = RankSpec {
                    columns: vec![column.clone()],
                    limit: request.limit,
                };
                rankings.push(rank(&mut result.clone(), &spec)?);
            }
            let agreed = consensus(&rankings, min_agreement, request.limit)?;
            let keep: Vec<ChunkKey> = agreed.iter().map(|clip| clip.key).collect();
            result.table.rows.retain(|row| keep.contains(&row.key));
            result
                .table
                .rows
                .sort_by_key(|row| keep.iter().position(|key| *key == row.key));
            agreed
        }
        None => {
            let spec = RankSpec {
                columns: request.rank_by.clone(),
                limit: request.limit,
            };
            rank(&mut result, &spec)?
        }
    };

    let run_id = Uuid::new_v4();
    log_info!(
        "run {run_id} on {stream_id}: {} clips, {} skipped windows",
        clips.len(),
        skipped_windows.len()
    );

    Ok(PipelineReport {
        stream_id,
        run_id,
        clips,
        skipped_windows,
        metrics,
        result,
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_follow_rank_columns() {
        let request = PipelineRequest {
            rank_by: vec!["chat_rate".into(), "num_words".into(), "mean_chat_rate".into()],
            ..PipelineRequest::default()
        };
        assert_eq!(
            request.resolve_families().unwrap(),
            vec![FamilyKind::ChatRate, FamilyKind::WordVolume]
        );
    }

    #[test]
    fn explicit_families_win_and_are_deduplicated() {
        let request = PipelineRequest {
            families: vec![FamilyKind::Sentiment, FamilyKind::TopUsers, FamilyKind::Sentiment],
            rank_by: vec!["chat_rate".into()],
            ..PipelineRequest::default()
        };
        assert_eq!(
            request.resolve_families().unwrap(),
            vec![FamilyKind::Sentiment, FamilyKind::TopUsers]
        );
    }

    #[test]
    fn missing_rank_column_is_rejected() {
        let request = PipelineRequest::default().with_families(vec![FamilyKind::ChatRate]);
        match request.resolve_families().unwrap_err() {
            ChunkError::InvalidStatisticSelector { requested, available } => {
                assert!(requested.is_empty());
                assert!(available.contains(&"num_emo".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(PipelineRequest::default().resolve_families().is_err());
    }

    #[test]
    fn unknown_rank_column_is_reported() {
        let err = PipelineRequest::rank_by("hype").resolve_families().unwrap_err();
        match err {
            ChunkError::InvalidStatisticSelector { requested, available } => {
                assert_eq!(requested, "hype");
                assert!(available.contains(&"chat_rate".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
