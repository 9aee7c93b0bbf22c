use crate::chunking::config::ChunkingConfig;
use crate::chunking::indexer::Chunking;
use crate::error::ReduceError;
use crate::models::{ChatEvent, ChunkKey, FeatureColumns, FeatureRow, FeatureTable, Window};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Everything a reducer may look at for one window.
pub struct WindowContext<'a> {
    pub window: &'a Window,
    pub events: &'a [ChatEvent],
    pub coarse_events: &'a [ChatEvent],
    pub stream_events: &'a [ChatEvent],
    pub config: &'a ChunkingConfig,
}

impl WindowContext<'_> {
    /// `count` normalised to "per D minutes" for this window.
    pub fn rate(&self, count: f64) -> f64 {
        rate_per_window(count, self.window.duration_secs(), self.config.window_minutes)
    }
}

/// Output of a reducer for one window.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    Row(FeatureColumns),
    /// The family deliberately excludes this window (e.g. no top user took
    /// part). Distinct from a row of zeros.
    Filtered,
}

/// A statistic family: maps one window's events to a row of columns.
pub trait WindowReducer: Send + Sync {
    fn family(&self) -> &str;

    /// Columns every `Reduction::Row` must contain, in output order.
    fn columns(&self) -> Vec<String>;

    fn reduce(&self, ctx: &WindowContext<'_>) -> Result<Reduction, ReduceError>;
}

/// Adapts a closure into a [`WindowReducer`].
pub struct FnReducer<F> {
    family: String,
    columns: Vec<String>,
    reduce: F,
}

impl<F> FnReducer<F> {
    pub fn new(family: impl Into<String>, columns: &[&str], reduce: F) -> Self
    where
        F: Fn(&WindowContext<'_>) -> Result<Reduction, ReduceError> + Send + Sync,
    {
        Self {
            family: family.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            reduce,
        }
    }
}

impl<F> WindowReducer for FnReducer<F>
where
    F: Fn(&WindowContext<'_>) -> Result<Reduction, ReduceError> + Send + Sync,
{
    fn family(&self) -> &str {
        &self.family
    }

    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn reduce(&self, ctx: &WindowContext<'_>) -> Result<Reduction, ReduceError> {
        (self.reduce)(ctx)
    }
}

/// A window the reducer failed on.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedWindow {
    pub key: ChunkKey,
    pub error: ReduceError,
}

/// One family's table plus the windows that did not make it into it.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub table: FeatureTable,
    pub filtered: Vec<ChunkKey>,
    pub skipped: Vec<SkippedWindow>,
}

/// Calls `reducer` exactly once per window, in window order. A reducer error
/// skips only that window; it is logged and reported in the outcome.
pub fn aggregate(chunking: &Chunking, reducer: &dyn WindowReducer) -> AggregateOutcome {
    let family = reducer.family().to_string();
    let columns = reducer.columns();
    let mut table = FeatureTable::new(family.clone(), columns.clone());
    let mut filtered = Vec::new();
    let mut skipped = Vec::new();

    let stream_events = chunking.stream().events();
    for window in chunking.windows() {
        let ctx = WindowContext {
            window,
            events: chunking.window_events(window),
            coarse_events: chunking.coarse_events(window),
            stream_events,
            config: chunking.config(),
        };

        let outcome = reducer
            .reduce(&ctx)
            .and_then(|reduction| match reduction {
                Reduction::Row(values) => conform(&family, &columns, values).map(Some),
                Reduction::Filtered => Ok(None),
            });

        match outcome {
            Ok(Some(values)) => table.rows.push(FeatureRow {
                key: window.key,
                start: window.start,
                end: window.end,
                values,
            }),
            Ok(None) => filtered.push(window.key),
            Err(error) => {
                log_warn!("{family}: skipping window {}: {error}", window.key);
                skipped.push(SkippedWindow {
                    key: window.key,
                    error,
                });
            }
        }
    }

    log_info!(
        "{family}: {} rows, {} filtered, {} skipped",
        table.len(),
        filtered.len(),
        skipped.len()
    );

    AggregateOutcome {
        table,
        filtered,
        skipped,
    }
}

/// Reorders `values` to the declared schema, rejecting missing or extra columns.
fn conform(
    family: &str,
    declared: &[String],
    mut values: FeatureColumns,
) -> Result<FeatureColumns, ReduceError> {
    if let Some(extra) = values.keys().find(|key| !declared.contains(key)) {
        return Err(ReduceError::SchemaMismatch {
            family: family.to_string(),
            column: extra.clone(),
        });
    }

    let mut ordered = FeatureColumns::with_capacity(declared.len());
    for column in declared {
        let value = values
            .shift_remove(column)
            .ok_or_else(|| ReduceError::SchemaMismatch {
                family: family.to_string(),
                column: column.clone(),
            })?;
        ordered.insert(column.clone(), value);
    }
    Ok(ordered)
}

/// `count_in_window / count_in_enclosing_coarse_partition`.
pub fn relative_ratio(count_in_window: f64, count_in_coarse: f64) -> f64 {
    safe_ratio(count_in_window, count_in_coarse)
}

/// `count_in_window / count_in_whole_stream`.
pub fn absolute_ratio(count_in_window: f64, count_in_stream: f64) -> f64 {
    safe_ratio(count_in_window, count_in_stream)
}

/// `(count / seconds) * 60 * D`. A zero-length window uses `D` in place of
/// its duration, so a lone event rates 60.
pub fn rate_per_window(count: f64, window_duration_secs: f64, window_minutes: f64) -> f64 {
    let seconds = if window_duration_secs > 0.0 {
        window_duration_secs
    } else {
        window_minutes
    };
    count / seconds * 60.0 * window_minutes
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
