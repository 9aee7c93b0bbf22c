use thiserror::Error;

use crate::models::ChunkKey;

/// Failures that abort a chunking, merge or ranking call.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("event stream is empty")]
    EmptyStream,

    #[error("window duration must be a positive number of minutes, got {minutes}")]
    InvalidWindowDuration { minutes: f64 },

    #[error("table `{family}` holds window {key} which is not in the canonical chunk set")]
    MissingJoinKey { family: String, key: ChunkKey },

    #[error("table `{family}` holds window {key} more than once")]
    DuplicateJoinKey { family: String, key: ChunkKey },

    #[error("unknown statistic `{requested}`; available columns: {}", available.join(", "))]
    InvalidStatisticSelector {
        requested: String,
        available: Vec<String>,
    },

    #[error("column `{column}` is not numeric and cannot be ranked")]
    NonNumericColumn { column: String },

    #[error("no feature tables to merge")]
    NothingToMerge,

    #[error("consensus needs at least one ranking and an agreement of 1 or more (got {min_agreement} over {rankings} rankings)")]
    InvalidAgreement { min_agreement: usize, rankings: usize },

    #[error("feature family `{family}` did not complete: {reason}")]
    FamilyTaskFailed { family: String, reason: String },
}

/// Failure of a reducer on a single window. The aggregator skips and reports
/// the window instead of aborting the run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReduceError {
    #[error("malformed event at {index}: {reason}")]
    MalformedEvent { index: usize, reason: String },

    #[error("reducer `{family}` output does not match its declared schema at column `{column}`")]
    SchemaMismatch { family: String, column: String },
}

pub type ChunkResult<T> = std::result::Result<T, ChunkError>;
