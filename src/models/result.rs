use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChunkKey, FeatureTable};

/// Merged features for one stream, plus the anchor used for elapsed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultTable {
    pub stream_id: String,
    pub first_stamp: DateTime<Utc>,
    pub table: FeatureTable,
}

impl ResultTable {
    pub fn new(stream_id: impl Into<String>, first_stamp: DateTime<Utc>, table: FeatureTable) -> Self {
        Self {
            stream_id: stream_id.into(),
            first_stamp,
            table,
        }
    }
}

/// A ranked window expressed as seconds elapsed since the stream's first event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipStamp {
    #[serde(skip)]
    pub key: ChunkKey,
    pub start_time: f64,
    pub end_time: f64,
}
