use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity of a fine window: which coarse partition it was carved
/// from and its position inside that partition. Used as the merge key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct ChunkKey {
    pub coarse_index: usize,
    pub fine_index: usize,
}

impl ChunkKey {
    pub fn new(coarse_index: usize, fine_index: usize) -> Self {
        Self {
            coarse_index,
            fine_index,
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.coarse_index, self.fine_index)
    }
}

/// A fine window. `start`/`end` are the first and last event timestamps it
/// holds, not the nominal boundary. `span` indexes the stream's sorted
/// events; `coarse_span` indexes the enclosing coarse partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub key: ChunkKey,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub span: Range<usize>,
    pub coarse_span: Range<usize>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    pub fn elapsed(&self) -> Duration {
        self.end - self.start
    }

    /// Elapsed time between first and last event, in fractional seconds.
    pub fn duration_secs(&self) -> f64 {
        duration_to_secs(self.elapsed())
    }

    /// Zero elapsed duration, e.g. a window holding a single event.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

/// Converts a chrono duration to fractional seconds at microsecond precision.
pub fn duration_to_secs(duration: Duration) -> f64 {
    match duration.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => duration.num_milliseconds() as f64 / 1_000.0,
    }
}
