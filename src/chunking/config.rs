use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, ChunkResult};

/// Which events close a window relative to `anchor + D`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowBoundary {
    /// Consume every event with `timestamp <= anchor + D`.
    #[default]
    Closed,
    /// Consume every event with `timestamp < anchor + D`.
    HalfOpen,
}

/// Configuration for the two-level chunking pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkingConfig {
    /// Target fine window length `D`, in minutes (fractional allowed)
    pub window_minutes: f64,

    /// Coarse partition length, nominally one hour
    pub coarse_minutes: f64,

    pub boundary: WindowBoundary,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_minutes: 2.0,
            coarse_minutes: 60.0,
            boundary: WindowBoundary::Closed,
        }
    }
}

impl ChunkingConfig {
    pub fn with_window_minutes(window_minutes: f64) -> Self {
        Self {
            window_minutes,
            ..Self::default()
        }
    }

    pub fn window_span(&self) -> ChunkResult<Duration> {
        minutes_to_duration(self.window_minutes)
    }

    pub fn coarse_span(&self) -> ChunkResult<Duration> {
        minutes_to_duration(self.coarse_minutes)
    }
}

/// Converts fractional minutes to a duration at microsecond precision.
pub fn minutes_to_duration(minutes: f64) -> ChunkResult<Duration> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(ChunkError::InvalidWindowDuration { minutes });
    }
    let micros = (minutes * 60_000_000.0).round();
    if micros < 1.0 || micros > i64::MAX as f64 {
        return Err(ChunkError::InvalidWindowDuration { minutes });
    }
    Ok(Duration::microseconds(micros as i64))
}
