mod types;

pub use types::{FamilyMetrics, MetricsSnapshot};

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chunking::{AggregateOutcome, Chunking};

/// Run counters shared between concurrently finishing family tasks.
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsSnapshot>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsSnapshot::default())),
        }
    }

    pub async fn record_chunking(&self, chunking: &Chunking) {
        let mut state = self.inner.lock().await;
        state.record_chunking(chunking);
    }

    pub async fn record_family(&self, outcome: &AggregateOutcome, elapsed_ms: u64) {
        let mut state = self.inner.lock().await;
        state.record_family(outcome, elapsed_ms);
    }

    pub async fn record_merge(&self, rows: usize) {
        let mut state = self.inner.lock().await;
        state.record_merge(rows);
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().await.clone()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
