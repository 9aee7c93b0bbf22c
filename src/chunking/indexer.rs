use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chunking::config::ChunkingConfig;
use crate::chunking::partition::{sort_events, WindowPartitioner};
use crate::error::{ChunkError, ChunkResult};
use crate::models::{ChatEvent, ChunkKey, Window};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Chat events of one stream, sorted by timestamp. Never empty.
#[derive(Debug, Clone)]
pub struct EventStream {
    stream_id: String,
    events: Vec<ChatEvent>,
}

impl EventStream {
    pub fn new(stream_id: impl Into<String>, mut events: Vec<ChatEvent>) -> ChunkResult<Self> {
        if events.is_empty() {
            return Err(ChunkError::EmptyStream);
        }
        sort_events(&mut events);
        Ok(Self {
            stream_id: stream_id.into(),
            events,
        })
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn events(&self) -> &[ChatEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the earliest event; the anchor for elapsed seconds.
    pub fn first_stamp(&self) -> DateTime<Utc> {
        self.events[0].timestamp
    }
}

/// One top-level (nominally hour-long) partition.
#[derive(Debug, Clone, PartialEq)]
pub struct CoarsePartition {
    pub index: usize,
    pub span: Range<usize>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Result of the two-level pass: coarse partitions, then fine windows
/// carved from each one, labelled with their `(coarse, fine)` key.
#[derive(Debug, Clone)]
pub struct Chunking {
    stream: Arc<EventStream>,
    config: ChunkingConfig,
    first_stamp: DateTime<Utc>,
    coarse: Vec<CoarsePartition>,
    windows: Vec<Window>,
}

impl Chunking {
    pub fn build(stream: Arc<EventStream>, config: &ChunkingConfig) -> ChunkResult<Self> {
        let coarse_partitioner = WindowPartitioner::new(config.coarse_span()?, config.boundary);
        let fine_partitioner = WindowPartitioner::new(config.window_span()?, config.boundary);
        let events = stream.events();
        let first_stamp = stream.first_stamp();

        // Step 1: coarse pass over the whole stream
        let coarse: Vec<CoarsePartition> = coarse_partitioner
            .partition(events)
            .enumerate()
            .map(|(index, span)| CoarsePartition {
                index,
                start: events[span.start].timestamp,
                end: events[span.end - 1].timestamp,
                span,
            })
            .collect();

        // Step 2: fine pass inside each coarse partition, anchor restarting
        // at the partition's first event
        let mut windows = Vec::new();
        for partition in &coarse {
            let slice = &events[partition.span.clone()];
            let offset = partition.span.start;
            let before = windows.len();
            windows.extend(fine_partitioner.partition(slice).enumerate().map(
                |(fine_index, local)| {
                    let span = (local.start + offset)..(local.end + offset);
                    Window {
                        key: ChunkKey::new(partition.index, fine_index),
                        start: events[span.start].timestamp,
                        end: events[span.end - 1].timestamp,
                        span,
                        coarse_span: partition.span.clone(),
                    }
                },
            ));
            log_debug!(
                "coarse partition {} holds {} events in {} windows",
                partition.index,
                partition.span.len(),
                windows.len() - before
            );
        }

        log_info!(
            "stream {}: {} events, {} coarse partitions, {} windows of {} min",
            stream.stream_id(),
            events.len(),
            coarse.len(),
            windows.len(),
            config.window_minutes
        );

        Ok(Self {
            stream,
            config: config.clone(),
            first_stamp,
            coarse,
            windows,
        })
    }

    pub fn stream(&self) -> &Arc<EventStream> {
        &self.stream
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn first_stamp(&self) -> DateTime<Utc> {
        self.first_stamp
    }

    pub fn coarse_partitions(&self) -> &[CoarsePartition] {
        &self.coarse
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Windows are stored in key order, so lookup is a binary search.
    pub fn window(&self, key: ChunkKey) -> Option<&Window> {
        self.windows
            .binary_search_by_key(&key, |w| w.key)
            .ok()
            .map(|i| &self.windows[i])
    }

    pub fn window_events(&self, window: &Window) -> &[ChatEvent] {
        &self.stream.events()[window.span.clone()]
    }

    pub fn coarse_events(&self, window: &Window) -> &[ChatEvent] {
        &self.stream.events()[window.coarse_span.clone()]
    }
}
