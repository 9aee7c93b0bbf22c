use std::iter::FusedIterator;
use std::ops::Range;

use chrono::{DateTime, Duration, Utc};

use crate::chunking::config::WindowBoundary;
use crate::models::ChatEvent;

/// Splits a timestamp-sorted event slice into contiguous, non-overlapping
/// windows of at most `span` measured from each window's first event.
#[derive(Debug, Clone, Copy)]
pub struct WindowPartitioner {
    span: Duration,
    boundary: WindowBoundary,
}

impl WindowPartitioner {
    pub fn new(span: Duration, boundary: WindowBoundary) -> Self {
        Self { span, boundary }
    }

    /// Lazily yields index ranges into `events`, which must already be
    /// sorted by timestamp. Every index lands in exactly one range.
    pub fn partition<'a>(&self, events: &'a [ChatEvent]) -> WindowSpans<'a> {
        WindowSpans {
            events,
            span: self.span,
            boundary: self.boundary,
            cursor: 0,
        }
    }
}

/// Iterator returned by [`WindowPartitioner::partition`].
pub struct WindowSpans<'a> {
    events: &'a [ChatEvent],
    span: Duration,
    boundary: WindowBoundary,
    cursor: usize,
}

impl Iterator for WindowSpans<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        // Stop once the cursor is past the final valid index, not the count.
        let last_index = self.events.len().checked_sub(1)?;
        if self.cursor > last_index {
            return None;
        }

        let start = self.cursor;
        let anchor = self.events[start].timestamp;
        let remaining = &self.events[start..];

        let taken = match anchor.checked_add_signed(self.span) {
            Some(limit) => {
                remaining.partition_point(|event| within(event.timestamp, limit, self.boundary))
            }
            // Limit beyond the representable range: everything left fits.
            None => remaining.len(),
        };

        // The anchor event always belongs to its own window.
        self.cursor = start + taken.max(1);
        Some(start..self.cursor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.events.len().saturating_sub(self.cursor);
        (usize::from(left > 0), Some(left))
    }
}

impl FusedIterator for WindowSpans<'_> {}

fn within(timestamp: DateTime<Utc>, limit: DateTime<Utc>, boundary: WindowBoundary) -> bool {
    match boundary {
        WindowBoundary::Closed => timestamp <= limit,
        WindowBoundary::HalfOpen => timestamp < limit,
    }
}

/// Stable sort by timestamp; events sharing a timestamp keep input order.
pub fn sort_events(events: &mut [ChatEvent]) {
    events.sort_by_key(|event| event.timestamp);
}
