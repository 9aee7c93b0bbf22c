use crate::chunking::{absolute_ratio, relative_ratio, EventStream, Reduction, WindowContext, WindowReducer};
use crate::error::ReduceError;
use crate::features::{columns_of, unique_users};
use crate::models::FeatureColumns;

pub const FAMILY: &str = "unique_users";

pub const COLUMNS: &[&str] = &[
    "chunk_unique_users",
    "hour_unique_users",
    "stream_unique_users",
    "chunk_to_hour_unique_users",
    "chunk_to_stream_unique_users",
];

/// Distinct chatters per window, per coarse partition and per stream.
pub struct UniqueUsersReducer {
    stream_unique: usize,
}

impl UniqueUsersReducer {
    pub fn new(stream: &EventStream) -> Self {
        Self {
            stream_unique: unique_users(stream.events()),
        }
    }
}

impl WindowReducer for UniqueUsersReducer {
    fn family(&self) -> &str {
        FAMILY
    }

    fn columns(&self) -> Vec<String> {
        columns_of(COLUMNS)
    }

    fn reduce(&self, ctx: &WindowContext<'_>) -> Result<Reduction, ReduceError> {
        let chunk = unique_users(ctx.events) as f64;
        let hour = unique_users(ctx.coarse_events) as f64;
        let stream = self.stream_unique as f64;

        let mut row = FeatureColumns::new();
        row.insert("chunk_unique_users".into(), chunk.into());
        row.insert("hour_unique_users".into(), hour.into());
        row.insert("stream_unique_users".into(), stream.into());
        row.insert("chunk_to_hour_unique_users".into(), relative_ratio(chunk, hour).into());
        row.insert("chunk_to_stream_unique_users".into(), absolute_ratio(chunk, stream).into());
        Ok(Reduction::Row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::{chat, chunked, run};

    #[test]
    fn ratios_against_hour_and_stream() {
        // Window 0: a, b. Window 1: a, c, d. Second hour: e.
        let events = vec![
            chat(0, "a", "hi"),
            chat(10, "b", "hi"),
            chat(10, "a", "hi"),
            chat(300, "a", "yo"),
            chat(310, "c", "yo"),
            chat(320, "d", "yo"),
            chat(4000, "e", "late"),
        ];
        let chunking = chunked(events, 2.0);
        let reducer = UniqueUsersReducer::new(chunking.stream());
        let table = run(&chunking, &reducer).table;

        assert_eq!(table.len(), 3);
        let first = &table.rows[0];
        assert_eq!(first.number("chunk_unique_users"), Some(2.0));
        assert_eq!(first.number("hour_unique_users"), Some(4.0));
        assert_eq!(first.number("stream_unique_users"), Some(5.0));
        assert_eq!(first.number("chunk_to_hour_unique_users"), Some(0.5));
        assert_eq!(first.number("chunk_to_stream_unique_users"), Some(0.4));

        let last = &table.rows[2];
        assert_eq!(last.key.coarse_index, 1);
        assert_eq!(last.number("chunk_to_hour_unique_users"), Some(1.0));
    }
}
