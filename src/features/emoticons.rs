use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::chunking::{absolute_ratio, EventStream, Reduction, WindowContext, WindowReducer};
use crate::error::ReduceError;
use crate::features::{columns_of, unique_users};
use crate::models::{ChatEvent, FeatureColumns};

pub const FAMILY: &str = "emoticons";

pub const COLUMNS: &[&str] = &[
    "num_emo",
    "chunk_unique_users",
    "perc_emoji_of_stream",
    "emoji_user_ratio",
];

/// Emote volume per window, against the stream total and per chatter.
/// Repeated emotes count once per occurrence.
pub struct EmoticonReducer {
    stream_emotes: usize,
}

impl EmoticonReducer {
    pub fn new(stream: &EventStream) -> Self {
        Self {
            stream_emotes: stream.events().iter().map(ChatEvent::emote_count).sum(),
        }
    }
}

impl WindowReducer for EmoticonReducer {
    fn family(&self) -> &str {
        FAMILY
    }

    fn columns(&self) -> Vec<String> {
        columns_of(COLUMNS)
    }

    fn reduce(&self, ctx: &WindowContext<'_>) -> Result<Reduction, ReduceError> {
        let mut emotes = 0usize;
        for (offset, event) in ctx.events.iter().enumerate() {
            for occurrence in event.emoticons.iter().flatten() {
                if occurrence.end < occurrence.begin {
                    return Err(ReduceError::MalformedEvent {
                        index: ctx.window.span.start + offset,
                        reason: format!(
                            "emote {} ends at {} before it begins at {}",
                            occurrence.emote_id, occurrence.end, occurrence.begin
                        ),
                    });
                }
                emotes += 1;
            }
        }

        let chatters = unique_users(ctx.events);
        let per_chatter = if chatters == 0 {
            0.0
        } else {
            emotes as f64 / chatters as f64
        };

        let mut row = FeatureColumns::new();
        row.insert("num_emo".into(), emotes.into());
        row.insert("chunk_unique_users".into(), chatters.into());
        row.insert(
            "perc_emoji_of_stream".into(),
            absolute_ratio(emotes as f64, self.stream_emotes as f64).into(),
        );
        row.insert("emoji_user_ratio".into(), per_chatter.into());
        Ok(Reduction::Row(row))
    }
}

/// Which emotes [`emote_usage`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MinUse {
    /// Used more often than the mean emote.
    Mean,
    /// Used at least `n` times.
    AtLeast(usize),
    All,
}

/// Stream-wide usage of one emote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmoteUsage {
    pub emote_id: String,
    /// Text of the first occurrence whose offsets fall inside its message.
    pub name: Option<String>,
    pub occurrences: usize,
}

/// Per-emote occurrence counts over `events`, most used first (ties in
/// order of first use), filtered by `min_use` and cut to `limit`.
pub fn emote_usage(events: &[ChatEvent], min_use: MinUse, limit: Option<usize>) -> Vec<EmoteUsage> {
    let mut usage: IndexMap<&str, EmoteUsage> = IndexMap::new();
    for event in events {
        for occurrence in event.emoticons.iter().flatten() {
            let entry = usage
                .entry(occurrence.emote_id.as_str())
                .or_insert_with(|| EmoteUsage {
                    emote_id: occurrence.emote_id.clone(),
                    name: None,
                    occurrences: 0,
                });
            entry.occurrences += 1;
            if entry.name.is_none() {
                entry.name = event.emote_text(occurrence);
            }
        }
    }

    let mut ranked: Vec<EmoteUsage> = usage.into_values().collect();
    ranked.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));

    match min_use {
        MinUse::Mean if !ranked.is_empty() => {
            let mean = ranked.iter().map(|u| u.occurrences).sum::<usize>() as f64 / ranked.len() as f64;
            ranked.retain(|u| u.occurrences as f64 > mean);
        }
        MinUse::AtLeast(n) => ranked.retain(|u| u.occurrences >= n),
        _ => {}
    }

    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}
