use indexmap::IndexMap;

use crate::chunking::{EventStream, Reduction, WindowContext, WindowReducer};
use crate::error::ReduceError;
use crate::features::{columns_of, FeatureConfig};
use crate::models::{ChatEvent, FeatureColumns};

pub const FAMILY: &str = "top_users";

pub const COLUMNS: &[&str] = &["num_top_user_appears"];

/// Users ordered by plain words sent (emotes excluded), most first. Ties
/// keep the order in which users first spoke.
pub fn rank_users(events: &[ChatEvent]) -> Vec<(String, i64)> {
    let mut words: IndexMap<&str, i64> = IndexMap::new();
    for event in events {
        let only_words = event.token_count() as i64 - event.emote_count() as i64;
        *words.entry(event.user_id.as_str()).or_insert(0) += only_words;
    }

    let mut ranked: Vec<(String, i64)> = words
        .into_iter()
        .map(|(user, count)| (user.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Keeps only windows where a top chatter was active.
///
/// A window qualifies when at least one top user sent more than
/// `top_user_min_messages` messages in it; the column sums the message
/// counts of every qualifying top user.
pub struct TopUsersReducer {
    top: Vec<String>,
    min_messages: usize,
}

impl TopUsersReducer {
    pub fn new(stream: &EventStream, config: &FeatureConfig) -> Self {
        let top = rank_users(stream.events())
            .into_iter()
            .take(config.top_user_count)
            .map(|(user, _)| user)
            .collect();
        Self {
            top,
            min_messages: config.top_user_min_messages,
        }
    }

    pub fn top_users(&self) -> &[String] {
        &self.top
    }
}

impl WindowReducer for TopUsersReducer {
    fn family(&self) -> &str {
        FAMILY
    }

    fn columns(&self) -> Vec<String> {
        columns_of(COLUMNS)
    }

    fn reduce(&self, ctx: &WindowContext<'_>) -> Result<Reduction, ReduceError> {
        let appearances: usize = self
            .top
            .iter()
            .map(|user| {
                ctx.events
                    .iter()
                    .filter(|event| &event.user_id == user)
                    .count()
            })
            .filter(|&sent| sent > self.min_messages)
            .sum();

        if appearances == 0 {
            return Ok(Reduction::Filtered);
        }

        let mut row = FeatureColumns::new();
        row.insert("num_top_user_appears".into(), appearances.into());
        Ok(Reduction::Row(row))
    }
}
