use crate::chunking::{Reduction, WindowContext, WindowReducer};
use crate::error::ReduceError;
use crate::features::columns_of;
use crate::models::FeatureColumns;

pub const FAMILY: &str = "word_volume";

pub const COLUMNS: &[&str] = &["num_words_emo", "num_emo", "num_words"];

/// Token, emote and plain-word totals per window.
pub struct WordVolumeReducer;

impl WindowReducer for WordVolumeReducer {
    fn family(&self) -> &str {
        FAMILY
    }

    fn columns(&self) -> Vec<String> {
        columns_of(COLUMNS)
    }

    fn reduce(&self, ctx: &WindowContext<'_>) -> Result<Reduction, ReduceError> {
        let (tokens, emotes) = ctx
            .events
            .iter()
            .fold((0usize, 0usize), |(tokens, emotes), event| {
                (tokens + event.token_count(), emotes + event.emote_count())
            });

        let mut row = FeatureColumns::new();
        row.insert("num_words_emo".into(), tokens.into());
        row.insert("num_emo".into(), emotes.into());
        row.insert("num_words".into(), tokens.saturating_sub(emotes).into());
        Ok(Reduction::Row(row))
    }
}
