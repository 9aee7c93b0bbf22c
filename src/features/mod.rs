//! Statistic families. Each one is a [`WindowReducer`] turning the events of
//! a window into a fixed set of columns.

pub mod chat_rate;
pub mod emoticons;
pub mod sentiment;
pub mod top_users;
pub mod unique_users;
pub mod word_volume;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunking::{EventStream, WindowReducer};
use crate::models::ChatEvent;

pub use chat_rate::ChatRateReducer;
pub use emoticons::{emote_usage, EmoteUsage, EmoticonReducer, MinUse};
pub use sentiment::{LexiconScorer, PolarityScores, SentimentReducer, SentimentScorer};
pub use top_users::{rank_users, TopUsersReducer};
pub use unique_users::UniqueUsersReducer;
pub use word_volume::WordVolumeReducer;

/// Tunables shared by the statistic families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureConfig {
    /// How many of the stream's most talkative users count as "top"
    pub top_user_count: usize,

    /// A top user must send more than this many messages in a window
    pub top_user_min_messages: usize,

    /// |compound| at or above this is labelled Positive/Negative
    pub sentiment_threshold: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            top_user_count: 10,
            top_user_min_messages: 5,
            sentiment_threshold: 0.05,
        }
    }
}

/// The built-in statistic families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyKind {
    UniqueUsers,
    ChatRate,
    TopUsers,
    WordVolume,
    Emoticons,
    Sentiment,
}

impl FamilyKind {
    pub const ALL: [FamilyKind; 6] = [
        FamilyKind::UniqueUsers,
        FamilyKind::ChatRate,
        FamilyKind::TopUsers,
        FamilyKind::WordVolume,
        FamilyKind::Emoticons,
        FamilyKind::Sentiment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FamilyKind::UniqueUsers => unique_users::FAMILY,
            FamilyKind::ChatRate => chat_rate::FAMILY,
            FamilyKind::TopUsers => top_users::FAMILY,
            FamilyKind::WordVolume => word_volume::FAMILY,
            FamilyKind::Emoticons => emoticons::FAMILY,
            FamilyKind::Sentiment => sentiment::FAMILY,
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            FamilyKind::UniqueUsers => unique_users::COLUMNS,
            FamilyKind::ChatRate => chat_rate::COLUMNS,
            FamilyKind::TopUsers => top_users::COLUMNS,
            FamilyKind::WordVolume => word_volume::COLUMNS,
            FamilyKind::Emoticons => emoticons::COLUMNS,
            FamilyKind::Sentiment => sentiment::COLUMNS,
        }
    }

    /// First family (in [`FamilyKind::ALL`] order) that produces `column`.
    pub fn owning(column: &str) -> Option<FamilyKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.columns().contains(&column))
    }
}

impl fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FamilyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown family `{s}`; expected one of {}", names.join(", "))
            })
    }
}

/// Builds the reducer for `kind`. Families that need stream-wide totals
/// compute them here, once.
pub fn build_reducer(
    kind: FamilyKind,
    stream: &EventStream,
    config: &FeatureConfig,
    scorer: &Arc<dyn SentimentScorer>,
) -> Box<dyn WindowReducer> {
    match kind {
        FamilyKind::UniqueUsers => Box::new(UniqueUsersReducer::new(stream)),
        FamilyKind::ChatRate => Box::new(ChatRateReducer),
        FamilyKind::TopUsers => Box::new(TopUsersReducer::new(stream, config)),
        FamilyKind::WordVolume => Box::new(WordVolumeReducer),
        FamilyKind::Emoticons => Box::new(EmoticonReducer::new(stream)),
        FamilyKind::Sentiment => Box::new(SentimentReducer::new(
            Arc::clone(scorer),
            config.sentiment_threshold,
        )),
    }
}

/// Number of distinct chatters in `events`.
pub fn unique_users(events: &[ChatEvent]) -> usize {
    events
        .iter()
        .map(|event| event.user_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub(crate) fn columns_of(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
