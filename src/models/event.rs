//! Chat event data model.
//!
//! One `ChatEvent` per chat message, immutable once ingested.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One emote inside a message body. `begin`/`end` are inclusive character
/// offsets into the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmoteOccurrence {
    pub emote_id: String,
    pub begin: usize,
    pub end: usize,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub body: String,
    pub emoticons: Option<Vec<EmoteOccurrence>>,
}

impl ChatEvent {
    pub fn new(timestamp: DateTime<Utc>, user_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            timestamp,
            user_id: user_id.into(),
            body: body.into(),
            emoticons: None,
        }
    }

    pub fn with_emoticons(mut self, emoticons: Vec<EmoteOccurrence>) -> Self {
        self.emoticons = Some(emoticons);
        self
    }

    /// Number of emotes in the message. A missing emote list counts as zero.
    pub fn emote_count(&self) -> usize {
        self.emoticons.as_ref().map_or(0, Vec::len)
    }

    /// Tokens obtained by splitting the body on single spaces, emotes included.
    pub fn token_count(&self) -> usize {
        self.body.split(' ').count()
    }

    /// Tokens that are not emotes. Never negative.
    pub fn word_count(&self) -> usize {
        self.token_count().saturating_sub(self.emote_count())
    }

    /// Text of the emote at `occurrence`, recovered from the body offsets.
    pub fn emote_text(&self, occurrence: &EmoteOccurrence) -> Option<String> {
        let len = occurrence
            .end
            .checked_sub(occurrence.begin)?
            .checked_add(1)?;
        let text: String = self.body.chars().skip(occurrence.begin).take(len).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
