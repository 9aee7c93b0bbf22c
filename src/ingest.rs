//! Twitch chat-log ingestion.
//!
//! Reads the JSON array a Twitch VOD chat download produces, one record per
//! comment, and keeps only what the chunking pipeline needs.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{ChatEvent, EmoteOccurrence};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Events of one chat log plus the stream they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatLog {
    pub stream_id: String,
    pub events: Vec<ChatEvent>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    created_at: DateTime<Utc>,
    commenter: RawCommenter,
    message: RawMessage,
    #[serde(default)]
    content_id: Option<RawId>,
}

#[derive(Debug, Deserialize)]
struct RawCommenter {
    #[serde(rename = "_id")]
    id: RawId,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    body: String,
    #[serde(default)]
    emoticons: Option<Vec<RawEmoticon>>,
}

#[derive(Debug, Deserialize)]
struct RawEmoticon {
    #[serde(rename = "_id")]
    id: RawId,
    begin: usize,
    end: usize,
}

/// Older logs carry ids as numbers, newer ones as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

impl From<RawComment> for ChatEvent {
    fn from(raw: RawComment) -> Self {
        let event = ChatEvent::new(raw.created_at, raw.commenter.id, raw.message.body);
        match raw.message.emoticons {
            Some(emoticons) => event.with_emoticons(
                emoticons
                    .into_iter()
                    .map(|e| EmoteOccurrence {
                        emote_id: e.id.into(),
                        begin: e.begin,
                        end: e.end,
                    })
                    .collect(),
            ),
            None => event,
        }
    }
}

/// Parses a chat log. The stream id is the first record's `content_id`,
/// or `fallback_id` when no record carries one. An empty array is valid
/// here; it only fails once the stream is chunked.
pub fn parse_chat_log(json: &str, fallback_id: &str) -> Result<ChatLog> {
    let raw: Vec<RawComment> =
        serde_json::from_str(json).context("Failed to parse chat log JSON")?;

    let mut stream_id = None;
    let mut events = Vec::with_capacity(raw.len());
    for mut comment in raw {
        if stream_id.is_none() {
            stream_id = comment.content_id.take().map(String::from);
        }
        events.push(ChatEvent::from(comment));
    }

    let stream_id = stream_id.unwrap_or_else(|| {
        log_warn!("chat log has no content_id, using `{fallback_id}`");
        fallback_id.to_string()
    });

    Ok(ChatLog { stream_id, events })
}

/// Reads and parses the chat log at `path`, falling back to the file stem
/// for the stream id.
pub fn load_chat_log(path: impl AsRef<Path>) -> Result<ChatLog> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chat log {}", path.display()))?;
    let fallback = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("stream");
    let log = parse_chat_log(&json, fallback)
        .with_context(|| format!("Invalid chat log {}", path.display()))?;
    log_info!(
        "loaded {} chat events for stream {} from {}",
        log.events.len(),
        log.stream_id,
        path.display()
    );
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const SAMPLE: &str = r##"[
        {
            "created_at": "2021-04-01T20:00:00.5Z",
            "updated_at": "2021-04-01T20:00:00.5Z",
            "content_id": "1073833457",
            "commenter": {"_id": "99", "display_name": "viewer"},
            "message": {
                "body": "gg Kappa",
                "emoticons": [{"_id": "25", "begin": 3, "end": 7}],
                "user_color": "#FF0000"
            }
        },
        {
            "created_at": "2021-04-01T20:00:03Z",
            "commenter": {"_id": 12},
            "message": {"body": "no emotes"}
        }
    ]"##;

    #[test]
    fn parses_twitch_records() {
        let log = parse_chat_log(SAMPLE, "fallback").unwrap();
        assert_eq!(log.stream_id, "1073833457");
        assert_eq!(log.events.len(), 2);

        let first = &log.events[0];
        assert_eq!(first.user_id, "99");
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2021, 4, 1, 20, 0, 0).unwrap() + chrono::Duration::milliseconds(500)
        );
        let emotes = first.emoticons.as_ref().unwrap();
        assert_eq!(first.emote_text(&emotes[0]).as_deref(), Some("Kappa"));

        assert_eq!(first.body, "gg Kappa");

        let second = &log.events[1];
        assert_eq!(second.user_id, "12");
        assert_eq!(second.emoticons, None);
        assert_eq!(second.emote_count(), 0);
    }

    #[test]
    fn empty_log_is_not_an_ingest_error() {
        let log = parse_chat_log("[]", "vod").unwrap();
        assert!(log.events.is_empty());
        assert_eq!(log.stream_id, "vod");
    }

    #[test]
    fn rejects_records_without_a_commenter() {
        let json = r#"[{"created_at": "2021-04-01T20:00:00Z", "message": {"body": "hi"}}]"#;
        assert!(parse_chat_log(json, "vod").is_err());
    }

    #[test]
    fn loads_from_disk_with_file_stem_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("555.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{"created_at": "2021-04-01T20:00:00Z", "commenter": {{"_id": "1"}}, "message": {{"body": "hi"}}}}]"#
        )
        .unwrap();

        let log = load_chat_log(&path).unwrap();
        assert_eq!(log.stream_id, "555");
        assert_eq!(log.events.len(), 1);

        assert!(load_chat_log(dir.path().join("missing.json")).is_err());
    }
}
