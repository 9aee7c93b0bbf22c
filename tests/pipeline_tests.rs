//! End-to-end runs: chat log JSON in, ranked clip stamps out.

use std::sync::Arc;

use chatpulse_lib::chunking::WindowBoundary;
use chatpulse_lib::features::{FamilyKind, LexiconScorer, SentimentScorer};
use chatpulse_lib::ingest::parse_chat_log;
use chatpulse_lib::models::{ChatEvent, EmoteOccurrence};
use chatpulse_lib::settings::PipelineSettings;
use chatpulse_lib::{run_pipeline, run_pipeline_concurrent, ChunkError, PipelineRequest};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 4, 1, 20, 0, 0).unwrap()
}

fn scorer() -> Arc<dyn SentimentScorer> {
    Arc::new(LexiconScorer::builtin())
}

/// Twitch-shaped chat log: a quiet baseline with a burst of hype around
/// minute 10.
fn chat_log_json(seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::new();
    let mut push = |second: f64, user: String, body: &str, emote: bool| {
        let created_at = t0() + Duration::milliseconds((second * 1000.0) as i64);
        let mut message = json!({ "body": body });
        if emote {
            let begin = body.rfind(' ').map_or(0, |i| i + 1);
            message["emoticons"] = json!([{ "_id": "305954156", "begin": begin, "end": body.len() - 1 }]);
        }
        records.push(json!({
            "created_at": created_at.to_rfc3339(),
            "content_id": "1073833457",
            "commenter": { "_id": user },
            "message": message,
        }));
    };

    for i in 0..200 {
        let second = i as f64 * 12.0 + rng.gen_range(0.0..5.0);
        push(second, format!("{}", rng.gen_range(0..40)), "just chatting here", false);
    }
    for i in 0..150 {
        let second = 600.0 + i as f64 * 0.4;
        push(second, format!("{}", 100 + i % 60), "that was amazing PogChamp", true);
    }
    serde_json::to_string(&records).unwrap()
}

fn settings(window_minutes: f64) -> PipelineSettings {
    let mut settings = PipelineSettings::default();
    settings.chunking.window_minutes = window_minutes;
    settings
}

#[test]
fn burst_ranks_first() {
    let log = parse_chat_log(&chat_log_json(7), "fallback").unwrap();
    assert_eq!(log.stream_id, "1073833457");

    let request = PipelineRequest {
        rank_by: vec!["chat_rate".into()],
        limit: Some(3),
        ..PipelineRequest::default()
    };
    let report = run_pipeline(&log.stream_id, log.events, &request, &settings(1.0), scorer()).unwrap();

    assert_eq!(report.clips.len(), 3);
    let best = &report.clips[0];
    // Any window starting before 540 s ends before the burst begins.
    assert!(best.start_time >= 540.0 && best.start_time <= 660.0, "{best:?}");
    assert!(report.clips.iter().all(|c| c.start_time <= c.end_time));
    assert_eq!(report.metrics.families.len(), 1);
    assert_eq!(report.metrics.events, 350);
    assert!(report.skipped_windows.is_empty());

    let json = serde_json::to_value(&report.clips).unwrap();
    assert!(json[0].get("startTime").is_some());
    assert!(json[0].get("key").is_none());
}

#[test]
fn merged_families_rank_lexicographically() {
    let log = parse_chat_log(&chat_log_json(11), "fallback").unwrap();
    let request = PipelineRequest {
        families: vec![FamilyKind::Emoticons, FamilyKind::WordVolume, FamilyKind::Sentiment],
        rank_by: vec!["num_emo".into(), "positive".into()],
        limit: None,
        consensus: None,
    };
    let report = run_pipeline(&log.stream_id, log.events, &request, &settings(2.0), scorer()).unwrap();

    let table = &report.result.table;
    assert_eq!(table.len(), report.metrics.windows);
    assert!(table.has_column("emoji_user_ratio"));
    assert!(table.has_column("num_words"));
    assert!(table.has_column("overall"));
    // num_emo from both families agrees, so it appears once.
    assert_eq!(table.columns.iter().filter(|c| *c == "num_emo").count(), 1);

    let emotes: Vec<f64> = table.rows.iter().map(|r| r.number("num_emo").unwrap()).collect();
    assert!(emotes.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn concurrent_run_matches_sequential() {
    let json = chat_log_json(3);
    let families = vec![
        FamilyKind::UniqueUsers,
        FamilyKind::ChatRate,
        FamilyKind::WordVolume,
        FamilyKind::Emoticons,
        FamilyKind::Sentiment,
    ];
    let request = PipelineRequest {
        families: families.clone(),
        rank_by: vec!["chunk_unique_users".into(), "chat_rate".into()],
        limit: Some(5),
        consensus: None,
    };
    let settings = settings(0.5);

    let log = parse_chat_log(&json, "vod").unwrap();
    let sequential = run_pipeline(&log.stream_id, log.events, &request, &settings, scorer()).unwrap();

    let log = parse_chat_log(&json, "vod").unwrap();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let concurrent = runtime
        .block_on(run_pipeline_concurrent(&log.stream_id, log.events, &request, &settings, scorer()))
        .unwrap();

    assert_eq!(sequential.clips.len(), 5);
    assert_eq!(sequential.clips, concurrent.clips);
    assert_eq!(sequential.result, concurrent.result);
    assert_ne!(sequential.run_id, concurrent.run_id);
    assert_eq!(concurrent.metrics.merged_rows, sequential.metrics.merged_rows);
    assert!(concurrent.metrics.merged_rows > concurrent.clips.len());
    let recorded: Vec<_> = concurrent.metrics.families.iter().map(|f| f.family.as_str()).collect();
    assert_eq!(
        recorded,
        families.iter().map(|k| k.name()).collect::<Vec<_>>()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_run_reports_metrics() {
    let log = parse_chat_log(&chat_log_json(5), "vod").unwrap();
    let request = PipelineRequest::rank_by("emoji_user_ratio");
    let report = run_pipeline_concurrent(&log.stream_id, log.events, &request, &settings(2.0), scorer())
        .await
        .unwrap();

    assert_eq!(report.metrics.families.len(), 1);
    assert_eq!(report.metrics.families[0].family, "emoticons");
    assert_eq!(report.metrics.merged_rows, report.metrics.windows);
    assert_eq!(report.clips.len(), report.metrics.windows);
}

#[test]
fn one_hour_of_chat_gives_thirty_two_minute_windows() {
    let events: Vec<ChatEvent> = (0..3600)
        .map(|s| ChatEvent::new(t0() + Duration::seconds(s), format!("{}", s % 50), "hi"))
        .collect();
    let mut settings = settings(2.0);
    settings.chunking.boundary = WindowBoundary::HalfOpen;

    let report = run_pipeline("vod", events, &PipelineRequest::rank_by("chat_rate"), &settings, scorer()).unwrap();
    assert_eq!(report.metrics.coarse_partitions, 1);
    assert_eq!(report.metrics.windows, 30);
    assert_eq!(report.clips.len(), 30);
    for clip in &report.clips {
        assert_eq!(clip.end_time - clip.start_time, 119.0);
    }
    // Equal rates keep window order.
    assert_eq!(report.clips[0].start_time, 0.0);
}

#[test]
fn single_event_stream() {
    let events = vec![ChatEvent::new(t0(), "1", "first")];
    let report = run_pipeline("vod", events, &PipelineRequest::rank_by("chat_rate"), &settings(2.0), scorer()).unwrap();

    assert_eq!(report.metrics.coarse_partitions, 1);
    assert_eq!(report.metrics.windows, 1);
    assert_eq!(report.metrics.degenerate_windows, 1);
    assert_eq!(report.clips[0].start_time, 0.0);
    assert_eq!(report.clips[0].end_time, 0.0);
    assert_eq!(report.result.table.rows[0].number("chat_rate"), Some(60.0));
}

fn quiet_then_busy() -> Vec<ChatEvent> {
    let mut events = vec![ChatEvent::new(t0(), "0", "hello")];
    events.extend((300..350).map(|s| ChatEvent::new(t0() + Duration::seconds(s), format!("{}", s % 7), "hype")));
    events
}

#[test]
fn request_without_rank_column_is_rejected() {
    let request = PipelineRequest::default().with_families(vec![FamilyKind::ChatRate]);
    let err = run_pipeline("vod", quiet_then_busy(), &request, &settings(2.0), scorer()).unwrap_err();
    match err {
        ChunkError::InvalidStatisticSelector { requested, available } => {
            assert!(requested.is_empty());
            assert!(available.contains(&"chat_rate".to_string()));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn busy_window_outranks_lone_event() {
    let request = PipelineRequest::rank_by("chat_rate").with_families(vec![FamilyKind::ChatRate]);
    let report = run_pipeline("vod", quiet_then_busy(), &request, &settings(2.0), scorer()).unwrap();

    let starts: Vec<f64> = report.clips.iter().map(|clip| clip.start_time).collect();
    assert_eq!(starts, vec![300.0, 0.0]);
    assert!(report.result.table.rows[0].number("chat_rate").unwrap() > 60.0);
}

#[test]
fn empty_stream_is_an_error() {
    let log = parse_chat_log("[]", "vod").unwrap();
    let err = run_pipeline(&log.stream_id, log.events, &PipelineRequest::rank_by("chat_rate"), &settings(2.0), scorer())
        .unwrap_err();
    assert!(matches!(err, ChunkError::EmptyStream));
}

#[test]
fn malformed_windows_are_counted_not_fatal() {
    let mut events: Vec<ChatEvent> = (0..20)
        .map(|i| ChatEvent::new(t0() + Duration::seconds(i * 30), "1", "Kappa"))
        .collect();
    events[10] = events[10].clone().with_emoticons(vec![EmoteOccurrence {
        emote_id: "25".into(),
        begin: 4,
        end: 0,
    }]);

    let report = run_pipeline(
        "vod",
        events,
        &PipelineRequest::rank_by("num_emo").with_families(vec![FamilyKind::Emoticons]),
        &settings(1.0),
        scorer(),
    )
    .unwrap();

    assert_eq!(report.skipped_windows.len(), 1);
    assert_eq!(report.skipped_windows[0].family, "emoticons");
    assert_eq!(report.metrics.skipped_windows(), 1);
    assert_eq!(report.clips.len(), report.metrics.windows - 1);
}

#[test]
fn filtering_family_shrinks_the_merge() {
    let mut events = Vec::new();
    // "regular" talks a lot in the first window only.
    for i in 0..8 {
        events.push(ChatEvent::new(t0() + Duration::seconds(i), "regular", "long message with many words"));
    }
    for i in 0..30 {
        events.push(ChatEvent::new(t0() + Duration::seconds(200 + i * 20), format!("{i}"), "hi"));
    }

    let request = PipelineRequest {
        families: vec![FamilyKind::ChatRate, FamilyKind::TopUsers],
        rank_by: vec!["num_top_user_appears".into()],
        ..PipelineRequest::default()
    };
    let report = run_pipeline("vod", events, &request, &settings(2.0), scorer()).unwrap();

    assert!(report.metrics.windows > 1);
    assert_eq!(report.metrics.merged_rows, 1);
    assert_eq!(report.clips.len(), 1);
    assert_eq!(report.clips[0].start_time, 0.0);
}

#[test]
fn consensus_keeps_windows_both_columns_rank_highly() {
    // One message every 10 s, plus 60 emote messages between 300 s and 330 s.
    let mut events: Vec<ChatEvent> = (0..60)
        .map(|i| ChatEvent::new(t0() + Duration::seconds(i * 10), format!("{i}"), "hello"))
        .collect();
    for i in 0..60 {
        let at = t0() + Duration::milliseconds(300_000 + i * 500);
        events.push(
            ChatEvent::new(at, format!("fan{i}"), "Kappa").with_emoticons(vec![EmoteOccurrence {
                emote_id: "25".into(),
                begin: 0,
                end: 4,
            }]),
        );
    }

    let request = PipelineRequest {
        families: vec![FamilyKind::ChatRate, FamilyKind::Emoticons],
        rank_by: vec!["chat_rate".into(), "num_emo".into()],
        limit: Some(2),
        consensus: Some(2),
    };
    let report = run_pipeline("vod", events, &request, &settings(1.0), scorer()).unwrap();

    // chat_rate's runner-up is the short final window, num_emo's is the
    // first window; only the burst window is in both.
    assert_eq!(report.clips.len(), 1);
    assert_eq!(report.clips[0].start_time, 280.0);
    assert_eq!(report.clips[0].end_time, 340.0);
    assert_eq!(report.result.table.len(), 1);
}

#[test]
fn unknown_rank_column_lists_alternatives() {
    let events = vec![ChatEvent::new(t0(), "1", "hi")];
    let request = PipelineRequest {
        families: vec![FamilyKind::ChatRate],
        rank_by: vec!["num_emo".into()],
        ..PipelineRequest::default()
    };
    match run_pipeline("vod", events, &request, &settings(2.0), scorer()) {
        Err(ChunkError::InvalidStatisticSelector { requested, available }) => {
            assert_eq!(requested, "num_emo");
            assert_eq!(available, vec!["chat_rate", "mean_chat_rate"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}
