use fabrique_core::{FileSink, Publisher};
use fabrique_replay::{ReplayConfig, ReplayEngine, SourceError, open_source};
use std::path::Path;

const CSV: &str = "timestamp,pseudo_player_id,amount,game\n\
2024-01-01T10:00:00Z,p1,10.00,slots\n\
2024-01-01T10:00:01Z,p2,25.50,poker\n\
2024-01-01T10:00:02Z,p1,5,slots\n\
2024-01-01T10:00:03Z,p3,100,roulette\n";

fn config(dir: &Path) -> ReplayConfig {
    ReplayConfig {
        state_file: dir.join("state.json"),
        delay_ms: 0,
        ..Default::default()
    }
}

fn replay(
    source: &Path,
    out: &Path,
    config: ReplayConfig,
    limit: Option<u64>,
    reset: bool,
) -> fabrique_replay::ReplaySummary {
    let source = open_source(source, ',').unwrap();
    let sink = FileSink::new(out).unwrap();
    let mut engine = ReplayEngine::new(source, sink, config).unwrap().with_seed(8);
    engine.replay(limit, reset).unwrap()
}

#[test]
fn test_resume_skips_replayed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("events.csv");
    let out = dir.path().join("out.json");
    std::fs::write(&csv, CSV).unwrap();

    let first = replay(&csv, &out, config(dir.path()), Some(2), false);
    assert_eq!(first.sent, 2);
    assert_eq!(first.last_timestamp.as_deref(), Some("2024-01-01T10:00:01Z"));

    let second = replay(&csv, &out, config(dir.path()), None, false);
    assert_eq!(second.sent, 2);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.events_sent_total, 4);

    // Every source row landed exactly once
    let stored = FileSink::new(&out).unwrap().load();
    let stamps: Vec<&str> = stored.iter().filter_map(|e| e["timestamp"].as_str()).collect();
    assert_eq!(
        stamps,
        [
            "2024-01-01T10:00:00Z",
            "2024-01-01T10:00:01Z",
            "2024-01-01T10:00:02Z",
            "2024-01-01T10:00:03Z"
        ]
    );

    let third = replay(&csv, &out, config(dir.path()), None, false);
    assert_eq!(third.sent, 0);
    assert_eq!(third.skipped, 4);
}

#[test]
fn test_reset_replays_everything() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("events.csv");
    let out = dir.path().join("out.json");
    std::fs::write(&csv, CSV).unwrap();

    replay(&csv, &out, config(dir.path()), None, false);
    let again = replay(&csv, &out, config(dir.path()), None, true);
    assert_eq!(again.sent, 4);
    assert_eq!(again.events_sent_total, 4);
    assert_eq!(FileSink::new(&out).unwrap().load().len(), 8);
}

#[test]
fn test_corrupt_checkpoint_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("events.csv");
    let out = dir.path().join("out.json");
    std::fs::write(&csv, CSV).unwrap();
    std::fs::write(dir.path().join("state.json"), "{ broken").unwrap();

    let summary = replay(&csv, &out, config(dir.path()), None, false);
    assert_eq!(summary.sent, 4);
    assert_eq!(summary.last_timestamp.as_deref(), Some("2024-01-01T10:00:03Z"));
}

#[test]
fn test_jitter_bounds_on_replayed_amounts() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("events.csv");
    let out = dir.path().join("out.json");
    std::fs::write(&csv, CSV).unwrap();

    let cfg = ReplayConfig {
        jitter: true,
        jitter_fields: vec!["amount".to_string()],
        jitter_percentage: 0.2,
        ..config(dir.path())
    };
    replay(&csv, &out, cfg, None, false);

    let originals = [10.0, 25.5, 5.0, 100.0];
    let stored = FileSink::new(&out).unwrap().load();
    for (event, original) in stored.iter().zip(originals) {
        let amount = event["amount"].as_f64().unwrap();
        assert!(amount >= original * 0.8 - 1e-9 && amount <= original * 1.2 + 1e-9);
        assert!(event["game"].is_string());
    }
}

#[test]
fn test_replays_file_sink_output() {
    let dir = tempfile::tempdir().unwrap();
    let captured = dir.path().join("captured.json");
    let out = dir.path().join("out.json");

    let mut sink = FileSink::new(&captured).unwrap();
    let events: Vec<fabrique_core::Event> = (0..3)
        .map(|i| {
            fabrique_core::Event::builder(
                fabrique_core::EventKind::Deposit,
                format!("2024-02-0{}T00:00:00Z", i + 1),
                "normal_0_abcd1234",
                "normal",
            )
            .money("amount", 20.0)
            .balance(120.0)
            .build()
        })
        .collect();
    assert_eq!(sink.publish(&events, None), 3);

    let cfg = ReplayConfig {
        partition_key_field: Some("player_id".to_string()),
        ..config(dir.path())
    };
    let summary = replay(&captured, &out, cfg, None, false);
    assert_eq!(summary.sent, 3);

    let stored = FileSink::new(&out).unwrap().load();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0]["event_type"], "deposit");
    assert_eq!(stored[2]["amount"], 20.0);
}

#[test]
fn test_missing_source_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        open_source(dir.path().join("nope.csv"), ','),
        Err(SourceError::Open { .. })
    ));
    assert!(matches!(
        open_source(dir.path().join("nope.json"), ','),
        Err(SourceError::Open { .. })
    ));
}
