use fabrique_core::event::{Event, EventKind};
use fabrique_core::{Publisher, SinkConfig, SinkError, create_publisher};
use serde_json::Value;

fn deposit(player: &str, amount: f64) -> Event {
    Event::builder(EventKind::Deposit, "2026-02-01T12:00:00.000000Z", player, "normal")
        .money("amount", amount)
        .balance(amount)
        .build()
}

#[test]
fn file_sink_accumulates_batches_into_one_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/casino_events.json");
    let mut publisher = create_publisher(&SinkConfig::File { path: path.clone() }).unwrap();
    assert_eq!(publisher.name(), "file");

    assert_eq!(publisher.publish(&[deposit("p1", 10.0)], None), 1);
    assert_eq!(publisher.publish(&[deposit("p2", 20.0)], Some("player_id")), 1);

    let stored: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0]["player_id"], "p1");
    assert_eq!(stored[1]["amount"], 20.0);
}

#[test]
fn network_sink_requires_hub_name() {
    let config: SinkConfig = serde_json::from_str(
        r#"{"kind": "network", "endpoint": "https://example.servicebus.windows.net", "hub_name": ""}"#,
    )
    .unwrap();

    match create_publisher(&config) {
        Err(SinkError::MissingParameter(name)) => assert_eq!(name, "hub_name"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("publisher should not be created"),
    }
}
