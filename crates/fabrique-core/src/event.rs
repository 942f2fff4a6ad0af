//! Event Record Model
//!
//! Every simulated or replayed activity is an [`Event`]: a name plus a flat
//! key-value payload. Serialization emits the payload only, so the stored
//! JSON is one flat object per event.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

// ============================================================================
// Field names shared by every producer
// ============================================================================

pub const FIELD_EVENT_TYPE: &str = "event_type";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_PLAYER_ID: &str = "player_id";
pub const FIELD_PROFILE_TYPE: &str = "profile_type";
pub const FIELD_BALANCE: &str = "balance";

/// Default partition key for batched transmission
pub const DEFAULT_PARTITION_KEY_FIELD: &str = FIELD_PLAYER_ID;

/// Kinds of events produced by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Deposit,
    Withdrawal,
    GamePlay,
    GameAttempt,
    BonusClaim,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Deposit => "deposit",
            EventKind::Withdrawal => "withdrawal",
            EventKind::GamePlay => "game_play",
            EventKind::GameAttempt => "game_attempt",
            EventKind::BonusClaim => "bonus_claim",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(EventKind::Deposit),
            "withdrawal" => Some(EventKind::Withdrawal),
            "game_play" => Some(EventKind::GamePlay),
            "game_attempt" => Some(EventKind::GameAttempt),
            "bonus_claim" => Some(EventKind::BonusClaim),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named record with a flat payload
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    payload: Map<String, Value>,
}

impl Event {
    /// Wrap an arbitrary row (used by replay sources)
    pub fn from_row(name: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Start a simulator event carrying the common fields
    pub fn builder(
        kind: EventKind,
        timestamp: impl Into<String>,
        player_id: &str,
        profile_type: &str,
    ) -> EventBuilder {
        let mut payload = Map::new();
        payload.insert(FIELD_EVENT_TYPE.to_string(), Value::from(kind.as_str()));
        payload.insert(FIELD_TIMESTAMP.to_string(), Value::from(timestamp.into()));
        payload.insert(FIELD_PLAYER_ID.to_string(), Value::from(player_id));
        payload.insert(FIELD_PROFILE_TYPE.to_string(), Value::from(profile_type));
        EventBuilder {
            name: kind.as_str().to_string(),
            payload,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Get field value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn kind(&self) -> Option<EventKind> {
        self.get_str(FIELD_EVENT_TYPE).and_then(EventKind::parse)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get_str(FIELD_TIMESTAMP)
    }

    pub fn player_id(&self) -> Option<&str> {
        self.get_str(FIELD_PLAYER_ID)
    }

    /// String form of `field`, used to route the event to a partition.
    /// Missing fields map to the empty key; non-string values use their JSON text.
    pub fn partition_key(&self, field: &str) -> String {
        match self.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Encode the flat payload as compact JSON
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.payload)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.payload.serialize(serializer)
    }
}

/// Incremental construction of simulator events
pub struct EventBuilder {
    name: String,
    payload: Map<String, Value>,
}

impl EventBuilder {
    pub fn string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.payload
            .insert(key.to_string(), Value::from(value.into()));
        self
    }

    pub fn money(mut self, key: &str, value: f64) -> Self {
        self.payload.insert(key.to_string(), money_value(value));
        self
    }

    pub fn balance(self, value: f64) -> Self {
        self.money(FIELD_BALANCE, value)
    }

    pub fn build(self) -> Event {
        Event {
            name: self.name,
            payload: self.payload,
        }
    }
}

/// ISO-8601 UTC timestamp with microsecond precision
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Round a monetary amount to currency precision
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn money_value(value: f64) -> Value {
    // Non-finite values are not representable in JSON
    serde_json::Number::from_f64(round_money(value))
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit() -> Event {
        Event::builder(EventKind::Deposit, "2026-01-01T00:00:00Z", "normal_0_ab", "normal")
            .money("amount", 12.346)
            .balance(100.0)
            .build()
    }

    #[test]
    fn test_builder_sets_common_fields() {
        let event = deposit();
        assert_eq!(event.name(), "deposit");
        assert_eq!(event.kind(), Some(EventKind::Deposit));
        assert_eq!(event.player_id(), Some("normal_0_ab"));
        assert_eq!(event.get_str(FIELD_PROFILE_TYPE), Some("normal"));
        assert_eq!(event.get_f64("amount"), Some(12.35));
    }

    #[test]
    fn test_serializes_flat_payload() {
        let json = serde_json::to_value(deposit()).unwrap();
        assert_eq!(json["event_type"], "deposit");
        assert_eq!(json["balance"], 100.0);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_partition_key_forms() {
        let mut row = Map::new();
        row.insert("id".to_string(), Value::from(42));
        row.insert("name".to_string(), Value::from("alice"));
        let event = Event::from_row("row", row);

        assert_eq!(event.partition_key("name"), "alice");
        assert_eq!(event.partition_key("id"), "42");
        assert_eq!(event.partition_key("missing"), "");
    }

    #[test]
    fn test_timestamps_sort_chronologically() {
        let early = format_timestamp(DateTime::from_timestamp(1_700_000_000, 5_000).unwrap());
        let late = format_timestamp(DateTime::from_timestamp(1_700_000_001, 0).unwrap());
        assert_eq!(early, "2023-11-14T22:13:20.000005Z");
        assert!(early < late);
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(1.005_1), 1.01);
        assert_eq!(round_money(2.0), 2.0);
        assert_eq!(round_money(0.004), 0.0);
    }
}
