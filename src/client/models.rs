//! Wire shapes of the upstream monitor endpoints.
//!
//! Ticket and plate records are kept as raw JSON values here; the
//! adapters own the interpretation of their fields.

use serde::Deserialize;
use serde_json::Value;

/// Payload of the event-level endpoint: raw tickets, raw plate path
/// events and snapshot metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventSnapshot {
    #[serde(default)]
    pub tickets: Vec<Value>,
    #[serde(default)]
    pub paths: Vec<Value>,
    #[serde(default)]
    pub meta: SnapshotMeta,
}

impl EventSnapshot {
    /// A usable event payload must carry both record arrays; responses
    /// missing either are older server builds that only serve the
    /// aggregated shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if !obj.get("tickets").is_some_and(Value::is_array)
            || !obj.get("paths").is_some_and(Value::is_array)
        {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotMeta {
    /// Upstream collection errors, surfaced on the board verbatim.
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub source_paths: Option<Value>,
}

/// Payload of the legacy endpoint: jobs already aggregated server-side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySnapshot {
    #[serde(default)]
    pub queue: Vec<Value>,
    #[serde(default)]
    pub printed: Vec<Value>,
}

/// One upstream fetch, whichever endpoint answered.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Events(EventSnapshot),
    Aggregated(LegacySnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_payload_requires_both_arrays() {
        assert!(EventSnapshot::from_value(&json!({"tickets": [], "paths": []})).is_some());
        assert!(EventSnapshot::from_value(&json!({"tickets": []})).is_none());
        assert!(EventSnapshot::from_value(&json!({"queue": [], "printed": []})).is_none());
        assert!(EventSnapshot::from_value(&json!({"tickets": {}, "paths": []})).is_none());
    }

    #[test]
    fn test_meta_is_optional() {
        let snap = EventSnapshot::from_value(&json!({
            "tickets": [{"name": "T1"}],
            "paths": []
        }))
        .unwrap();
        assert_eq!(snap.tickets.len(), 1);
        assert!(snap.meta.errors.is_empty());
        assert_eq!(snap.meta.generated_at, None);
    }

    #[test]
    fn test_legacy_shape() {
        let snap: LegacySnapshot =
            serde_json::from_value(json!({"queue": [{"name": "A"}], "printed": []})).unwrap();
        assert_eq!(snap.queue.len(), 1);
    }
}
