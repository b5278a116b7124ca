//! Realtime event pushed by the server over the WebSocket connection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type prefix shared by every event concerning the feature aggregate
pub const FEATURE_EVENT_PREFIX: &str = "feature_";

/// Entity name of the feature aggregate itself
pub const FEATURE_ENTITY: &str = "feature";

/// Entity name of pending change requests
pub const PENDING_CHANGE_ENTITY: &str = "pending_change";

/// A domain event decoded from one inbound text frame.
///
/// Every field is an opaque string. Missing fields decode as empty strings so
/// that a partially populated frame is still routed by whatever it does carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeEvent {
    /// Component that emitted the event
    pub source: String,

    /// Event type, e.g. `feature_updated`
    #[serde(rename = "type")]
    pub event_type: String,

    /// ISO-8601 emission time
    pub timestamp: String,

    pub project_id: String,

    /// Environment key the change applies to
    pub environment: String,

    /// Changed entity kind, e.g. `feature` or `pending_change`
    pub entity: String,

    pub entity_id: String,

    pub action: String,
}

impl RealtimeEvent {
    /// Decode an event from a JSON text frame
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Whether the type carries the `feature_` naming convention
    pub fn is_feature_domain(&self) -> bool {
        self.event_type.starts_with(FEATURE_EVENT_PREFIX)
    }

    /// Whether the event addresses a single feature by `entity_id`
    pub fn targets_feature(&self) -> bool {
        self.entity == FEATURE_ENTITY
    }

    /// Parsed timestamp, if the server sent a valid RFC 3339 value
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_event() {
        let json = r#"{
            "source": "api",
            "type": "feature_updated",
            "timestamp": "2024-05-01T12:30:00Z",
            "project_id": "P1",
            "environment": "E1",
            "entity": "feature",
            "entity_id": "F1",
            "action": "update"
        }"#;

        let event = RealtimeEvent::from_json(json).unwrap();
        assert_eq!(event.event_type, "feature_updated");
        assert_eq!(event.entity_id, "F1");
        assert!(event.is_feature_domain());
        assert!(event.targets_feature());
        assert_eq!(event.occurred_at().unwrap().timestamp(), 1714566600);
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let event = RealtimeEvent::from_json(r#"{"type":"change_requested","entity":"pending_change"}"#)
            .unwrap();
        assert_eq!(event.project_id, "");
        assert!(!event.is_feature_domain());
        assert!(event.occurred_at().is_none());
    }

    #[test]
    fn test_non_object_frame_is_rejected() {
        assert!(RealtimeEvent::from_json("not json").is_err());
        assert!(RealtimeEvent::from_json("[1,2,3]").is_err());
    }

    #[test]
    fn test_type_field_serializes_as_type() {
        let event = RealtimeEvent {
            event_type: "feature_deleted".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"feature_deleted""#));
    }
}
