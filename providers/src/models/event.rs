//! Cluster warning event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::Labels;

/// Reference to the object an event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    /// Object kind, e.g. `Pod`.
    #[serde(default)]
    pub kind: String,
    /// Namespace of the object (empty for cluster-scoped objects).
    #[serde(default)]
    pub namespace: String,
    /// Object name.
    #[serde(default)]
    pub name: String,
}

/// A warning event read from a cluster backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningEvent {
    /// Machine-readable reason code, e.g. `BackOff`.
    pub reason: String,

    /// When the event was last observed. Events without one never pass the
    /// recency filter.
    pub last_timestamp: Option<DateTime<Utc>>,

    /// The object this event is about.
    pub involved_object: ObjectReference,

    /// Event type (`Warning`, `Normal`).
    #[serde(default)]
    pub event_type: String,

    /// Human-readable description.
    #[serde(default)]
    pub message: String,

    /// Number of times the event has occurred.
    #[serde(default)]
    pub count: i32,
}

impl WarningEvent {
    /// Creates an event with the given reason and last timestamp.
    #[must_use]
    pub fn new(reason: impl Into<String>, last_timestamp: DateTime<Utc>) -> Self {
        Self {
            reason: reason.into(),
            last_timestamp: Some(last_timestamp),
            involved_object: ObjectReference::default(),
            event_type: "Warning".to_string(),
            message: String::new(),
            count: 1,
        }
    }

    /// Sets the involved object.
    #[must_use]
    pub fn with_object(
        mut self,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.involved_object = ObjectReference {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        };
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns true if this event has the given reason and was last seen
    /// strictly after `cutoff`.
    #[must_use]
    pub fn matches(&self, reason: &str, cutoff: DateTime<Utc>) -> bool {
        self.reason == reason && self.last_timestamp.is_some_and(|ts| ts > cutoff)
    }

    /// Returns the label set identifying the event's origin.
    #[must_use]
    pub fn labels(&self) -> Labels {
        Labels::from([
            ("reason".to_string(), self.reason.clone().into()),
            ("kind".to_string(), self.involved_object.kind.clone().into()),
            (
                "namespace".to_string(),
                self.involved_object.namespace.clone().into(),
            ),
            ("name".to_string(), self.involved_object.name.clone().into()),
        ])
    }
}
