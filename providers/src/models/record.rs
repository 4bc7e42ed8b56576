//! Record data model.
//!
//! Defines the normalized `Record` every provider emits, regardless of the
//! backend it talks to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A flat set of key/value labels.
pub type Labels = HashMap<String, serde_json::Value>;

/// The normalized output unit of a provider query.
///
/// A record carries the label sets that participated in the query and the
/// ordered message payloads matched for them.
///
/// # Example
///
/// ```
/// use providers::models::{Labels, Record};
/// use serde_json::json;
///
/// let labels = Labels::from([("app".to_string(), json!("api"))]);
/// let record = Record::new("loki")
///     .with_metric(labels)
///     .with_message(json!("connection refused"));
///
/// assert_eq!(record.provider_name, "loki");
/// assert_eq!(record.metric.len(), 1);
/// assert_eq!(record.message.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Tag identifying the backend that produced this record.
    pub provider_name: String,

    /// One label set per distinct stream or object observed.
    #[serde(default)]
    pub metric: Vec<Labels>,

    /// Message payloads, in backend order.
    #[serde(default)]
    pub message: Vec<serde_json::Value>,
}

impl Record {
    /// Creates an empty record for the given provider.
    #[must_use]
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            metric: Vec::new(),
            message: Vec::new(),
        }
    }

    /// Appends a label set.
    #[must_use]
    pub fn with_metric(mut self, labels: Labels) -> Self {
        self.metric.push(labels);
        self
    }

    /// Appends a message payload.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<serde_json::Value>) -> Self {
        self.message.push(message.into());
        self
    }

    /// Returns the key/value pairs shared by every label set in this record.
    ///
    /// A record without label sets has no common labels.
    ///
    /// # Example
    ///
    /// ```
    /// use providers::models::{Labels, Record};
    /// use serde_json::json;
    ///
    /// let record = Record::new("loki")
    ///     .with_metric(Labels::from([
    ///         ("app".to_string(), json!("api")),
    ///         ("pod".to_string(), json!("api-1")),
    ///     ]))
    ///     .with_metric(Labels::from([
    ///         ("app".to_string(), json!("api")),
    ///         ("pod".to_string(), json!("api-2")),
    ///     ]));
    ///
    /// let common = record.common_labels();
    /// assert_eq!(common.len(), 1);
    /// assert_eq!(common.get("app"), Some(&json!("api")));
    /// ```
    #[must_use]
    pub fn common_labels(&self) -> Labels {
        let Some((first, rest)) = self.metric.split_first() else {
            return Labels::new();
        };

        first
            .iter()
            .filter(|(key, value)| rest.iter().all(|labels| labels.get(*key) == Some(*value)))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Result of a provider query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    /// The normalized records.
    pub records: Vec<Record>,

    /// Total number of message entries across all records.
    pub count: usize,
}

impl QueryOutput {
    /// Creates an empty output (no records, count 0).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates an output whose count is derived from the records' messages.
    #[must_use]
    pub fn from_records(records: Vec<Record>) -> Self {
        let count = records.iter().map(|r| r.message.len()).sum();
        Self { records, count }
    }

    /// Returns true if no messages were matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
