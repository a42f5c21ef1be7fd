//! Events.

use serde::{Deserialize, Serialize};

/// Event priority.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// The event has normal priority.
    Normal,

    /// The event has low priority.
    Low,
}

impl Priority {
    /// Returns the string representation of the priority.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Event alert type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Indicates an informational event.
    Info,

    /// Indicates an error event.
    Error,

    /// Indicates a warning event.
    Warning,

    /// Indicates a successful event.
    Success,
}

impl AlertType {
    /// Returns the string representation of the alert type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Success => "success",
        }
    }
}

/// An event.
///
/// Events represent something notable that happened at a point in time: a deploy, a restart, a configuration change.
/// Only the title and text are required.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "msg_title")]
    title: String,

    #[serde(rename = "msg_text")]
    text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    host: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    alert_type: Option<AlertType>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    aggregation_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    source_type_name: String,
}

impl Event {
    /// Creates an `Event` from the given title and text.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Returns the title of the event.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the text of the event.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the timestamp of the event, in seconds since the Unix epoch.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Returns the priority of the event.
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// Returns the host the event originated from.
    pub fn hostname(&self) -> Option<&str> {
        if self.host.is_empty() {
            None
        } else {
            Some(&self.host)
        }
    }

    /// Returns the tags associated with the event.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the alert type of the event.
    pub fn alert_type(&self) -> Option<AlertType> {
        self.alert_type
    }

    /// Returns the aggregation key of the event.
    pub fn aggregation_key(&self) -> Option<&str> {
        if self.aggregation_key.is_empty() {
            None
        } else {
            Some(&self.aggregation_key)
        }
    }

    /// Returns the source type name of the event.
    pub fn source_type_name(&self) -> Option<&str> {
        if self.source_type_name.is_empty() {
            None
        } else {
            Some(&self.source_type_name)
        }
    }

    /// Set the timestamp, in seconds since the Unix epoch.
    pub fn with_timestamp(mut self, timestamp: impl Into<Option<i64>>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: impl Into<Option<Priority>>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Set the host the event originated from.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.host = hostname.into();
        self
    }

    /// Set the tags.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the alert type.
    pub fn with_alert_type(mut self, alert_type: impl Into<Option<AlertType>>) -> Self {
        self.alert_type = alert_type.into();
        self
    }

    /// Set the aggregation key.
    pub fn with_aggregation_key(mut self, aggregation_key: impl Into<String>) -> Self {
        self.aggregation_key = aggregation_key.into();
        self
    }

    /// Set the source type name.
    pub fn with_source_type_name(mut self, source_type_name: impl Into<String>) -> Self {
        self.source_type_name = source_type_name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn minimal_event_omits_unset_fields() {
        let event = Event::new("deploy", "shipped v1.2.3");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value, json!({ "msg_title": "deploy", "msg_text": "shipped v1.2.3" }));
    }

    #[test]
    fn full_event() {
        let event = Event::new("disk full", "/var is at 100%")
            .with_timestamp(1_700_000_000)
            .with_priority(Priority::Low)
            .with_hostname("web-01")
            .with_tags(["env:prod", "team:storage"])
            .with_alert_type(AlertType::Error)
            .with_aggregation_key("disk")
            .with_source_type_name("nagios");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({
                "msg_title": "disk full",
                "msg_text": "/var is at 100%",
                "timestamp": 1_700_000_000i64,
                "priority": "low",
                "host": "web-01",
                "tags": ["env:prod", "team:storage"],
                "alert_type": "error",
                "aggregation_key": "disk",
                "source_type_name": "nagios",
            })
        );

        let decoded: Event = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, event);
    }
}
