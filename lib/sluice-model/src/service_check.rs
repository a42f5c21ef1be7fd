//! Service checks.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Service status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CheckStatus {
    /// The service is operating normally.
    #[default]
    Ok,

    /// The service is in a warning state.
    Warning,

    /// The service is in a critical state.
    Critical,

    /// The service is in an unknown state.
    Unknown,
}

impl CheckStatus {
    /// Returns the integer representation of this status.
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }
}

/// Error returned when an integer does not map to a known check status.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidCheckStatus(pub u8);

impl fmt::Display for InvalidCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid check status {} (expected 0-3)", self.0)
    }
}

impl std::error::Error for InvalidCheckStatus {}

impl TryFrom<u8> for CheckStatus {
    type Error = InvalidCheckStatus;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Warning),
            2 => Ok(Self::Critical),
            3 => Ok(Self::Unknown),
            other => Err(InvalidCheckStatus(other)),
        }
    }
}

impl Serialize for CheckStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for CheckStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u8::deserialize(deserializer)?;
        CheckStatus::try_from(raw).map_err(de::Error::custom)
    }
}

/// A service check.
///
/// Service checks represent the status of a service at a particular point in time. Checks are simplistic, with a basic
/// message, status (OK vs warning vs critical, etc), timestamp, and tags.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ServiceCheck {
    #[serde(rename = "check")]
    name: String,

    #[serde(rename = "host_name", default, skip_serializing_if = "String::is_empty")]
    hostname: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,

    status: CheckStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    message: String,

    #[serde(default)]
    tags: Vec<String>,
}

impl ServiceCheck {
    /// Creates a `ServiceCheck` from the given name and status.
    pub fn new(name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
            ..Default::default()
        }
    }

    /// Returns the name of the check.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the status of the check.
    pub fn status(&self) -> CheckStatus {
        self.status
    }

    /// Returns the timestamp of the check, in seconds since the Unix epoch.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Returns the host where the check originated from.
    pub fn hostname(&self) -> Option<&str> {
        if self.hostname.is_empty() {
            None
        } else {
            Some(&self.hostname)
        }
    }

    /// Returns the message associated with the check.
    pub fn message(&self) -> Option<&str> {
        if self.message.is_empty() {
            None
        } else {
            Some(&self.message)
        }
    }

    /// Returns the tags associated with the check.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Set the timestamp, in seconds since the Unix epoch.
    pub fn with_timestamp(mut self, timestamp: impl Into<Option<i64>>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Set the hostname where the service check originated from.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
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
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn status_as_integer() {
        let check = ServiceCheck::new("db.can_connect", CheckStatus::Critical)
            .with_hostname("db-01")
            .with_timestamp(1_700_000_000)
            .with_message("connection refused")
            .with_tags(["db:orders"]);

        assert_eq!(
            serde_json::to_value(&check).unwrap(),
            json!({
                "check": "db.can_connect",
                "host_name": "db-01",
                "timestamp": 1_700_000_000i64,
                "status": 2,
                "message": "connection refused",
                "tags": ["db:orders"],
            })
        );
    }

    #[test]
    fn tags_always_present() {
        let check = ServiceCheck::new("ntp.in_sync", CheckStatus::Ok);
        assert_eq!(
            serde_json::to_value(&check).unwrap(),
            json!({ "check": "ntp.in_sync", "status": 0, "tags": [] })
        );
    }

    #[test]
    fn unknown_status_rejected() {
        let result = serde_json::from_value::<ServiceCheck>(json!({ "check": "x", "status": 7 }));
        assert!(result.is_err());

        assert_eq!(CheckStatus::try_from(7), Err(InvalidCheckStatus(7)));
        assert_eq!(CheckStatus::try_from(3), Ok(CheckStatus::Unknown));
    }
}
