//! Host metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Host metadata.
///
/// Describes the host the agent runs on. Host tags are grouped by the source that provided them (e.g. `system`,
/// `google cloud platform`), and `meta` holds free-form key/value pairs such as the various host aliases.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct HostMetadata {
    #[serde(default, rename = "hostname")]
    hostname: String,

    #[serde(default, rename = "internalHostname")]
    internal_hostname: String,

    #[serde(default, rename = "agentVersion")]
    agent_version: String,

    #[serde(default)]
    uuid: String,

    #[serde(default)]
    os: String,

    #[serde(default, rename = "host-tags")]
    host_tags: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    meta: BTreeMap<String, String>,
}

impl HostMetadata {
    /// Creates a `HostMetadata` for the given hostname.
    ///
    /// The internal hostname defaults to the hostname.
    pub fn new(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            internal_hostname: hostname.clone(),
            hostname,
            ..Default::default()
        }
    }

    /// Returns the hostname.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the internal hostname.
    pub fn internal_hostname(&self) -> &str {
        &self.internal_hostname
    }

    /// Returns the agent version.
    pub fn agent_version(&self) -> &str {
        &self.agent_version
    }

    /// Returns the host UUID.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Returns the operating system.
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Returns the host tags, grouped by source.
    pub fn host_tags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.host_tags
    }

    /// Returns the free-form metadata.
    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    /// Set the internal hostname.
    pub fn with_internal_hostname(mut self, internal_hostname: impl Into<String>) -> Self {
        self.internal_hostname = internal_hostname.into();
        self
    }

    /// Set the agent version.
    pub fn with_agent_version(mut self, agent_version: impl Into<String>) -> Self {
        self.agent_version = agent_version.into();
        self
    }

    /// Set the host UUID.
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Set the operating system.
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Adds host tags under the given group.
    ///
    /// Tags are appended to any tags already present in the group.
    pub fn with_host_tags<I, T>(mut self, group: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.host_tags
            .entry(group.into())
            .or_default()
            .extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets a free-form metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}
