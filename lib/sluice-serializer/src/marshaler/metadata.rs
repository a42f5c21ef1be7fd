use sluice_model::HostMetadata;
use snafu::ResultExt as _;

use super::{Json, MarshalError, Marshaler, Protocol, TelemetryKind};

const KIND: TelemetryKind = TelemetryKind::Metadata;

/// Host metadata payload.
///
/// Metadata is a single document: it only has a JSON form, and it is never split.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    host: HostMetadata,
}

impl Metadata {
    /// Creates a metadata payload from the given host metadata.
    pub fn new(host: HostMetadata) -> Self {
        Self { host }
    }

    /// Returns the host metadata.
    pub fn host(&self) -> &HostMetadata {
        &self.host
    }
}

impl From<HostMetadata> for Metadata {
    fn from(host: HostMetadata) -> Self {
        Self::new(host)
    }
}

impl Marshaler for Metadata {
    fn item_count(&self) -> usize {
        1
    }

    fn marshal_json(&self) -> Result<Vec<u8>, MarshalError> {
        serde_json::to_vec(&self.host).context(Json { kind: KIND })
    }

    fn marshal_protobuf(&self) -> Result<Vec<u8>, MarshalError> {
        Err(MarshalError::UnsupportedProtocol {
            kind: KIND,
            protocol: Protocol::Protobuf,
        })
    }

    fn split(&self, _max_chunk_size: usize) -> Result<Vec<Self>, MarshalError> {
        Ok(vec![self.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_protobuf_form() {
        let metadata = Metadata::new(HostMetadata::new("web-01"));
        let error = metadata.marshal_protobuf().unwrap_err();
        assert_eq!(error.to_string(), "metadata cannot be encoded as protobuf");
    }

    #[test]
    fn never_split() {
        let metadata = Metadata::new(HostMetadata::new("web-01").with_os("linux"));
        let chunks = metadata.split(1).unwrap();
        assert_eq!(chunks, vec![metadata]);
    }

    #[test]
    fn json_document() {
        let metadata = Metadata::new(HostMetadata::new("web-01"));
        let value: serde_json::Value = serde_json::from_slice(&metadata.marshal_json().unwrap()).unwrap();
        assert_eq!(value["internalHostname"], "web-01");
    }
}
