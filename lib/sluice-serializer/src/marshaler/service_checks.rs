use protobuf::CodedOutputStream;
use sluice_model::ServiceCheck;
use snafu::ResultExt as _;

use super::{
    split_by_halving,
    wire::{encode_message, write_message, write_non_empty_string, write_repeated_string},
    Json, MarshalError, Marshaler, Protobuf, TelemetryKind,
};

const KIND: TelemetryKind = TelemetryKind::ServiceChecks;

const PAYLOAD_SERVICE_CHECKS_FIELD_NUMBER: u32 = 1;
const PAYLOAD_HOSTNAME_FIELD_NUMBER: u32 = 3;

const SERVICE_CHECK_NAME_FIELD_NUMBER: u32 = 1;
const SERVICE_CHECK_HOST_FIELD_NUMBER: u32 = 2;
const SERVICE_CHECK_TS_FIELD_NUMBER: u32 = 3;
const SERVICE_CHECK_STATUS_FIELD_NUMBER: u32 = 4;
const SERVICE_CHECK_MESSAGE_FIELD_NUMBER: u32 = 5;
const SERVICE_CHECK_TAGS_FIELD_NUMBER: u32 = 6;

/// A batch of service checks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceChecks {
    hostname: String,
    checks: Vec<ServiceCheck>,
}

impl ServiceChecks {
    /// Creates a batch from the given service checks, reported on behalf of `hostname`.
    pub fn new(hostname: impl Into<String>, checks: Vec<ServiceCheck>) -> Self {
        Self {
            hostname: hostname.into(),
            checks,
        }
    }

    /// Returns the hostname the batch is reported on behalf of.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the service checks in the batch.
    pub fn checks(&self) -> &[ServiceCheck] {
        &self.checks
    }
}

impl Marshaler for ServiceChecks {
    fn item_count(&self) -> usize {
        self.checks.len()
    }

    fn marshal_json(&self) -> Result<Vec<u8>, MarshalError> {
        encode_json(&self.checks)
    }

    fn marshal_protobuf(&self) -> Result<Vec<u8>, MarshalError> {
        encode_message(|os| {
            for check in &self.checks {
                write_message(os, PAYLOAD_SERVICE_CHECKS_FIELD_NUMBER, |cs| write_service_check(cs, check))?;
            }
            write_non_empty_string(os, PAYLOAD_HOSTNAME_FIELD_NUMBER, &self.hostname)
        })
        .context(Protobuf { kind: KIND })
    }

    fn split(&self, max_chunk_size: usize) -> Result<Vec<Self>, MarshalError> {
        let chunks = split_by_halving(KIND, &self.checks, max_chunk_size, encode_json)?;

        Ok(chunks
            .into_iter()
            .map(|checks| Self::new(self.hostname.clone(), checks))
            .collect())
    }
}

fn encode_json(checks: &[ServiceCheck]) -> Result<Vec<u8>, MarshalError> {
    serde_json::to_vec(checks).context(Json { kind: KIND })
}

fn write_service_check(os: &mut CodedOutputStream<'_>, check: &ServiceCheck) -> Result<(), protobuf::Error> {
    os.write_string(SERVICE_CHECK_NAME_FIELD_NUMBER, check.name())?;
    write_non_empty_string(os, SERVICE_CHECK_HOST_FIELD_NUMBER, check.hostname().unwrap_or_default())?;
    if let Some(timestamp) = check.timestamp() {
        os.write_int64(SERVICE_CHECK_TS_FIELD_NUMBER, timestamp)?;
    }
    os.write_int32(SERVICE_CHECK_STATUS_FIELD_NUMBER, i32::from(check.status().as_u8()))?;
    write_non_empty_string(
        os,
        SERVICE_CHECK_MESSAGE_FIELD_NUMBER,
        check.message().unwrap_or_default(),
    )?;
    write_repeated_string(os, SERVICE_CHECK_TAGS_FIELD_NUMBER, check.tags())
}
