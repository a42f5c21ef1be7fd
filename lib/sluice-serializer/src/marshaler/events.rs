use std::collections::BTreeMap;

use protobuf::CodedOutputStream;
use serde::Serialize;
use sluice_model::Event;
use snafu::ResultExt as _;

use super::{
    wire::{encode_message, write_message, write_non_empty_string, write_repeated_string},
    split_by_halving, Json, MarshalError, Marshaler, Protobuf, TelemetryKind,
};

const KIND: TelemetryKind = TelemetryKind::Events;

// Events without a source type are grouped under this name in the v1 payload.
const DEFAULT_SOURCE_TYPE_NAME: &str = "api";

const PAYLOAD_EVENTS_FIELD_NUMBER: u32 = 1;
const PAYLOAD_HOSTNAME_FIELD_NUMBER: u32 = 3;

const EVENT_TITLE_FIELD_NUMBER: u32 = 1;
const EVENT_TEXT_FIELD_NUMBER: u32 = 2;
const EVENT_TS_FIELD_NUMBER: u32 = 3;
const EVENT_PRIORITY_FIELD_NUMBER: u32 = 4;
const EVENT_HOST_FIELD_NUMBER: u32 = 5;
const EVENT_TAGS_FIELD_NUMBER: u32 = 6;
const EVENT_ALERT_TYPE_FIELD_NUMBER: u32 = 7;
const EVENT_AGGREGATION_KEY_FIELD_NUMBER: u32 = 8;
const EVENT_SOURCE_TYPE_NAME_FIELD_NUMBER: u32 = 9;

#[derive(Serialize)]
struct EventsPayload<'a> {
    #[serde(rename = "apiKey")]
    api_key: &'a str,

    events: BTreeMap<&'a str, Vec<&'a Event>>,

    #[serde(rename = "internalHostname")]
    internal_hostname: &'a str,
}

/// A batch of events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Events {
    hostname: String,
    events: Vec<Event>,
}

impl Events {
    /// Creates a batch from the given events, reported on behalf of `hostname`.
    pub fn new(hostname: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            hostname: hostname.into(),
            events,
        }
    }

    /// Returns the hostname the batch is reported on behalf of.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the events in the batch.
    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl Marshaler for Events {
    fn item_count(&self) -> usize {
        self.events.len()
    }

    fn marshal_json(&self) -> Result<Vec<u8>, MarshalError> {
        encode_json(&self.hostname, &self.events)
    }

    fn marshal_protobuf(&self) -> Result<Vec<u8>, MarshalError> {
        encode_message(|os| {
            for event in &self.events {
                write_message(os, PAYLOAD_EVENTS_FIELD_NUMBER, |es| write_event(es, event))?;
            }
            write_non_empty_string(os, PAYLOAD_HOSTNAME_FIELD_NUMBER, &self.hostname)
        })
        .context(Protobuf { kind: KIND })
    }

    fn split(&self, max_chunk_size: usize) -> Result<Vec<Self>, MarshalError> {
        let chunks = split_by_halving(KIND, &self.events, max_chunk_size, |events| {
            encode_json(&self.hostname, events)
        })?;

        Ok(chunks
            .into_iter()
            .map(|events| Self::new(self.hostname.clone(), events))
            .collect())
    }
}

fn encode_json(hostname: &str, events: &[Event]) -> Result<Vec<u8>, MarshalError> {
    let mut grouped = BTreeMap::<&str, Vec<&Event>>::new();
    for event in events {
        let source_type_name = event.source_type_name().unwrap_or(DEFAULT_SOURCE_TYPE_NAME);
        grouped.entry(source_type_name).or_default().push(event);
    }

    let payload = EventsPayload {
        api_key: "",
        events: grouped,
        internal_hostname: hostname,
    };
    serde_json::to_vec(&payload).context(Json { kind: KIND })
}

fn write_event(os: &mut CodedOutputStream<'_>, event: &Event) -> Result<(), protobuf::Error> {
    os.write_string(EVENT_TITLE_FIELD_NUMBER, event.title())?;
    os.write_string(EVENT_TEXT_FIELD_NUMBER, event.text())?;
    if let Some(timestamp) = event.timestamp() {
        os.write_int64(EVENT_TS_FIELD_NUMBER, timestamp)?;
    }
    if let Some(priority) = event.priority() {
        os.write_string(EVENT_PRIORITY_FIELD_NUMBER, priority.as_str())?;
    }
    write_non_empty_string(os, EVENT_HOST_FIELD_NUMBER, event.hostname().unwrap_or_default())?;
    write_repeated_string(os, EVENT_TAGS_FIELD_NUMBER, event.tags())?;
    if let Some(alert_type) = event.alert_type() {
        os.write_string(EVENT_ALERT_TYPE_FIELD_NUMBER, alert_type.as_str())?;
    }
    write_non_empty_string(
        os,
        EVENT_AGGREGATION_KEY_FIELD_NUMBER,
        event.aggregation_key().unwrap_or_default(),
    )?;
    write_non_empty_string(
        os,
        EVENT_SOURCE_TYPE_NAME_FIELD_NUMBER,
        event.source_type_name().unwrap_or_default(),
    )
}
