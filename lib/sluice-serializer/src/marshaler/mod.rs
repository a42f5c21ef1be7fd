//! Telemetry marshalers.
//!
//! A marshaler wraps a collection of a single kind of telemetry and knows how to encode it for either intake
//! generation: JSON for the v1 endpoints, and Protocol Buffers for the v2 endpoints. Marshalers can also split
//! themselves into smaller marshalers so that each encoded chunk stays under a size limit.

use std::fmt;

use snafu::Snafu;

mod events;
pub use self::events::Events;

mod metadata;
pub use self::metadata::Metadata;

mod wire;

mod series;
pub use self::series::Series;

mod service_checks;
pub use self::service_checks::ServiceChecks;

mod sketches;
pub use self::sketches::Sketches;

/// Kind of telemetry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelemetryKind {
    /// Events.
    Events,

    /// Service checks.
    ServiceChecks,

    /// Metric series.
    Series,

    /// Distribution sketches.
    Sketches,

    /// Host metadata.
    Metadata,
}

impl TelemetryKind {
    /// Returns the name of the kind, suitable for logs and metric labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::ServiceChecks => "service_checks",
            Self::Series => "series",
            Self::Sketches => "sketches",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire protocol.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Protocol {
    /// JSON, used by the v1 endpoints.
    Json,

    /// Protocol Buffers, used by the v2 endpoints.
    Protobuf,
}

impl Protocol {
    /// Returns the name of the protocol.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Protobuf => "protobuf",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marshal error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum MarshalError {
    /// JSON encoding failed.
    #[snafu(display("failed to encode {} as JSON: {}", kind, source))]
    Json {
        /// Kind of telemetry being encoded.
        kind: TelemetryKind,

        /// Underlying error.
        source: serde_json::Error,
    },

    /// Protocol Buffers encoding failed.
    #[snafu(display("failed to encode {} as protobuf: {}", kind, source))]
    Protobuf {
        /// Kind of telemetry being encoded.
        kind: TelemetryKind,

        /// Underlying error.
        source: protobuf::Error,
    },

    /// The kind of telemetry has no encoding for the requested protocol.
    #[snafu(display("{} cannot be encoded as {}", kind, protocol))]
    UnsupportedProtocol {
        /// Kind of telemetry being encoded.
        kind: TelemetryKind,

        /// Requested protocol.
        protocol: Protocol,
    },

    /// A single element is larger than the chunk size limit on its own, and so cannot be split any further.
    #[snafu(display(
        "{} element at index {} encodes to {} bytes, exceeding the chunk size limit of {} bytes",
        kind,
        index,
        len,
        limit
    ))]
    ItemTooLarge {
        /// Kind of telemetry being split.
        kind: TelemetryKind,

        /// Index of the offending element in the original collection.
        index: usize,

        /// Encoded size of the element, in bytes.
        len: usize,

        /// Chunk size limit, in bytes.
        limit: usize,
    },

    /// The telemetry is malformed and cannot be encoded.
    #[snafu(display("invalid {}: {}", kind, reason))]
    Invalid {
        /// Kind of telemetry being encoded.
        kind: TelemetryKind,

        /// Why the telemetry is invalid.
        reason: String,
    },
}

/// A collection of telemetry that can be encoded for the intake.
pub trait Marshaler: Sized {
    /// Returns the number of elements in the collection.
    fn item_count(&self) -> usize;

    /// Encodes the collection as JSON.
    ///
    /// # Errors
    ///
    /// If the collection cannot be encoded, an error is returned.
    fn marshal_json(&self) -> Result<Vec<u8>, MarshalError>;

    /// Encodes the collection as Protocol Buffers.
    ///
    /// # Errors
    ///
    /// If the collection cannot be encoded, or has no protobuf form, an error is returned.
    fn marshal_protobuf(&self) -> Result<Vec<u8>, MarshalError>;

    /// Splits the collection into smaller collections whose JSON encoding fits within `max_chunk_size` bytes.
    ///
    /// Every element ends up in exactly one chunk, and chunks preserve the original element order.
    ///
    /// # Errors
    ///
    /// If any element cannot fit in a chunk on its own, or encoding fails, an error is returned.
    fn split(&self, max_chunk_size: usize) -> Result<Vec<Self>, MarshalError>;
}

/// Splits `items` into contiguous runs whose encoding fits within `max_chunk_size` bytes.
///
/// The whole slice is tried first. If it doesn't fit, it gets halved at the midpoint and each half is split in turn,
/// left before right. An empty slice always yields a single empty run.
pub(crate) fn split_by_halving<T, F>(
    kind: TelemetryKind, items: &[T], max_chunk_size: usize, encode: F,
) -> Result<Vec<Vec<T>>, MarshalError>
where
    T: Clone,
    F: Fn(&[T]) -> Result<Vec<u8>, MarshalError>,
{
    let mut chunks = Vec::new();
    split_into(kind, items, 0, max_chunk_size, &encode, &mut chunks)?;
    Ok(chunks)
}

fn split_into<T, F>(
    kind: TelemetryKind, items: &[T], offset: usize, max_chunk_size: usize, encode: &F, chunks: &mut Vec<Vec<T>>,
) -> Result<(), MarshalError>
where
    T: Clone,
    F: Fn(&[T]) -> Result<Vec<u8>, MarshalError>,
{
    let encoded_len = encode(items)?.len();
    if encoded_len <= max_chunk_size || items.is_empty() {
        chunks.push(items.to_vec());
        return Ok(());
    }

    if items.len() == 1 {
        return Err(MarshalError::ItemTooLarge {
            kind,
            index: offset,
            len: encoded_len,
            limit: max_chunk_size,
        });
    }

    let mid = items.len() / 2;
    let (left, right) = items.split_at(mid);
    split_into(kind, left, offset, max_chunk_size, encode, chunks)?;
    split_into(kind, right, offset + mid, max_chunk_size, encode, chunks)
}
