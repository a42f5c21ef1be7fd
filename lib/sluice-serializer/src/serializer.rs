use bytes::Bytes;
use http::HeaderMap;
use serde::Serialize;
use sluice_error::GenericError;
use snafu::{ResultExt as _, Snafu};
use tracing::{debug, info, trace};

use crate::{
    compression::{CompressionError, CompressionScheme},
    config::{SerializerConfiguration, UseV2Api},
    forwarder::{Endpoint, Forwarder, Payloads},
    headers::{ContentKind, ExtraHeaders},
    marshaler::{MarshalError, Marshaler, Protocol, TelemetryKind},
    telemetry,
};

/// Serializer error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum SerializerError {
    /// Encoding the telemetry failed.
    #[snafu(display("failed to encode {} as {}: {}", kind, protocol, source))]
    Marshal {
        /// Kind of telemetry being sent.
        kind: TelemetryKind,

        /// Protocol being encoded to.
        protocol: Protocol,

        /// Underlying error.
        source: MarshalError,
    },

    /// Splitting the telemetry into chunks failed.
    #[snafu(display("failed to split {} payload: {}", kind, source))]
    Split {
        /// Kind of telemetry being sent.
        kind: TelemetryKind,

        /// Underlying error.
        source: MarshalError,
    },

    /// A chunk produced by splitting was still over the size limit once encoded.
    #[snafu(display(
        "{} chunk {} encodes to {} bytes, exceeding the payload size limit of {} bytes",
        kind,
        index,
        len,
        limit
    ))]
    ChunkTooLarge {
        /// Kind of telemetry being sent.
        kind: TelemetryKind,

        /// Index of the chunk.
        index: usize,

        /// Encoded size of the chunk, in bytes.
        len: usize,

        /// Payload size limit, in bytes.
        limit: usize,
    },

    /// Compressing a payload failed.
    #[snafu(display("failed to compress {} payload: {}", kind, source))]
    Compression {
        /// Kind of telemetry being sent.
        kind: TelemetryKind,

        /// Underlying error.
        source: CompressionError,
    },

    /// The forwarder did not accept the payloads.
    #[snafu(display("failed to submit payloads to {}: {}", endpoint, source))]
    Delivery {
        /// Endpoint the payloads were submitted to.
        endpoint: Endpoint,

        /// Error returned by the forwarder.
        source: GenericError,
    },
}

impl SerializerError {
    /// Returns the name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Marshal { .. } => "marshal",
            Self::Split { .. } | Self::ChunkTooLarge { .. } => "split",
            Self::Compression { .. } => "compress",
            Self::Delivery { .. } => "submit",
        }
    }
}

/// Where a kind of telemetry is sent, and how it is encoded to get there.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Route {
    /// Wire protocol.
    pub protocol: Protocol,

    /// Intake endpoint.
    pub endpoint: Endpoint,
}

impl Route {
    const fn json(endpoint: Endpoint) -> Self {
        Self {
            protocol: Protocol::Json,
            endpoint,
        }
    }

    const fn protobuf(endpoint: Endpoint) -> Self {
        Self {
            protocol: Protocol::Protobuf,
            endpoint,
        }
    }

    const fn select(use_v2: bool, json: Endpoint, protobuf: Endpoint) -> Self {
        if use_v2 {
            Self::protobuf(protobuf)
        } else {
            Self::json(json)
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct RoutingTable {
    events: Route,
    service_checks: Route,
    series: Route,
}

impl RoutingTable {
    const fn new(use_v2_api: &UseV2Api) -> Self {
        Self {
            events: Route::select(use_v2_api.events, Endpoint::V1Intake, Endpoint::Events),
            service_checks: Route::select(
                use_v2_api.service_checks,
                Endpoint::V1CheckRuns,
                Endpoint::ServiceChecks,
            ),
            series: Route::select(use_v2_api.series, Endpoint::V1Series, Endpoint::Series),
        }
    }

    const fn get(&self, kind: TelemetryKind) -> Route {
        match kind {
            TelemetryKind::Events => self.events,
            TelemetryKind::ServiceChecks => self.service_checks,
            TelemetryKind::Series => self.series,
            TelemetryKind::Sketches => Route::protobuf(Endpoint::SketchSeries),
            TelemetryKind::Metadata => Route::json(Endpoint::V1Intake),
        }
    }
}

/// Serializes telemetry into payloads and hands them to a forwarder.
///
/// For each kind of telemetry, the serializer picks the intake generation to target based on its configuration, encodes
/// the telemetry accordingly, compresses it, and submits it alongside the matching headers. JSON payloads are split
/// into multiple chunks when they would exceed the configured payload size limit.
///
/// Sends are all-or-nothing: if any chunk fails to encode or compress, nothing is submitted.
pub struct Serializer<F> {
    forwarder: F,
    compression_scheme: CompressionScheme,
    headers: ExtraHeaders,
    routes: RoutingTable,
    max_payload_size: usize,
}

impl<F> Serializer<F>
where
    F: Forwarder,
{
    /// Creates a new `Serializer` with the given configuration, submitting payloads to `forwarder`.
    pub fn new(config: &SerializerConfiguration, forwarder: F) -> Self {
        let compression_scheme = config.compression_scheme();
        Self {
            forwarder,
            compression_scheme,
            headers: ExtraHeaders::new(compression_scheme),
            routes: RoutingTable::new(&config.use_v2_api),
            max_payload_size: config.max_payload_size,
        }
    }

    /// Returns a reference to the forwarder.
    pub fn forwarder(&self) -> &F {
        &self.forwarder
    }

    /// Returns the compression scheme in use.
    pub fn compression_scheme(&self) -> CompressionScheme {
        self.compression_scheme
    }

    /// Returns the route taken by the given kind of telemetry.
    pub fn route(&self, kind: TelemetryKind) -> Route {
        self.routes.get(kind)
    }

    /// Applies a new configuration.
    ///
    /// Headers and routes are rebuilt from scratch.
    pub fn reconfigure(&mut self, config: &SerializerConfiguration) {
        self.compression_scheme = config.compression_scheme();
        self.headers = ExtraHeaders::new(self.compression_scheme);
        self.routes = RoutingTable::new(&config.use_v2_api);
        self.max_payload_size = config.max_payload_size;

        info!(
            compression = self.compression_scheme.name(),
            max_payload_size = self.max_payload_size,
            "Serializer reconfigured."
        );
    }

    /// Sends events.
    ///
    /// # Errors
    ///
    /// If the events cannot be encoded or compressed, or the forwarder rejects them, an error is returned.
    pub fn send_events<M>(&self, events: &M) -> Result<(), SerializerError>
    where
        M: Marshaler,
    {
        self.send(TelemetryKind::Events, events)
    }

    /// Sends service checks.
    ///
    /// # Errors
    ///
    /// If the service checks cannot be encoded or compressed, or the forwarder rejects them, an error is returned.
    pub fn send_service_checks<M>(&self, service_checks: &M) -> Result<(), SerializerError>
    where
        M: Marshaler,
    {
        self.send(TelemetryKind::ServiceChecks, service_checks)
    }

    /// Sends metric series.
    ///
    /// # Errors
    ///
    /// If the series cannot be encoded or compressed, or the forwarder rejects them, an error is returned.
    pub fn send_series<M>(&self, series: &M) -> Result<(), SerializerError>
    where
        M: Marshaler,
    {
        self.send(TelemetryKind::Series, series)
    }

    /// Sends sketches.
    ///
    /// Sketches are always sent as protobuf.
    ///
    /// # Errors
    ///
    /// If the sketches cannot be encoded or compressed, or the forwarder rejects them, an error is returned.
    pub fn send_sketch<M>(&self, sketches: &M) -> Result<(), SerializerError>
    where
        M: Marshaler,
    {
        self.send(TelemetryKind::Sketches, sketches)
    }

    /// Sends host metadata.
    ///
    /// Metadata is sent to the v1 intake as a single, uncompressed JSON document.
    ///
    /// # Errors
    ///
    /// If the metadata cannot be encoded, or the forwarder rejects it, an error is returned.
    pub fn send_metadata<M>(&self, metadata: &M) -> Result<(), SerializerError>
    where
        M: Marshaler,
    {
        let kind = TelemetryKind::Metadata;
        let result = metadata
            .marshal_json()
            .context(Marshal {
                kind,
                protocol: Protocol::Json,
            })
            .and_then(|payload| self.submit_uncompressed_json(kind, payload));

        track_result(kind, result)
    }

    /// Sends an arbitrary JSON document to the v1 intake.
    ///
    /// The document is sent as-is: uncompressed, and never split.
    ///
    /// # Errors
    ///
    /// If the value cannot be encoded, or the forwarder rejects it, an error is returned.
    pub fn send_json_to_v1_intake<T>(&self, value: &T) -> Result<(), SerializerError>
    where
        T: Serialize + ?Sized,
    {
        let kind = TelemetryKind::Metadata;
        let result = serde_json::to_vec(value)
            .context(crate::marshaler::Json { kind })
            .context(Marshal {
                kind,
                protocol: Protocol::Json,
            })
            .and_then(|payload| self.submit_uncompressed_json(kind, payload));

        track_result(kind, result)
    }

    fn send<M>(&self, kind: TelemetryKind, marshaler: &M) -> Result<(), SerializerError>
    where
        M: Marshaler,
    {
        let route = self.routes.get(kind);
        debug!(
            kind = kind.as_str(),
            protocol = route.protocol.as_str(),
            endpoint = route.endpoint.path(),
            items = marshaler.item_count(),
            "Serializing payload."
        );

        let result = match route.protocol {
            Protocol::Protobuf => self.build_protobuf_payloads(kind, marshaler),
            Protocol::Json => self.build_json_payloads(kind, marshaler),
        }
        .and_then(|payloads| {
            let content_kind = match route.protocol {
                Protocol::Json => ContentKind::Json,
                Protocol::Protobuf => ContentKind::Protobuf,
            };
            let headers = self.headers.get(content_kind, true);
            self.submit(kind, route.endpoint, payloads, headers)
        });

        track_result(kind, result)
    }

    fn build_protobuf_payloads<M>(&self, kind: TelemetryKind, marshaler: &M) -> Result<Payloads, SerializerError>
    where
        M: Marshaler,
    {
        let encoded = marshaler.marshal_protobuf().context(Marshal {
            kind,
            protocol: Protocol::Protobuf,
        })?;
        let uncompressed_len = encoded.len();
        let payload = self.compression_scheme.compress(encoded).context(Compression { kind })?;

        trace!(
            kind = kind.as_str(),
            uncompressed_len,
            compressed_len = payload.len(),
            "Encoded protobuf payload."
        );

        Ok(vec![payload])
    }

    fn build_json_payloads<M>(&self, kind: TelemetryKind, marshaler: &M) -> Result<Payloads, SerializerError>
    where
        M: Marshaler,
    {
        let chunks = marshaler.split(self.max_payload_size).context(Split { kind })?;

        let mut payloads = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let encoded = chunk.marshal_json().context(Marshal {
                kind,
                protocol: Protocol::Json,
            })?;
            if encoded.len() > self.max_payload_size {
                return Err(SerializerError::ChunkTooLarge {
                    kind,
                    index,
                    len: encoded.len(),
                    limit: self.max_payload_size,
                });
            }

            let uncompressed_len = encoded.len();
            let payload = self.compression_scheme.compress(encoded).context(Compression { kind })?;

            trace!(
                kind = kind.as_str(),
                index,
                items = chunk.item_count(),
                uncompressed_len,
                compressed_len = payload.len(),
                "Encoded JSON chunk."
            );

            payloads.push(payload);
        }

        Ok(payloads)
    }

    fn submit_uncompressed_json(&self, kind: TelemetryKind, payload: Vec<u8>) -> Result<(), SerializerError> {
        let headers = self.headers.get(ContentKind::Json, false);
        self.submit(kind, Endpoint::V1Intake, vec![Bytes::from(payload)], headers)
    }

    fn submit(
        &self, kind: TelemetryKind, endpoint: Endpoint, payloads: Payloads, headers: &HeaderMap,
    ) -> Result<(), SerializerError> {
        let payload_count = payloads.len();
        let payload_bytes = payloads.iter().map(Bytes::len).sum::<usize>();

        debug!(
            kind = kind.as_str(),
            endpoint = endpoint.path(),
            payload_count,
            payload_bytes,
            "Submitting payloads."
        );

        endpoint
            .submit(&self.forwarder, payloads, headers)
            .context(Delivery { endpoint })?;

        telemetry::track_submitted(kind, endpoint, payload_count, payload_bytes);
        Ok(())
    }
}

fn track_result(kind: TelemetryKind, result: Result<(), SerializerError>) -> Result<(), SerializerError> {
    if let Err(e) = &result {
        debug!(kind = kind.as_str(), stage = e.stage(), error = %e, "Failed to send payload.");
        telemetry::track_failed(kind, e.stage());
    }
    result
}
