//! Telemetry serialization and dispatch.
//!
//! This crate turns in-memory telemetry into wire-ready payloads for the intake. The [`Serializer`] decides, per kind of
//! telemetry, whether to target the v1 (JSON) or v2 (protobuf) intake API, encodes the telemetry through its
//! [`Marshaler`][marshaler::Marshaler], splits and compresses the result, attaches the right headers, and hands the
//! payloads to a [`Forwarder`][forwarder::Forwarder] for delivery.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod compression;

mod config;
pub use self::config::{SerializerConfiguration, UseV2Api};

pub mod forwarder;

pub mod headers;

pub mod marshaler;

mod serializer;
pub use self::serializer::{Route, Serializer, SerializerError};

mod telemetry;
