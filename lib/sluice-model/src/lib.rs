//! Telemetry data model.
//!
//! These are the in-memory representations of the telemetry that gets serialized and shipped to the intake: events,
//! service checks, metric series, distribution sketches, and host metadata. Each type serializes (via `serde`) to the
//! shape the v1 JSON intake expects, and deserializes from that same shape.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod event;
pub mod metadata;
pub mod series;
pub mod service_check;
pub mod sketch;

pub use self::event::{AlertType, Event, Priority};
pub use self::metadata::HostMetadata;
pub use self::series::{MetricType, Point, Serie};
pub use self::service_check::{CheckStatus, ServiceCheck};
pub use self::sketch::{Dogsketch, SketchPoint, SketchSeries};
