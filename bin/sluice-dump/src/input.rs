use std::{fmt, path::Path};

use clap::ValueEnum;
use sluice_error::{ErrorContext as _, GenericError};
use sluice_model::{Event, HostMetadata, Serie, ServiceCheck, SketchSeries};
use sluice_serializer::{
    forwarder::Forwarder,
    marshaler::{Events, Metadata, Series, ServiceChecks, Sketches},
    Serializer,
};

/// Kind of telemetry held in an input file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum InputKind {
    /// A JSON array of events.
    Events,

    /// A JSON array of service checks.
    ServiceChecks,

    /// A JSON array of metric series.
    Series,

    /// A JSON array of sketch series.
    Sketches,

    /// A single host metadata object.
    Metadata,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Events => "events",
            Self::ServiceChecks => "service-checks",
            Self::Series => "series",
            Self::Sketches => "sketches",
            Self::Metadata => "metadata",
        };
        f.write_str(name)
    }
}

/// Telemetry decoded from an input file, ready to be sent.
#[derive(Debug)]
pub enum Input {
    /// Events.
    Events(Events),

    /// Service checks.
    ServiceChecks(ServiceChecks),

    /// Metric series.
    Series(Series),

    /// Sketch series.
    Sketches(Sketches),

    /// Host metadata.
    Metadata(Metadata),
}

impl Input {
    /// Decodes an input document of the given kind.
    ///
    /// `hostname` is attached to events and service checks, which carry it at the payload level.
    ///
    /// # Errors
    ///
    /// If the document doesn't match the shape expected for `kind`, an error is returned.
    pub fn from_slice(kind: InputKind, hostname: &str, data: &[u8]) -> Result<Self, GenericError> {
        let input = match kind {
            InputKind::Events => {
                let events = serde_json::from_slice::<Vec<Event>>(data).error_context("Invalid events input.")?;
                Self::Events(Events::new(hostname, events))
            }
            InputKind::ServiceChecks => {
                let checks = serde_json::from_slice::<Vec<ServiceCheck>>(data)
                    .error_context("Invalid service checks input.")?;
                Self::ServiceChecks(ServiceChecks::new(hostname, checks))
            }
            InputKind::Series => {
                let series = serde_json::from_slice::<Vec<Serie>>(data).error_context("Invalid series input.")?;
                Self::Series(Series::new(series))
            }
            InputKind::Sketches => {
                let sketches =
                    serde_json::from_slice::<Vec<SketchSeries>>(data).error_context("Invalid sketches input.")?;
                Self::Sketches(Sketches::new(sketches))
            }
            InputKind::Metadata => {
                let host = serde_json::from_slice::<HostMetadata>(data).error_context("Invalid metadata input.")?;
                Self::Metadata(Metadata::new(host))
            }
        };

        Ok(input)
    }

    /// Reads and decodes the input file at `path`.
    ///
    /// # Errors
    ///
    /// If the file can't be read or decoded, an error is returned.
    pub fn from_file(kind: InputKind, hostname: &str, path: &Path) -> Result<Self, GenericError> {
        let data =
            std::fs::read(path).with_error_context(|| format!("Failed to read input file '{}'.", path.display()))?;
        Self::from_slice(kind, hostname, &data)
    }

    /// Returns the number of items in this input.
    pub fn item_count(&self) -> usize {
        use sluice_serializer::marshaler::Marshaler as _;

        match self {
            Self::Events(events) => events.item_count(),
            Self::ServiceChecks(checks) => checks.item_count(),
            Self::Series(series) => series.item_count(),
            Self::Sketches(sketches) => sketches.item_count(),
            Self::Metadata(metadata) => metadata.item_count(),
        }
    }

    /// Sends this input through the given serializer.
    ///
    /// # Errors
    ///
    /// If serialization or delivery fails, an error is returned.
    pub fn send<F: Forwarder>(&self, serializer: &Serializer<F>) -> Result<(), GenericError> {
        match self {
            Self::Events(events) => serializer.send_events(events)?,
            Self::ServiceChecks(checks) => serializer.send_service_checks(checks)?,
            Self::Series(series) => serializer.send_series(series)?,
            Self::Sketches(sketches) => serializer.send_sketch(sketches)?,
            Self::Metadata(metadata) => serializer.send_metadata(metadata)?,
        }

        Ok(())
    }
}
