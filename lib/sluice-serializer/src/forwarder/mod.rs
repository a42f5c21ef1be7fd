//! Delivery interface.
//!
//! The serializer hands finished payloads to a [`Forwarder`], which owns everything past that point: queuing, retries,
//! and the actual network I/O. Each intake endpoint gets its own method, so a forwarder can route payloads without
//! inspecting them.

use std::fmt;

use bytes::Bytes;
use http::HeaderMap;
use sluice_error::GenericError;

mod recording;
pub use self::recording::{RecordingForwarder, Submission};

/// An ordered sequence of wire-ready payloads.
///
/// Order is significant: forwarders must deliver payloads in the order given.
pub type Payloads = Vec<Bytes>;

/// Intake endpoint.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Endpoint {
    /// v1 intake, used for events (JSON), host metadata, and arbitrary JSON documents.
    V1Intake,

    /// v2 events (protobuf).
    Events,

    /// v1 check runs (JSON).
    V1CheckRuns,

    /// v2 service checks (protobuf).
    ServiceChecks,

    /// v1 series (JSON).
    V1Series,

    /// v2 series (protobuf).
    Series,

    /// Sketches (protobuf).
    SketchSeries,
}

impl Endpoint {
    /// All endpoints.
    pub const ALL: [Endpoint; 7] = [
        Self::V1Intake,
        Self::Events,
        Self::V1CheckRuns,
        Self::ServiceChecks,
        Self::V1Series,
        Self::Series,
        Self::SketchSeries,
    ];

    /// Returns the intake path for this endpoint.
    pub const fn path(&self) -> &'static str {
        match self {
            Self::V1Intake => "/intake/",
            Self::Events => "/api/v2/events",
            Self::V1CheckRuns => "/api/v1/check_run",
            Self::ServiceChecks => "/api/v2/service_checks",
            Self::V1Series => "/api/v1/series",
            Self::Series => "/api/v2/series",
            Self::SketchSeries => "/api/beta/sketches",
        }
    }

    /// Returns a short, stable name for this endpoint.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::V1Intake => "v1_intake",
            Self::Events => "events",
            Self::V1CheckRuns => "v1_check_runs",
            Self::ServiceChecks => "service_checks",
            Self::V1Series => "v1_series",
            Self::Series => "series",
            Self::SketchSeries => "sketch_series",
        }
    }

    /// Submits payloads to this endpoint through the given forwarder.
    ///
    /// # Errors
    ///
    /// If the forwarder fails to accept the payloads, an error is returned.
    pub fn submit<F>(&self, forwarder: &F, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError>
    where
        F: Forwarder + ?Sized,
    {
        match self {
            Self::V1Intake => forwarder.submit_v1_intake(payloads, headers),
            Self::Events => forwarder.submit_events(payloads, headers),
            Self::V1CheckRuns => forwarder.submit_v1_check_runs(payloads, headers),
            Self::ServiceChecks => forwarder.submit_service_checks(payloads, headers),
            Self::V1Series => forwarder.submit_v1_series(payloads, headers),
            Self::Series => forwarder.submit_series(payloads, headers),
            Self::SketchSeries => forwarder.submit_sketch_series(payloads, headers),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A delivery component.
///
/// Forwarders take ownership of the payloads they are given. Returning `Ok(())` means the payloads were accepted for
/// delivery, not necessarily that they were delivered.
pub trait Forwarder {
    /// Submits payloads to the v1 intake.
    fn submit_v1_intake(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError>;

    /// Submits payloads to the v2 events endpoint.
    fn submit_events(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError>;

    /// Submits payloads to the v1 check runs endpoint.
    fn submit_v1_check_runs(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError>;

    /// Submits payloads to the v2 service checks endpoint.
    fn submit_service_checks(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError>;

    /// Submits payloads to the v1 series endpoint.
    fn submit_v1_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError>;

    /// Submits payloads to the v2 series endpoint.
    fn submit_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError>;

    /// Submits payloads to the sketches endpoint.
    fn submit_sketch_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError>;
}

impl<F> Forwarder for &F
where
    F: Forwarder + ?Sized,
{
    fn submit_v1_intake(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        (**self).submit_v1_intake(payloads, headers)
    }

    fn submit_events(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        (**self).submit_events(payloads, headers)
    }

    fn submit_v1_check_runs(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        (**self).submit_v1_check_runs(payloads, headers)
    }

    fn submit_service_checks(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        (**self).submit_service_checks(payloads, headers)
    }

    fn submit_v1_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        (**self).submit_v1_series(payloads, headers)
    }

    fn submit_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        (**self).submit_series(payloads, headers)
    }

    fn submit_sketch_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        (**self).submit_sketch_series(payloads, headers)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn paths_are_unique() {
        let paths = Endpoint::ALL.iter().map(Endpoint::path).collect::<HashSet<_>>();
        assert_eq!(paths.len(), Endpoint::ALL.len());
    }

    #[test]
    fn submit_dispatches_to_matching_method() {
        let forwarder = RecordingForwarder::new();
        for endpoint in Endpoint::ALL {
            endpoint
                .submit(&forwarder, vec![Bytes::from_static(b"x")], &HeaderMap::new())
                .unwrap();
        }

        let endpoints = forwarder
            .submissions()
            .into_iter()
            .map(|submission| submission.endpoint)
            .collect::<Vec<_>>();
        assert_eq!(endpoints, Endpoint::ALL.to_vec());
    }
}
