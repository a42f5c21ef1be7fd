use std::sync::{Arc, Mutex};

use http::HeaderMap;
use sluice_error::{generic_error, GenericError};

use super::{Endpoint, Forwarder, Payloads};

/// A single call made to a [`RecordingForwarder`].
#[derive(Clone, Debug)]
pub struct Submission {
    /// Endpoint the payloads were submitted to.
    pub endpoint: Endpoint,

    /// Submitted payloads.
    pub payloads: Payloads,

    /// Submitted headers.
    pub headers: HeaderMap,
}

#[derive(Debug, Default)]
struct State {
    submissions: Vec<Submission>,
    failing: Vec<Endpoint>,
}

/// A forwarder that records every submission in memory.
///
/// Clones share the same record, so a clone can be handed to a serializer while the original is used to inspect what
/// was submitted. Endpoints can be configured to reject submissions, which are still recorded.
#[derive(Clone, Debug, Default)]
pub struct RecordingForwarder {
    state: Arc<Mutex<State>>,
}

impl RecordingForwarder {
    /// Creates an empty `RecordingForwarder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent submission to `endpoint` fail.
    pub fn fail_on(self, endpoint: Endpoint) -> Self {
        self.with_state(|state| state.failing.push(endpoint));
        self
    }

    /// Returns all submissions recorded so far, in call order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.with_state(|state| state.submissions.clone())
    }

    /// Returns the number of submissions recorded so far.
    pub fn submission_count(&self) -> usize {
        self.with_state(|state| state.submissions.len())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    fn record(&self, endpoint: Endpoint, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.with_state(|state| {
            state.submissions.push(Submission {
                endpoint,
                payloads,
                headers: headers.clone(),
            });

            if state.failing.contains(&endpoint) {
                Err(generic_error!("endpoint {} rejected the submission", endpoint))
            } else {
                Ok(())
            }
        })
    }
}

impl Forwarder for RecordingForwarder {
    fn submit_v1_intake(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.record(Endpoint::V1Intake, payloads, headers)
    }

    fn submit_events(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.record(Endpoint::Events, payloads, headers)
    }

    fn submit_v1_check_runs(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.record(Endpoint::V1CheckRuns, payloads, headers)
    }

    fn submit_service_checks(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.record(Endpoint::ServiceChecks, payloads, headers)
    }

    fn submit_v1_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.record(Endpoint::V1Series, payloads, headers)
    }

    fn submit_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.record(Endpoint::Series, payloads, headers)
    }

    fn submit_sketch_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.record(Endpoint::SketchSeries, payloads, headers)
    }
}
