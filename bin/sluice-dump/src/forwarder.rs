use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use http::HeaderMap;
use sluice_error::{ErrorContext as _, GenericError};
use sluice_serializer::forwarder::{Endpoint, Forwarder, Payloads};
use tracing::debug;

/// A forwarder that writes payloads to a directory instead of sending them.
///
/// Each submission gets a sequence number. Payload `i` of submission `n` to endpoint `e` is written to
/// `<n>-<e>-<i>.bin`, and the submission's headers are written alongside as `<n>-<e>.headers.json`.
pub struct DirectoryForwarder {
    root: PathBuf,
    next_sequence: AtomicUsize,
}

impl DirectoryForwarder {
    /// Creates a new `DirectoryForwarder` writing into `root`, creating it if necessary.
    ///
    /// # Errors
    ///
    /// If the directory can't be created, an error is returned.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, GenericError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_error_context(|| format!("Failed to create output directory '{}'.", root.display()))?;

        Ok(Self {
            root,
            next_sequence: AtomicUsize::new(0),
        })
    }

    /// Returns the directory payloads are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, endpoint: Endpoint, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let stem = format!("{:04}-{}", sequence, endpoint.name());

        let headers = headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect::<BTreeMap<_, _>>();
        let headers_path = self.root.join(format!("{}.headers.json", stem));
        let headers_json = serde_json::to_vec_pretty(&headers)?;
        fs::write(&headers_path, headers_json)
            .with_error_context(|| format!("Failed to write headers to '{}'.", headers_path.display()))?;

        for (index, payload) in payloads.iter().enumerate() {
            let payload_path = self.root.join(format!("{}-{}.bin", stem, index));
            fs::write(&payload_path, payload)
                .with_error_context(|| format!("Failed to write payload to '{}'.", payload_path.display()))?;
        }

        debug!(endpoint = %endpoint, sequence, payloads = payloads.len(), "Wrote submission to disk.");

        Ok(())
    }
}

impl Forwarder for DirectoryForwarder {
    fn submit_v1_intake(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.write(Endpoint::V1Intake, payloads, headers)
    }

    fn submit_events(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.write(Endpoint::Events, payloads, headers)
    }

    fn submit_v1_check_runs(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.write(Endpoint::V1CheckRuns, payloads, headers)
    }

    fn submit_service_checks(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.write(Endpoint::ServiceChecks, payloads, headers)
    }

    fn submit_v1_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.write(Endpoint::V1Series, payloads, headers)
    }

    fn submit_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.write(Endpoint::Series, payloads, headers)
    }

    fn submit_sketch_series(&self, payloads: Payloads, headers: &HeaderMap) -> Result<(), GenericError> {
        self.write(Endpoint::SketchSeries, payloads, headers)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{header::CONTENT_TYPE, HeaderValue};
    use similar_asserts::assert_eq;

    use super::*;

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn writes_payloads_and_headers() {
        let dir = tempfile::tempdir().unwrap();
        let forwarder = DirectoryForwarder::new(dir.path()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        forwarder
            .submit_v1_series(
                vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")],
                &headers,
            )
            .unwrap();

        assert_eq!(
            file_names(dir.path()),
            vec![
                "0000-v1_series-0.bin".to_string(),
                "0000-v1_series-1.bin".to_string(),
                "0000-v1_series.headers.json".to_string(),
            ]
        );
        assert_eq!(fs::read(dir.path().join("0000-v1_series-1.bin")).unwrap(), b"second".to_vec());

        let written: BTreeMap<String, String> =
            serde_json::from_slice(&fs::read(dir.path().join("0000-v1_series.headers.json")).unwrap()).unwrap();
        assert_eq!(written.get("content-type").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn sequence_increases_per_submission() {
        let dir = tempfile::tempdir().unwrap();
        let forwarder = DirectoryForwarder::new(dir.path()).unwrap();

        forwarder
            .submit_sketch_series(vec![Bytes::from_static(b"a")], &HeaderMap::new())
            .unwrap();
        forwarder
            .submit_v1_intake(vec![Bytes::from_static(b"b")], &HeaderMap::new())
            .unwrap();

        assert_eq!(
            file_names(dir.path()),
            vec![
                "0000-sketch_series-0.bin".to_string(),
                "0000-sketch_series.headers.json".to_string(),
                "0001-v1_intake-0.bin".to_string(),
                "0001-v1_intake.headers.json".to_string(),
            ]
        );
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("payloads");

        let forwarder = DirectoryForwarder::new(&nested).unwrap();
        assert!(forwarder.root().is_dir());
    }

    #[test]
    fn unwritable_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();

        assert!(DirectoryForwarder::new(file.join("child")).is_err());
    }
}
