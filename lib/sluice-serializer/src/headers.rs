//! Request headers for intake payloads.

use http::{
    header::{CONTENT_ENCODING, CONTENT_TYPE},
    HeaderMap, HeaderName, HeaderValue,
};

use crate::compression::CompressionScheme;

static CONTENT_TYPE_JSON: HeaderValue = HeaderValue::from_static("application/json");
static CONTENT_TYPE_PROTOBUF: HeaderValue = HeaderValue::from_static("application/x-protobuf");

/// Payload schema version header.
///
/// Always sent on protobuf payloads, and always empty.
pub static PAYLOAD_VERSION_HEADER: HeaderName = HeaderName::from_static("dd-agent-payload");
static PAYLOAD_VERSION_EMPTY: HeaderValue = HeaderValue::from_static("");

/// Content kind of a payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentKind {
    /// JSON.
    Json,

    /// Protocol Buffers.
    Protobuf,
}

/// Precomputed request headers.
///
/// Holds one header map per combination of content kind and compression. When compression is disabled, the
/// "compressed" maps are identical to the uncompressed ones.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtraHeaders {
    json: HeaderMap,
    json_compressed: HeaderMap,
    protobuf: HeaderMap,
    protobuf_compressed: HeaderMap,
}

impl ExtraHeaders {
    /// Builds the header maps for the given compression scheme.
    pub fn new(compression_scheme: CompressionScheme) -> Self {
        let json = build_headers(ContentKind::Json, CompressionScheme::Noop);
        let protobuf = build_headers(ContentKind::Protobuf, CompressionScheme::Noop);

        Self {
            json_compressed: build_headers(ContentKind::Json, compression_scheme),
            protobuf_compressed: build_headers(ContentKind::Protobuf, compression_scheme),
            json,
            protobuf,
        }
    }

    /// Returns the headers for the given content kind, with or without compression.
    pub fn get(&self, kind: ContentKind, compressed: bool) -> &HeaderMap {
        match (kind, compressed) {
            (ContentKind::Json, false) => &self.json,
            (ContentKind::Json, true) => &self.json_compressed,
            (ContentKind::Protobuf, false) => &self.protobuf,
            (ContentKind::Protobuf, true) => &self.protobuf_compressed,
        }
    }
}

/// Builds the headers for a payload of the given content kind, compressed with the given scheme.
pub fn build_headers(kind: ContentKind, compression_scheme: CompressionScheme) -> HeaderMap {
    let mut headers = HeaderMap::new();

    match kind {
        ContentKind::Json => {
            headers.insert(CONTENT_TYPE, CONTENT_TYPE_JSON.clone());
        }
        ContentKind::Protobuf => {
            headers.insert(CONTENT_TYPE, CONTENT_TYPE_PROTOBUF.clone());
            headers.insert(PAYLOAD_VERSION_HEADER.clone(), PAYLOAD_VERSION_EMPTY.clone());
        }
    }

    if let Some(content_encoding) = compression_scheme.content_encoding() {
        headers.insert(CONTENT_ENCODING, content_encoding);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|value| value.to_str().ok())
    }

    #[test]
    fn json_headers() {
        let headers = ExtraHeaders::new(CompressionScheme::zstd_default());

        let plain = headers.get(ContentKind::Json, false);
        assert_eq!(plain.len(), 1);
        assert_eq!(header(plain, "Content-Type"), Some("application/json"));

        let compressed = headers.get(ContentKind::Json, true);
        assert_eq!(compressed.len(), 2);
        assert_eq!(header(compressed, "Content-Type"), Some("application/json"));
        assert_eq!(header(compressed, "Content-Encoding"), Some("zstd"));
    }

    #[test]
    fn protobuf_headers() {
        let headers = ExtraHeaders::new(CompressionScheme::Zlib);

        let plain = headers.get(ContentKind::Protobuf, false);
        assert_eq!(plain.len(), 2);
        assert_eq!(header(plain, "Content-Type"), Some("application/x-protobuf"));
        assert_eq!(header(plain, "DD-Agent-Payload"), Some(""));
        assert_eq!(header(plain, "Content-Encoding"), None);

        let compressed = headers.get(ContentKind::Protobuf, true);
        assert_eq!(compressed.len(), 3);
        assert_eq!(header(compressed, "DD-Agent-Payload"), Some(""));
        assert_eq!(header(compressed, "Content-Encoding"), Some("deflate"));
    }

    #[test]
    fn compressed_equals_plain_without_compression() {
        let headers = ExtraHeaders::new(CompressionScheme::Noop);

        assert_eq!(headers.get(ContentKind::Json, true), headers.get(ContentKind::Json, false));
        assert_eq!(
            headers.get(ContentKind::Protobuf, true),
            headers.get(ContentKind::Protobuf, false)
        );
    }

    #[test]
    fn rebuilding_is_deterministic() {
        for scheme in [CompressionScheme::Noop, CompressionScheme::Zlib, CompressionScheme::Zstd(7)] {
            assert_eq!(ExtraHeaders::new(scheme), ExtraHeaders::new(scheme));
        }
    }
}
