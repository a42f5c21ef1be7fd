//! Payload compression.

use std::io::{self, Write as _};

use bytes::Bytes;
use flate2::{write::ZlibEncoder, Compression};
use http::HeaderValue;
use snafu::{ResultExt as _, Snafu};
use tracing::warn;

static CONTENT_ENCODING_DEFLATE: HeaderValue = HeaderValue::from_static("deflate");
static CONTENT_ENCODING_ZSTD: HeaderValue = HeaderValue::from_static("zstd");

/// Default zstd compression level.
pub const DEFAULT_ZSTD_COMPRESSION_LEVEL: i32 = 3;

/// Compression error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum CompressionError {
    /// The codec failed to compress the input.
    #[snafu(display("failed to compress payload with {}: {}", scheme, source))]
    Io {
        /// Name of the compression scheme in use.
        scheme: &'static str,

        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Compression schemes supported when building payloads.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CompressionScheme {
    /// No compression.
    #[default]
    Noop,
    /// Zlib, at the default compression level (6).
    Zlib,
    /// Zstd, at the given compression level.
    Zstd(i32),
    /// Rejects every input.
    #[cfg(test)]
    Failing,
}

impl CompressionScheme {
    /// Zstd compression, using the default compression level (3).
    pub const fn zstd_default() -> Self {
        Self::Zstd(DEFAULT_ZSTD_COMPRESSION_LEVEL)
    }

    /// Create a new compression scheme from a string and level.
    ///
    /// Level is only used if the scheme is `zstd`. An empty string or `none` disables compression. Unknown schemes are
    /// logged and also disable compression.
    pub fn new(scheme: &str, level: i32) -> Self {
        match scheme {
            "" | "none" => Self::Noop,
            "zlib" => Self::Zlib,
            "zstd" => Self::Zstd(level),
            other => {
                warn!(
                    compressor_kind = other,
                    "Unknown compressor kind. Payloads will be sent uncompressed."
                );
                Self::Noop
            }
        }
    }

    /// Returns the name of the scheme.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "none",
            Self::Zlib => "zlib",
            Self::Zstd(_) => "zstd",
            #[cfg(test)]
            Self::Failing => "failing",
        }
    }

    /// Returns `true` if this scheme actually compresses its input.
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Noop)
    }

    /// Returns the content encoding for this scheme, if any.
    pub fn content_encoding(&self) -> Option<HeaderValue> {
        match self {
            Self::Noop => None,
            Self::Zlib => Some(CONTENT_ENCODING_DEFLATE.clone()),
            Self::Zstd(_) => Some(CONTENT_ENCODING_ZSTD.clone()),
            #[cfg(test)]
            Self::Failing => Some(CONTENT_ENCODING_ZSTD.clone()),
        }
    }

    /// Compresses the given buffer in one shot.
    ///
    /// With compression disabled, the buffer is returned as-is.
    ///
    /// # Errors
    ///
    /// If the codec fails, an error is returned.
    pub fn compress(&self, input: Vec<u8>) -> Result<Bytes, CompressionError> {
        let scheme = self.name();
        match self {
            Self::Noop => Ok(Bytes::from(input)),
            Self::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::with_capacity(input.len() / 2), Compression::default());
                encoder.write_all(&input).context(Io { scheme })?;
                encoder.finish().map(Bytes::from).context(Io { scheme })
            }
            Self::Zstd(level) => zstd::bulk::compress(&input, *level)
                .map(Bytes::from)
                .context(Io { scheme }),
            #[cfg(test)]
            Self::Failing => Err(io::Error::other("codec rejected input")).context(Io { scheme }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use flate2::read::ZlibDecoder;

    use super::*;

    #[test]
    fn scheme_from_kind() {
        assert_eq!(CompressionScheme::new("", 3), CompressionScheme::Noop);
        assert_eq!(CompressionScheme::new("none", 3), CompressionScheme::Noop);
        assert_eq!(CompressionScheme::new("zlib", 3), CompressionScheme::Zlib);
        assert_eq!(CompressionScheme::new("zstd", 5), CompressionScheme::Zstd(5));
        assert_eq!(CompressionScheme::new("lz4", 3), CompressionScheme::Noop);
    }

    #[test]
    fn content_encoding() {
        assert_eq!(CompressionScheme::Noop.content_encoding(), None);
        assert_eq!(
            CompressionScheme::Zlib.content_encoding(),
            Some(HeaderValue::from_static("deflate"))
        );
        assert_eq!(
            CompressionScheme::zstd_default().content_encoding(),
            Some(HeaderValue::from_static("zstd"))
        );
    }

    #[test]
    fn noop_is_identity() {
        let compressed = CompressionScheme::Noop.compress(b"TO JSON".to_vec()).unwrap();
        assert_eq!(&compressed[..], b"TO JSON");
    }

    #[test]
    fn zstd_matches_bulk_api() {
        let input = b"TO PROTOBUF".repeat(32);
        let compressed = CompressionScheme::zstd_default().compress(input.clone()).unwrap();

        assert_eq!(
            &compressed[..],
            &zstd::bulk::compress(&input, DEFAULT_ZSTD_COMPRESSION_LEVEL).unwrap()[..]
        );
        assert_eq!(zstd::decode_all(&compressed[..]).unwrap(), input);
    }

    #[test]
    fn zlib_decodes() {
        let input = b"{\"series\":[]}".repeat(16);
        let compressed = CompressionScheme::Zlib.compress(input.clone()).unwrap();

        let mut decoded = Vec::new();
        ZlibDecoder::new(&compressed[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, input);
    }
}
