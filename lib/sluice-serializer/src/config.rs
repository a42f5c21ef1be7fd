use serde::Deserialize;
use sluice_config::{ConfigurationError, GenericConfiguration};

use crate::compression::{CompressionScheme, DEFAULT_ZSTD_COMPRESSION_LEVEL};

const DEFAULT_SERIALIZER_COMPRESSOR_KIND: &str = "none";

// 2.5MiB, which matches the uncompressed payload limit of the v1 intake.
const DEFAULT_SERIALIZER_MAX_PAYLOAD_SIZE: usize = 2_621_440;

fn default_serializer_compressor_kind() -> String {
    DEFAULT_SERIALIZER_COMPRESSOR_KIND.to_owned()
}

const fn default_zstd_compressor_level() -> i32 {
    DEFAULT_ZSTD_COMPRESSION_LEVEL
}

const fn default_max_payload_size() -> usize {
    DEFAULT_SERIALIZER_MAX_PAYLOAD_SIZE
}

/// Per-kind selection of the v2 (protobuf) intake API.
///
/// When a flag is unset, that kind is sent to the v1 (JSON) intake.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct UseV2Api {
    /// Send events to the v2 API.
    #[serde(default)]
    pub events: bool,

    /// Send service checks to the v2 API.
    #[serde(default)]
    pub service_checks: bool,

    /// Send series to the v2 API.
    #[serde(default)]
    pub series: bool,
}

/// Serializer configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SerializerConfiguration {
    /// Which kinds of telemetry to send to the v2 API.
    #[serde(default)]
    pub use_v2_api: UseV2Api,

    /// Compression kind to use for payloads.
    ///
    /// One of `none`, `zlib`, or `zstd`. Unknown kinds fall back to no compression.
    ///
    /// Defaults to `none`.
    #[serde(
        rename = "serializer_compressor_kind",
        default = "default_serializer_compressor_kind"
    )]
    pub compressor_kind: String,

    /// Compressor level to use when the compressor kind is `zstd`.
    ///
    /// Defaults to 3.
    #[serde(
        rename = "serializer_zstd_compressor_level",
        default = "default_zstd_compressor_level"
    )]
    pub zstd_compressor_level: i32,

    /// Maximum size of a single JSON payload, in bytes, before compression.
    ///
    /// Larger payloads are split into multiple chunks.
    ///
    /// Defaults to 2621440 (2.5MiB).
    #[serde(rename = "serializer_max_payload_size", default = "default_max_payload_size")]
    pub max_payload_size: usize,
}

impl SerializerConfiguration {
    /// Creates a new `SerializerConfiguration` from the given configuration.
    ///
    /// Each setting is looked up individually, so nested keys (`use_v2_api.series`) and their flattened forms from
    /// the environment (`DD_USE_V2_API_SERIES`) are both honored. Missing settings use their defaults.
    ///
    /// # Errors
    ///
    /// If a setting is present but has the wrong type, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, ConfigurationError> {
        let defaults = Self::default();

        Ok(Self {
            use_v2_api: UseV2Api {
                events: config
                    .try_get_typed("use_v2_api.events")?
                    .unwrap_or(defaults.use_v2_api.events),
                service_checks: config
                    .try_get_typed("use_v2_api.service_checks")?
                    .unwrap_or(defaults.use_v2_api.service_checks),
                series: config
                    .try_get_typed("use_v2_api.series")?
                    .unwrap_or(defaults.use_v2_api.series),
            },
            compressor_kind: config
                .try_get_typed("serializer_compressor_kind")?
                .unwrap_or(defaults.compressor_kind),
            zstd_compressor_level: config
                .try_get_typed("serializer_zstd_compressor_level")?
                .unwrap_or(defaults.zstd_compressor_level),
            max_payload_size: config
                .try_get_typed("serializer_max_payload_size")?
                .unwrap_or(defaults.max_payload_size),
        })
    }

    /// Returns the compression scheme described by this configuration.
    pub fn compression_scheme(&self) -> CompressionScheme {
        CompressionScheme::new(&self.compressor_kind, self.zstd_compressor_level)
    }
}

impl Default for SerializerConfiguration {
    fn default() -> Self {
        Self {
            use_v2_api: UseV2Api::default(),
            compressor_kind: default_serializer_compressor_kind(),
            zstd_compressor_level: default_zstd_compressor_level(),
            max_payload_size: default_max_payload_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sluice_config::ConfigurationLoader;

    use super::*;

    #[test]
    fn defaults() {
        let config = SerializerConfiguration::from_configuration(&GenericConfiguration::empty()).unwrap();

        assert_eq!(config, SerializerConfiguration::default());
        assert_eq!(config.compression_scheme(), CompressionScheme::Noop);
        assert_eq!(config.max_payload_size, 2_621_440);
    }

    #[test]
    fn nested_and_flat_keys() {
        let generic = ConfigurationLoader::default()
            .from_values(json!({
                "use_v2_api": { "series": true },
                "use_v2_api_events": true,
                "serializer_compressor_kind": "zstd",
                "serializer_zstd_compressor_level": 5,
                "serializer_max_payload_size": 1024,
            }))
            .into_generic();
        let config = SerializerConfiguration::from_configuration(&generic).unwrap();

        assert_eq!(
            config.use_v2_api,
            UseV2Api {
                events: true,
                service_checks: false,
                series: true,
            }
        );
        assert_eq!(config.compression_scheme(), CompressionScheme::Zstd(5));
        assert_eq!(config.max_payload_size, 1024);
    }

    #[test]
    fn wrong_type_is_an_error() {
        let generic = ConfigurationLoader::default()
            .from_values(json!({ "serializer_max_payload_size": "lots" }))
            .into_generic();

        assert!(SerializerConfiguration::from_configuration(&generic).is_err());
    }
}
