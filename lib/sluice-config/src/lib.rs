//! Primitives for loading and querying configuration.
#![deny(warnings)]
#![deny(missing_docs)]

use std::{borrow::Cow, collections::HashSet, sync::Arc};

use figment::{
    error::Kind,
    providers::{Env, Serialized},
    Figment, Provider,
};
use serde::{Deserialize, Serialize};
use sluice_error::GenericError;
use snafu::{ResultExt as _, Snafu};

mod provider;
use self::provider::FileProvider;

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// Environment variable prefix was empty.
    #[snafu(display("Environment variable prefix must not be empty."))]
    EmptyPrefix,

    /// Requested field was missing from the configuration.
    #[snafu(display("Missing field '{}' in configuration. {}", field, help_text))]
    MissingField {
        /// Help text describing how to set the missing field.
        help_text: String,

        /// Name of the missing field.
        field: Cow<'static, str>,
    },

    /// Requested field had a different data type than expected.
    #[snafu(display(
        "Expected value for field '{}' to be '{}', got '{}' instead.",
        field,
        expected_ty,
        actual_ty
    ))]
    InvalidFieldType {
        /// Period-separated path to the field.
        field: String,

        /// Expected data type.
        expected_ty: String,

        /// Actual data type.
        actual_ty: String,
    },

    /// Generic configuration error.
    #[snafu(display("Failed to query configuration."))]
    Generic {
        /// Error source.
        source: GenericError,
    },
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        match e.kind {
            Kind::InvalidType(actual_ty, expected_ty) => Self::InvalidFieldType {
                field: e.path.join("."),
                expected_ty,
                actual_ty: actual_ty.to_string(),
            },
            _ => Self::Generic { source: e.into() },
        }
    }
}

/// Where a key may have been looked up, used to build help text for missing fields.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum LookupSource {
    Environment { prefix: String },
}

impl LookupSource {
    fn transform_key(&self, key: &str) -> String {
        match self {
            // The prefix is already uppercased and ends with an underscore.
            LookupSource::Environment { prefix } => format!("{}{}", prefix, key.replace('.', "_").to_uppercase()),
        }
    }
}

struct BoxedProvider(Box<dyn Provider + Send + Sync>);

impl Provider for BoxedProvider {
    fn metadata(&self) -> figment::Metadata {
        self.0.metadata()
    }

    fn data(&self) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        self.0.data()
    }
}

/// A configuration loader that can pull from various sources.
///
/// Sources are layered in the order they are added: a source added later overrides any overlapping values from
/// sources added before it. Once all sources are added, the loader can be turned into a typed value
/// ([`into_typed`][Self::into_typed]) or a [`GenericConfiguration`] ([`into_generic`][Self::into_generic]).
///
/// # Supported sources
///
/// - YAML file
/// - JSON file
/// - environment variables (must be prefixed; see [`from_environment`][Self::from_environment])
/// - any serializable value (see [`from_values`][Self::from_values])
#[derive(Default)]
pub struct ConfigurationLoader {
    lookup_sources: HashSet<LookupSource>,
    providers: Vec<BoxedProvider>,
}

impl ConfigurationLoader {
    /// Loads the given YAML configuration file.
    ///
    /// # Errors
    ///
    /// If the file could not be read, or if the file is not valid YAML, an error will be returned.
    pub fn from_yaml<P>(mut self, path: P) -> Result<Self, ConfigurationError>
    where
        P: AsRef<std::path::Path>,
    {
        let provider = FileProvider::from_yaml(&path)
            .map_err(GenericError::from)
            .context(Generic)?;
        self.providers.push(BoxedProvider(Box::new(provider)));
        Ok(self)
    }

    /// Loads the given JSON configuration file.
    ///
    /// # Errors
    ///
    /// If the file could not be read, or if the file is not valid JSON, an error will be returned.
    pub fn from_json<P>(mut self, path: P) -> Result<Self, ConfigurationError>
    where
        P: AsRef<std::path::Path>,
    {
        let provider = FileProvider::from_json(&path)
            .map_err(GenericError::from)
            .context(Generic)?;
        self.providers.push(BoxedProvider(Box::new(provider)));
        Ok(self)
    }

    /// Loads configuration from environment variables.
    ///
    /// The prefix given will have an underscore appended to it if it does not already end with one. For example, with a
    /// prefix of `DD`, any environment variable starting with `DD_` would be matched, and `DD_USE_V2_API_SERIES` would
    /// be visible as `use_v2_api_series`.
    ///
    /// # Errors
    ///
    /// If the prefix is empty, or the environment could not be read, an error will be returned.
    pub fn from_environment(mut self, prefix: &'static str) -> Result<Self, ConfigurationError> {
        if prefix.is_empty() {
            return Err(ConfigurationError::EmptyPrefix);
        }

        let prefix = if prefix.ends_with('_') {
            prefix.to_uppercase()
        } else {
            format!("{}_", prefix.to_uppercase())
        };

        // `Env` isn't `Send + Sync`, so snapshot its values instead of holding onto the provider itself.
        let values = Env::prefixed(&prefix).data()?;
        if let Some(default_dict) = values.get(&figment::Profile::Default) {
            self.providers
                .push(BoxedProvider(Box::new(Serialized::defaults(default_dict.clone()))));
            self.lookup_sources.insert(LookupSource::Environment { prefix });
        }
        Ok(self)
    }

    /// Loads configuration from an arbitrary serializable value.
    ///
    /// This is typically used for values coming from command-line flags, which should take precedence over files and
    /// the environment, and so should be added last.
    pub fn from_values<T>(mut self, values: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.providers.push(BoxedProvider(Box::new(Serialized::defaults(values))));
        self
    }

    fn build_figment(&self) -> Figment {
        self.providers
            .iter()
            .fold(Figment::new(), |figment, provider| figment.admerge(provider))
    }

    /// Consumes the configuration loader, deserializing it as `T`.
    ///
    /// ## Errors
    ///
    /// If the configuration could not be deserialized into `T`, an error will be returned.
    pub fn into_typed<'a, T>(self) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.build_figment()
            .extract()
            .map_err(|e| from_figment_error(&self.lookup_sources, e))
    }

    /// Consumes the configuration loader and wraps it in a generic wrapper.
    pub fn into_generic(self) -> GenericConfiguration {
        let figment = self.build_figment();
        GenericConfiguration {
            inner: Arc::new(Inner {
                figment,
                lookup_sources: self.lookup_sources,
            }),
        }
    }
}

#[derive(Debug)]
struct Inner {
    figment: Figment,
    lookup_sources: HashSet<LookupSource>,
}

/// A generic configuration object.
///
/// This represents the merged configuration derived from [`ConfigurationLoader`] in its raw form. Values can be queried
/// by key, and extracted either as typed values or in their raw form.
///
/// Keys must be in the form of `a.b.c`, where periods (`.`) indicate a nested value. Querying `use_v2_api.series` will
/// find either a nested `use_v2_api: { series: ... }` value from a file, or a flat `use_v2_api_series` value from the
/// environment.
#[derive(Clone, Debug)]
pub struct GenericConfiguration {
    inner: Arc<Inner>,
}

impl GenericConfiguration {
    /// Creates an empty configuration.
    pub fn empty() -> Self {
        ConfigurationLoader::default().into_generic()
    }

    fn get<'a, T>(&self, key: &str) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        match self.inner.figment.extract_inner(key) {
            Ok(value) => Ok(value),
            Err(e) => {
                if matches!(e.kind, Kind::MissingField(_)) {
                    // Environment variables can't express nesting, so try again with the flattened form of the key.
                    let fallback_key = key.replace('.', "_");
                    self.inner
                        .figment
                        .extract_inner(&fallback_key)
                        .map_err(|fallback_e| from_figment_error(&self.inner.lookup_sources, fallback_e))
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Gets a configuration value by key.
    ///
    /// ## Errors
    ///
    /// If the key does not exist in the configuration, or if the value could not be deserialized into `T`, an error
    /// variant will be returned.
    pub fn get_typed<'a, T>(&self, key: &str) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.get(key)
    }

    /// Gets a configuration value by key, or the default value if the key does not exist or could not be deserialized.
    ///
    /// This swallows deserialization errors and should be used sparingly.
    pub fn get_typed_or_default<'a, T>(&self, key: &str) -> T
    where
        T: Default + Deserialize<'a>,
    {
        self.get(key).unwrap_or_default()
    }

    /// Gets a configuration value by key, if it exists.
    ///
    /// ## Errors
    ///
    /// If the value exists but could not be deserialized into `T`, an error will be returned.
    pub fn try_get_typed<'a, T>(&self, key: &str) -> Result<Option<T>, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigurationError::MissingField { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Attempts to deserialize the entire configuration as `T`.
    ///
    /// ## Errors
    ///
    /// If the value could not be deserialized into `T`, an error will be returned.
    pub fn as_typed<'a, T>(&self) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.inner
            .figment
            .extract()
            .map_err(|e| from_figment_error(&self.inner.lookup_sources, e))
    }
}

fn from_figment_error(lookup_sources: &HashSet<LookupSource>, e: figment::Error) -> ConfigurationError {
    match e.kind {
        Kind::MissingField(field) => {
            let mut valid_keys = lookup_sources
                .iter()
                .map(|source| source.transform_key(&field))
                .collect::<Vec<_>>();

            // Always offer the original key first.
            valid_keys.insert(0, field.to_string());

            let help_text = format!("Try setting `{}`.", valid_keys.join("` or `"));

            ConfigurationError::MissingField { help_text, field }
        }
        Kind::InvalidType(actual_ty, expected_ty) => ConfigurationError::InvalidFieldType {
            field: e.path.join("."),
            expected_ty,
            actual_ty: actual_ty.to_string(),
        },
        _ => ConfigurationError::Generic { source: e.into() },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_temp_file(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn nested_yaml_keys() {
        let file = write_temp_file("use_v2_api:\n  series: true\nserializer_compressor_kind: zstd\n", ".yaml");
        let config = ConfigurationLoader::default().from_yaml(file.path()).unwrap().into_generic();

        assert!(config.get_typed::<bool>("use_v2_api.series").unwrap());
        assert_eq!(
            config.get_typed::<String>("serializer_compressor_kind").unwrap(),
            "zstd"
        );
        assert_eq!(config.try_get_typed::<bool>("use_v2_api.events").unwrap(), None);
    }

    #[test]
    fn flattened_keys_fallback() {
        let config = ConfigurationLoader::default()
            .from_values(serde_json::json!({ "use_v2_api_events": true }))
            .into_generic();

        assert!(config.get_typed::<bool>("use_v2_api.events").unwrap());
    }

    #[test]
    fn typed_or_default_swallows_missing_and_mistyped() {
        let config = ConfigurationLoader::default()
            .from_values(serde_json::json!({
                "serializer_max_payload_size": "lots",
                "serializer_zstd_compressor_level": 7,
            }))
            .into_generic();

        assert_eq!(config.get_typed_or_default::<u64>("serializer_max_payload_size"), 0);
        assert_eq!(config.get_typed_or_default::<String>("serializer_compressor_kind"), "");
        assert_eq!(config.get_typed_or_default::<i32>("serializer_zstd_compressor_level"), 7);
    }

    #[test]
    fn whole_configuration_as_typed() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Limits {
            serializer_max_payload_size: u64,
            #[serde(default)]
            serializer_compressor_kind: String,
        }

        let config = ConfigurationLoader::default()
            .from_values(serde_json::json!({ "serializer_max_payload_size": 512 }))
            .into_generic();
        assert_eq!(
            config.as_typed::<Limits>().unwrap(),
            Limits {
                serializer_max_payload_size: 512,
                serializer_compressor_kind: String::new(),
            }
        );

        let empty = GenericConfiguration::empty();
        assert!(matches!(
            empty.as_typed::<Limits>(),
            Err(ConfigurationError::MissingField { .. })
        ));
    }

    #[test]
    fn later_sources_override_earlier() {
        let file = write_temp_file(r#"{"serializer_max_payload_size": 100, "use_v2_api": {"series": true}}"#, ".json");
        let config = ConfigurationLoader::default()
            .from_json(file.path())
            .unwrap()
            .from_values(serde_json::json!({ "serializer_max_payload_size": 200 }))
            .into_generic();

        assert_eq!(config.get_typed::<u64>("serializer_max_payload_size").unwrap(), 200);
        assert!(config.get_typed::<bool>("use_v2_api.series").unwrap());
    }

    #[test]
    fn environment_variables() {
        std::env::set_var("SLUICECFGTEST_SERIALIZER_COMPRESSOR_KIND", "zlib");
        let config = ConfigurationLoader::default()
            .from_environment("sluicecfgtest")
            .unwrap()
            .into_generic();
        std::env::remove_var("SLUICECFGTEST_SERIALIZER_COMPRESSOR_KIND");

        assert_eq!(
            config.get_typed::<String>("serializer_compressor_kind").unwrap(),
            "zlib"
        );
    }

    #[test]
    fn empty_environment_prefix() {
        let result = ConfigurationLoader::default().from_environment("");
        assert!(matches!(result, Err(ConfigurationError::EmptyPrefix)));
    }

    #[test]
    fn missing_field_help_text() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Required {
            serializer_max_payload_size: u64,
        }

        std::env::set_var("SLUICEHELPTEST_UNRELATED", "1");
        let result = ConfigurationLoader::default()
            .from_environment("SLUICEHELPTEST")
            .unwrap()
            .into_typed::<Required>();
        std::env::remove_var("SLUICEHELPTEST_UNRELATED");

        match result {
            Err(ConfigurationError::MissingField { help_text, field }) => {
                assert_eq!(field, "serializer_max_payload_size");
                assert!(help_text.contains("SLUICEHELPTEST_SERIALIZER_MAX_PAYLOAD_SIZE"));
            }
            other => panic!("expected missing field error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_field_type() {
        let config = ConfigurationLoader::default()
            .from_values(serde_json::json!({ "serializer_max_payload_size": "lots" }))
            .into_generic();

        let result = config.get_typed::<u64>("serializer_max_payload_size");
        assert!(matches!(result, Err(ConfigurationError::InvalidFieldType { .. })));
    }
}
