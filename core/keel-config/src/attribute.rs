//! A single configuration attribute and the lookup seam used by resolvers.

use crate::error::{ConfigError, ConfigResult};

/// A configuration value declared by some source.
///
/// The raw value is stored unresolved and may itself contain `${key}`
/// placeholders. Attributes are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationAttribute {
    source: String,
    key: String,
    raw_value: String,
}

impl ConfigurationAttribute {
    /// Creates a new attribute.
    ///
    /// `source` identifies what declared the attribute (an artifact
    /// configuration file, deployment-time properties, ...). It must not be
    /// empty.
    pub fn new(
        source: impl Into<String>,
        key: impl Into<String>,
        raw_value: impl Into<String>,
    ) -> ConfigResult<Self> {
        let source = source.into();
        let key = key.into();
        if source.trim().is_empty() {
            return Err(ConfigError::EmptySource(key));
        }
        Ok(Self {
            source,
            key,
            raw_value: raw_value.into(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value as declared, without placeholder resolution.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }
}

/// Source of raw attribute values for one resolver scope.
///
/// Implementations return the raw value of the first attribute declared under
/// `key`, or `None` when the scope does not declare it.
pub trait AttributeLookup: Send + Sync {
    fn raw_value(&self, key: &str) -> Option<String>;
}

impl AttributeLookup for Vec<ConfigurationAttribute> {
    fn raw_value(&self, key: &str) -> Option<String> {
        self.iter()
            .find(|attribute| attribute.key == key)
            .map(|attribute| attribute.raw_value.clone())
    }
}
