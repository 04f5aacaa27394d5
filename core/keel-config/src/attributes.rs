//! Configuration attributes read from a properties file.

use crate::attribute::{AttributeLookup, ConfigurationAttribute};
use crate::error::{ConfigError, ConfigResult};
use crate::properties::parse_properties;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The attributes declared by one file, in declaration order.
///
/// Every attribute's source is the file location it was read from.
#[derive(Debug, Clone)]
pub struct ConfigurationAttributes {
    location: PathBuf,
    attributes: Vec<ConfigurationAttribute>,
}

impl ConfigurationAttributes {
    /// Reads attributes from `path`.
    ///
    /// Fails with [`ConfigError::AttributesFileNotFound`] when the file does not
    /// exist and [`ConfigError::Io`] when it cannot be read.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let location = path.as_ref().to_path_buf();
        if !location.exists() {
            return Err(ConfigError::AttributesFileNotFound(location));
        }

        let contents = std::fs::read_to_string(&location).map_err(|source| ConfigError::Io {
            path: location.clone(),
            source,
        })?;

        let source = location.display().to_string();
        let attributes = parse_properties(&contents)
            .into_iter()
            .map(|(key, value)| ConfigurationAttribute::new(source.as_str(), key, value))
            .collect::<ConfigResult<Vec<_>>>()?;

        debug!(path = %location.display(), count = attributes.len(), "Loaded configuration attributes");
        Ok(Self {
            location,
            attributes,
        })
    }

    /// Wraps attributes that did not come from a file (deployment properties,
    /// tests). `location` is used only for diagnostics.
    pub fn from_attributes(location: impl Into<PathBuf>, attributes: Vec<ConfigurationAttribute>) -> Self {
        Self {
            location: location.into(),
            attributes,
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn attributes(&self) -> &[ConfigurationAttribute] {
        &self.attributes
    }

    pub fn into_attributes(self) -> Vec<ConfigurationAttribute> {
        self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl AttributeLookup for ConfigurationAttributes {
    fn raw_value(&self, key: &str) -> Option<String> {
        self.attributes.raw_value(key)
    }
}
