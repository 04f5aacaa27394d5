//! Artifact properties and system-level overrides.

use crate::descriptor::ARTIFACT_PROPERTIES_FILE;
use crate::error::{DescriptorError, DescriptorResult};
use keel_config::parse_properties;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Prefix marking a system-level property override entry.
pub const OVERRIDE_PREFIX: &str = "-O";

/// Deployment-wide property overrides, given as `-O<key>=<value>` entries.
///
/// Overrides are merged over every artifact's file properties, so the same key
/// declared in both places takes the override's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemProperties {
    overrides: BTreeMap<String, String>,
}

impl SystemProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects overrides from command-line style entries. Entries without
    /// the `-O` prefix or without `=` are ignored; a later entry for the same
    /// key wins.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let overrides = args
            .into_iter()
            .filter_map(|arg| {
                let entry = arg.as_ref().strip_prefix(OVERRIDE_PREFIX)?;
                let (key, value) = entry.split_once('=')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect();
        Self { overrides }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            overrides: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.overrides
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Merges the overrides over `properties`.
    pub fn apply(&self, properties: &mut BTreeMap<String, String>) {
        for (key, value) in &self.overrides {
            properties.insert(key.clone(), value.clone());
        }
    }
}

/// Reads `keel-artifact.properties` from `root`. A missing file yields no
/// properties.
pub fn read_artifact_properties(root: &Path) -> DescriptorResult<BTreeMap<String, String>> {
    let path = root.join(ARTIFACT_PROPERTIES_FILE);
    if !path.is_file() {
        return Ok(BTreeMap::new());
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|source| DescriptorError::Io { path: path.clone(), source })?;
    let properties: BTreeMap<_, _> = parse_properties(&contents).into_iter().collect();
    debug!(path = %path.display(), count = properties.len(), "Read artifact properties");
    Ok(properties)
}
