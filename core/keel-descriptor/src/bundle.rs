//! Bundle coordinates and the dependency graph declared by an artifact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

fn default_bundle_type() -> String {
    "jar".to_string()
}

/// Identity of a bundle: `group:artifact:version[:classifier]:type`.
///
/// Versions are kept as declared; coordinate parsing is left to the bundle
/// descriptor loader that produced the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(rename = "type", default = "default_bundle_type")]
    pub bundle_type: String,
}

impl BundleDescriptor {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
            bundle_type: default_bundle_type(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn with_type(mut self, bundle_type: impl Into<String>) -> Self {
        self.bundle_type = bundle_type.into();
        self
    }
}

impl fmt::Display for BundleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, ":{}", self.bundle_type)
    }
}

/// One edge of an artifact's dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDependency {
    pub descriptor: BundleDescriptor,
    /// Where the dependency lives on disk. For plugin dependencies this is the
    /// plugin's artifact root.
    pub location: PathBuf,
    pub plugin: bool,
}

impl BundleDependency {
    pub fn library(descriptor: BundleDescriptor, location: impl Into<PathBuf>) -> Self {
        Self {
            descriptor,
            location: location.into(),
            plugin: false,
        }
    }

    pub fn plugin(descriptor: BundleDescriptor, location: impl Into<PathBuf>) -> Self {
        Self {
            descriptor,
            location: location.into(),
            plugin: true,
        }
    }
}

/// The raw dependency graph produced by a dependency model loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyModel {
    pub dependencies: Vec<BundleDependency>,
}

impl DependencyModel {
    pub fn new(dependencies: Vec<BundleDependency>) -> Self {
        Self { dependencies }
    }

    pub fn plugin_dependencies(&self) -> impl Iterator<Item = &BundleDependency> {
        self.dependencies.iter().filter(|dependency| dependency.plugin)
    }

    pub fn library_dependencies(&self) -> impl Iterator<Item = &BundleDependency> {
        self.dependencies.iter().filter(|dependency| !dependency.plugin)
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}
