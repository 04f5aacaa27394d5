//! The typed, immutable artifact descriptor.

use crate::bundle::{BundleDependency, BundleDescriptor, DependencyModel};
use crate::error::{DescriptorError, DescriptorResult};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory, relative to an artifact root, holding the metadata file.
pub const ARTIFACT_METADATA_DIR: &str = "META-INF/keel-artifact";
/// Folder that declared configuration resources are relative to.
pub const CONFIG_FOLDER: &str = "keel";
/// Optional per-artifact properties file at the artifact root.
pub const ARTIFACT_PROPERTIES_FILE: &str = "keel-artifact.properties";

/// What an artifact is deployed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Domain,
    Application,
    Plugin,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Domain, Self::Application, Self::Plugin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Application => "application",
            Self::Plugin => "plugin",
        }
    }

    /// File name of the metadata model inside [`ARTIFACT_METADATA_DIR`].
    pub fn descriptor_file_name(&self) -> &'static str {
        match self {
            Self::Domain => "keel-domain.json",
            Self::Application => "keel-application.json",
            Self::Plugin => "keel-plugin.json",
        }
    }

    /// Metadata file location relative to the artifact root.
    pub fn descriptor_path(&self) -> PathBuf {
        Path::new(ARTIFACT_METADATA_DIR).join(self.descriptor_file_name())
    }

    /// Configuration resource used when the model declares none.
    /// Plugins carry no configuration resources.
    pub fn default_config_resource(&self) -> Option<&'static str> {
        match self {
            Self::Domain => Some("keel-domain-config.xml"),
            Self::Application => Some("keel-config.xml"),
            Self::Plugin => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration resource as both the declared relative path and its
/// absolute location under the artifact root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigResource {
    pub relative: String,
    pub absolute: PathBuf,
}

impl ConfigResource {
    /// Resolves `config` (relative to [`CONFIG_FOLDER`]) under `root`.
    pub fn under(root: &Path, config: &str) -> Self {
        let relative = format!("{CONFIG_FOLDER}/{}", config.trim_start_matches('/'));
        let absolute = root.join(&relative);
        Self { relative, absolute }
    }
}

/// Checks that `name` can identify a live artifact: non-empty, no path
/// separator, no whitespace.
pub fn validate_artifact_name(name: &str) -> DescriptorResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(['/', '\\']) {
        "name contains a path separator"
    } else if name.chars().any(char::is_whitespace) {
        "name contains whitespace"
    } else {
        return Ok(());
    };
    Err(DescriptorError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

/// Describes a domain, application or plugin.
///
/// Built once by a descriptor factory (or [`ArtifactDescriptorBuilder`]) and
/// never mutated afterwards. Resolution results live in separate stage types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    name: String,
    kind: ArtifactKind,
    root: PathBuf,
    bundle: Option<BundleDescriptor>,
    min_runtime_version: Version,
    redeployment_enabled: bool,
    config_resources: Vec<ConfigResource>,
    dependency_model: Option<DependencyModel>,
    properties: BTreeMap<String, String>,
    domain: Option<String>,
}

/// A plugin is an artifact descriptor of kind [`ArtifactKind::Plugin`].
pub type PluginDescriptor = ArtifactDescriptor;

impl ArtifactDescriptor {
    pub fn builder(
        name: impl Into<String>,
        kind: ArtifactKind,
        root: impl Into<PathBuf>,
    ) -> ArtifactDescriptorBuilder {
        ArtifactDescriptorBuilder::new(name, kind, root)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bundle(&self) -> Option<&BundleDescriptor> {
        self.bundle.as_ref()
    }

    pub fn min_runtime_version(&self) -> &Version {
        &self.min_runtime_version
    }

    pub fn redeployment_enabled(&self) -> bool {
        self.redeployment_enabled
    }

    pub fn config_resources(&self) -> &[ConfigResource] {
        &self.config_resources
    }

    /// Absolute paths of the configuration resources, aligned with
    /// [`config_resources`](Self::config_resources).
    pub fn absolute_resource_paths(&self) -> Vec<&Path> {
        self.config_resources
            .iter()
            .map(|resource| resource.absolute.as_path())
            .collect()
    }

    pub fn dependency_model(&self) -> Option<&DependencyModel> {
        self.dependency_model.as_ref()
    }

    /// Dependency edges flagged as plugins; empty without a dependency model.
    pub fn plugin_dependencies(&self) -> Vec<&BundleDependency> {
        self.dependency_model
            .iter()
            .flat_map(DependencyModel::plugin_dependencies)
            .collect()
    }

    /// Dependency edges that are plain libraries.
    pub fn library_dependencies(&self) -> Vec<&BundleDependency> {
        self.dependency_model
            .iter()
            .flat_map(DependencyModel::library_dependencies)
            .collect()
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The domain an application deploys into; `None` means the default domain.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}

impl fmt::Display for ArtifactDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// Assembles an [`ArtifactDescriptor`]; `build` enforces the name invariant.
#[derive(Debug, Clone)]
pub struct ArtifactDescriptorBuilder {
    descriptor: ArtifactDescriptor,
}

impl ArtifactDescriptorBuilder {
    fn new(name: impl Into<String>, kind: ArtifactKind, root: impl Into<PathBuf>) -> Self {
        Self {
            descriptor: ArtifactDescriptor {
                name: name.into(),
                kind,
                root: root.into(),
                bundle: None,
                min_runtime_version: Version::new(0, 0, 0),
                redeployment_enabled: true,
                config_resources: Vec::new(),
                dependency_model: None,
                properties: BTreeMap::new(),
                domain: None,
            },
        }
    }

    pub fn bundle(mut self, bundle: BundleDescriptor) -> Self {
        self.descriptor.bundle = Some(bundle);
        self
    }

    pub fn min_runtime_version(mut self, version: Version) -> Self {
        self.descriptor.min_runtime_version = version;
        self
    }

    pub fn redeployment_enabled(mut self, enabled: bool) -> Self {
        self.descriptor.redeployment_enabled = enabled;
        self
    }

    pub fn config_resource(mut self, resource: ConfigResource) -> Self {
        self.descriptor.config_resources.push(resource);
        self
    }

    pub fn dependency_model(mut self, model: DependencyModel) -> Self {
        self.descriptor.dependency_model = Some(model);
        self
    }

    pub fn properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.descriptor.properties = properties;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.properties.insert(key.into(), value.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.descriptor.domain = Some(domain.into());
        self
    }

    pub fn build(self) -> DescriptorResult<ArtifactDescriptor> {
        validate_artifact_name(&self.descriptor.name)?;
        Ok(self.descriptor)
    }
}
