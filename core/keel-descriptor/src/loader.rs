//! Loader capabilities and the registration table they are looked up in.
//!
//! A metadata model names its loaders by id (`"declared"`, or anything a host
//! registers at startup). The repository maps `(id, capability)` to a loader and
//! the artifact kinds it supports; lookups are explicit, with no discovery.

use crate::bundle::{BundleDependency, BundleDescriptor, DependencyModel};
use crate::descriptor::ArtifactKind;
use crate::error::{DescriptorError, DescriptorResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Id of the built-in loaders that read everything from the model attributes.
pub const DECLARED_LOADER_ID: &str = "declared";

/// What a registered loader can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderCapability {
    BundleDescriptor,
    DependencyModel,
}

impl fmt::Display for LoaderCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BundleDescriptor => "bundle-descriptor",
            Self::DependencyModel => "dependency-model",
        })
    }
}

/// Produces an artifact's bundle identity.
pub trait BundleDescriptorLoader: Send + Sync {
    fn load(
        &self,
        artifact_root: &Path,
        attributes: &Map<String, Value>,
        kind: ArtifactKind,
    ) -> DescriptorResult<BundleDescriptor>;
}

/// Produces an artifact's raw dependency graph.
pub trait DependencyModelLoader: Send + Sync {
    fn load(
        &self,
        artifact_root: &Path,
        attributes: &Map<String, Value>,
        kind: ArtifactKind,
    ) -> DescriptorResult<DependencyModel>;
}

/// A loader as returned by [`DescriptorLoaderRepository::get`], tagged by
/// capability.
#[derive(Clone)]
pub enum DescriptorLoader {
    Bundle(Arc<dyn BundleDescriptorLoader>),
    DependencyModel(Arc<dyn DependencyModelLoader>),
}

impl DescriptorLoader {
    pub fn capability(&self) -> LoaderCapability {
        match self {
            Self::Bundle(_) => LoaderCapability::BundleDescriptor,
            Self::DependencyModel(_) => LoaderCapability::DependencyModel,
        }
    }
}

impl fmt::Debug for DescriptorLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DescriptorLoader({})", self.capability())
    }
}

struct Registration {
    kinds: Vec<ArtifactKind>,
    loader: DescriptorLoader,
}

/// Registration table of descriptor loaders.
pub struct DescriptorLoaderRepository {
    loaders: HashMap<(String, LoaderCapability), Registration>,
}

impl DescriptorLoaderRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// A repository with the `declared` loaders registered for every kind.
    pub fn with_builtin() -> Self {
        let mut repository = Self::new();
        repository.register_bundle_loader(
            DECLARED_LOADER_ID,
            &ArtifactKind::ALL,
            Arc::new(DeclaredBundleDescriptorLoader),
        );
        repository.register_dependency_model_loader(
            DECLARED_LOADER_ID,
            &ArtifactKind::ALL,
            Arc::new(DeclaredDependencyModelLoader),
        );
        repository
    }

    pub fn register_bundle_loader(
        &mut self,
        id: impl Into<String>,
        kinds: &[ArtifactKind],
        loader: Arc<dyn BundleDescriptorLoader>,
    ) {
        self.register(id.into(), kinds, DescriptorLoader::Bundle(loader));
    }

    pub fn register_dependency_model_loader(
        &mut self,
        id: impl Into<String>,
        kinds: &[ArtifactKind],
        loader: Arc<dyn DependencyModelLoader>,
    ) {
        self.register(id.into(), kinds, DescriptorLoader::DependencyModel(loader));
    }

    fn register(&mut self, id: String, kinds: &[ArtifactKind], loader: DescriptorLoader) {
        let capability = loader.capability();
        let registration = Registration {
            kinds: kinds.to_vec(),
            loader,
        };
        if self.loaders.insert((id.clone(), capability), registration).is_some() {
            warn!(loader_id = %id, capability = %capability, "Replacing registered descriptor loader");
        } else {
            debug!(loader_id = %id, capability = %capability, "Registered descriptor loader");
        }
    }

    /// Looks up the loader registered under `id` for `capability`.
    ///
    /// Fails with [`DescriptorError::LoaderNotFound`] when nothing is registered
    /// under that id or the registration does not support `kind`. `location` is
    /// the artifact asking, reported in the error.
    pub fn get(
        &self,
        id: &str,
        kind: ArtifactKind,
        capability: LoaderCapability,
        location: &Path,
    ) -> DescriptorResult<DescriptorLoader> {
        self.loaders
            .get(&(id.to_string(), capability))
            .filter(|registration| registration.kinds.contains(&kind))
            .map(|registration| registration.loader.clone())
            .ok_or_else(|| DescriptorError::LoaderNotFound {
                id: id.to_string(),
                kind,
                capability,
                location: location.to_path_buf(),
            })
    }

    pub fn bundle_loader(
        &self,
        id: &str,
        kind: ArtifactKind,
        location: &Path,
    ) -> DescriptorResult<Arc<dyn BundleDescriptorLoader>> {
        match self.get(id, kind, LoaderCapability::BundleDescriptor, location)? {
            DescriptorLoader::Bundle(loader) => Ok(loader),
            DescriptorLoader::DependencyModel(_) => Err(DescriptorError::LoaderNotFound {
                id: id.to_string(),
                kind,
                capability: LoaderCapability::BundleDescriptor,
                location: location.to_path_buf(),
            }),
        }
    }

    pub fn dependency_model_loader(
        &self,
        id: &str,
        kind: ArtifactKind,
        location: &Path,
    ) -> DescriptorResult<Arc<dyn DependencyModelLoader>> {
        match self.get(id, kind, LoaderCapability::DependencyModel, location)? {
            DescriptorLoader::DependencyModel(loader) => Ok(loader),
            DescriptorLoader::Bundle(_) => Err(DescriptorError::LoaderNotFound {
                id: id.to_string(),
                kind,
                capability: LoaderCapability::DependencyModel,
                location: location.to_path_buf(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl Default for DescriptorLoaderRepository {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Reads bundle coordinates straight from the loader attributes:
/// `groupId`, `artifactId`, `version`, optional `classifier` and `type`.
pub struct DeclaredBundleDescriptorLoader;

impl BundleDescriptorLoader for DeclaredBundleDescriptorLoader {
    fn load(
        &self,
        artifact_root: &Path,
        attributes: &Map<String, Value>,
        _kind: ArtifactKind,
    ) -> DescriptorResult<BundleDescriptor> {
        serde_json::from_value(Value::Object(attributes.clone())).map_err(|e| {
            DescriptorError::malformed(artifact_root, format!("invalid bundle coordinates: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct DeclaredDependency {
    #[serde(flatten)]
    descriptor: BundleDescriptor,
    location: PathBuf,
    #[serde(default)]
    plugin: bool,
}

#[derive(Debug, Default, Deserialize)]
struct DeclaredDependencies {
    #[serde(default)]
    dependencies: Vec<DeclaredDependency>,
}

/// Reads the dependency list from the `dependencies` attribute. Relative
/// locations are resolved against the artifact root.
pub struct DeclaredDependencyModelLoader;

impl DependencyModelLoader for DeclaredDependencyModelLoader {
    fn load(
        &self,
        artifact_root: &Path,
        attributes: &Map<String, Value>,
        _kind: ArtifactKind,
    ) -> DescriptorResult<DependencyModel> {
        let declared: DeclaredDependencies = serde_json::from_value(Value::Object(attributes.clone()))
            .map_err(|e| {
                DescriptorError::malformed(artifact_root, format!("invalid dependency list: {e}"))
            })?;

        let dependencies = declared
            .dependencies
            .into_iter()
            .map(|dependency| BundleDependency {
                descriptor: dependency.descriptor,
                location: artifact_root.join(dependency.location),
                plugin: dependency.plugin,
            })
            .collect();
        Ok(DependencyModel::new(dependencies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn builtin_loaders_cover_every_kind() {
        let repository = DescriptorLoaderRepository::with_builtin();
        assert_eq!(repository.len(), 2);
        for kind in ArtifactKind::ALL {
            for capability in [LoaderCapability::BundleDescriptor, LoaderCapability::DependencyModel] {
                let loader = repository
                    .get(DECLARED_LOADER_ID, kind, capability, Path::new("/a"))
                    .unwrap();
                assert_eq!(loader.capability(), capability);
            }
        }
    }

    #[test]
    fn unknown_id_reports_id_and_location() {
        let repository = DescriptorLoaderRepository::with_builtin();
        let err = repository
            .get("maven", ArtifactKind::Application, LoaderCapability::DependencyModel, Path::new("/apps/orders"))
            .unwrap_err();
        match err {
            DescriptorError::LoaderNotFound { id, location, .. } => {
                assert_eq!(id, "maven");
                assert_eq!(location, PathBuf::from("/apps/orders"));
            }
            other => panic!("expected LoaderNotFound, got {other:?}"),
        }
    }

    #[test]
    fn registration_is_kind_aware() {
        let mut repository = DescriptorLoaderRepository::new();
        repository.register_bundle_loader("plugins-only", &[ArtifactKind::Plugin], Arc::new(DeclaredBundleDescriptorLoader));

        assert!(repository.bundle_loader("plugins-only", ArtifactKind::Plugin, Path::new("/p")).is_ok());
        assert!(repository.bundle_loader("plugins-only", ArtifactKind::Domain, Path::new("/d")).is_err());
        assert!(repository
            .dependency_model_loader("plugins-only", ArtifactKind::Plugin, Path::new("/p"))
            .is_err());
    }

    #[test]
    fn declared_bundle_loader_reads_coordinates() {
        let bundle = DeclaredBundleDescriptorLoader
            .load(
                Path::new("/apps/orders"),
                &attributes(json!({
                    "groupId": "com.acme",
                    "artifactId": "orders",
                    "version": "1.0.0",
                    "classifier": "keel-application"
                })),
                ArtifactKind::Application,
            )
            .unwrap();
        assert_eq!(bundle.to_string(), "com.acme:orders:1.0.0:keel-application:jar");
    }

    #[test]
    fn declared_bundle_loader_rejects_missing_version() {
        let err = DeclaredBundleDescriptorLoader
            .load(
                Path::new("/apps/orders"),
                &attributes(json!({ "groupId": "com.acme", "artifactId": "orders" })),
                ArtifactKind::Application,
            )
            .unwrap_err();
        assert!(matches!(err, DescriptorError::MalformedDescriptor { .. }));
    }

    #[test]
    fn declared_dependencies_resolve_relative_locations() {
        let model = DeclaredDependencyModelLoader
            .load(
                Path::new("/apps/orders"),
                &attributes(json!({
                    "dependencies": [
                        { "groupId": "g", "artifactId": "http", "version": "1.0.0",
                          "location": "../../plugins/http", "plugin": true },
                        { "groupId": "g", "artifactId": "util", "version": "2.0.0",
                          "location": "/lib/util.jar" }
                    ]
                })),
                ArtifactKind::Application,
            )
            .unwrap();

        assert_eq!(model.dependencies.len(), 2);
        assert!(model.dependencies[0].plugin);
        assert_eq!(model.dependencies[0].location, PathBuf::from("/apps/orders/../../plugins/http"));
        assert!(!model.dependencies[1].plugin);
        assert_eq!(model.dependencies[1].location, PathBuf::from("/lib/util.jar"));
    }

    #[test]
    fn declared_dependencies_default_to_empty() {
        let model = DeclaredDependencyModelLoader
            .load(Path::new("/a"), &Map::new(), ArtifactKind::Domain)
            .unwrap();
        assert!(model.is_empty());
    }
}
