//! Artifact descriptors for Keel.
//!
//! A domain, application or plugin ships a JSON metadata model under
//! `META-INF/keel-artifact/`. [`DescriptorFactory`] reads it, asks the
//! [`DescriptorLoaderRepository`] for the bundle identity and dependency graph,
//! and produces an immutable [`ArtifactDescriptor`].

mod bundle;
mod descriptor;
mod error;
mod factory;
mod loader;
mod model;
mod properties;

pub use bundle::{BundleDependency, BundleDescriptor, DependencyModel};
pub use descriptor::{
    validate_artifact_name, ArtifactDescriptor, ArtifactDescriptorBuilder, ArtifactKind,
    ConfigResource, PluginDescriptor, ARTIFACT_METADATA_DIR, ARTIFACT_PROPERTIES_FILE,
    CONFIG_FOLDER,
};
pub use error::{DescriptorError, DescriptorResult};
pub use factory::DescriptorFactory;
pub use loader::{
    BundleDescriptorLoader, DeclaredBundleDescriptorLoader, DeclaredDependencyModelLoader,
    DependencyModelLoader, DescriptorLoader, DescriptorLoaderRepository, LoaderCapability,
    DECLARED_LOADER_ID,
};
pub use model::{ArtifactModel, LoaderModel};
pub use properties::{read_artifact_properties, SystemProperties, OVERRIDE_PREFIX};
