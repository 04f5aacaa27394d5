//! Builds artifact descriptors from an artifact root on disk.

use crate::descriptor::{validate_artifact_name, ArtifactDescriptor, ArtifactKind, ConfigResource};
use crate::error::{DescriptorError, DescriptorResult};
use crate::loader::DescriptorLoaderRepository;
use crate::model::ArtifactModel;
use crate::properties::{read_artifact_properties, SystemProperties};
use semver::Version;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates descriptors of one [`ArtifactKind`].
///
/// The metadata file is located at [`ArtifactKind::descriptor_path`] under the
/// artifact root; there is no fallback when it is absent.
pub struct DescriptorFactory {
    kind: ArtifactKind,
    loaders: Arc<DescriptorLoaderRepository>,
    system_properties: SystemProperties,
}

impl DescriptorFactory {
    pub fn new(
        kind: ArtifactKind,
        loaders: Arc<DescriptorLoaderRepository>,
        system_properties: SystemProperties,
    ) -> Self {
        Self {
            kind,
            loaders,
            system_properties,
        }
    }

    pub fn domain(loaders: Arc<DescriptorLoaderRepository>, system_properties: SystemProperties) -> Self {
        Self::new(ArtifactKind::Domain, loaders, system_properties)
    }

    pub fn application(
        loaders: Arc<DescriptorLoaderRepository>,
        system_properties: SystemProperties,
    ) -> Self {
        Self::new(ArtifactKind::Application, loaders, system_properties)
    }

    pub fn plugin(loaders: Arc<DescriptorLoaderRepository>) -> Self {
        Self::new(ArtifactKind::Plugin, loaders, SystemProperties::new())
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn system_properties(&self) -> &SystemProperties {
        &self.system_properties
    }

    /// Reads and parses the artifact at `artifact_root`.
    ///
    /// # Errors
    /// - [`DescriptorError::MissingDescriptorFile`] when the metadata file is absent
    /// - [`DescriptorError::MalformedDescriptor`] when it cannot be parsed, the
    ///   name is invalid, or the minimum runtime version is not semver
    /// - [`DescriptorError::LoaderNotFound`] when a referenced loader id is not
    ///   registered for this kind
    pub fn create(&self, artifact_root: &Path) -> DescriptorResult<ArtifactDescriptor> {
        let descriptor_path = artifact_root.join(self.kind.descriptor_path());
        if !descriptor_path.is_file() {
            return Err(DescriptorError::MissingDescriptorFile(descriptor_path));
        }

        let json = std::fs::read_to_string(&descriptor_path).map_err(|source| DescriptorError::Io {
            path: descriptor_path.clone(),
            source,
        })?;
        let model = ArtifactModel::from_json(&json)
            .map_err(|e| DescriptorError::malformed(&descriptor_path, e))?;

        let name = match &model.name {
            Some(name) => name.clone(),
            None => artifact_root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        validate_artifact_name(&name).map_err(|e| DescriptorError::malformed(&descriptor_path, e))?;

        let min_runtime_version = Version::parse(&model.min_runtime_version).map_err(|e| {
            DescriptorError::malformed(
                &descriptor_path,
                format!("invalid minRuntimeVersion '{}': {e}", model.min_runtime_version),
            )
        })?;

        let bundle_loader = &model.bundle_descriptor_loader;
        let bundle = self
            .loaders
            .bundle_loader(&bundle_loader.id, self.kind, artifact_root)?
            .load(artifact_root, &bundle_loader.attributes, self.kind)?;

        let mut builder = ArtifactDescriptor::builder(name.as_str(), self.kind, artifact_root)
            .bundle(bundle)
            .min_runtime_version(min_runtime_version)
            .redeployment_enabled(model.redeployment_enabled);

        for resource in self.config_resources(artifact_root, &model) {
            builder = builder.config_resource(resource);
        }

        if let Some(dependency_loader) = &model.dependency_model_loader {
            let dependency_model = self
                .loaders
                .dependency_model_loader(&dependency_loader.id, self.kind, artifact_root)?
                .load(artifact_root, &dependency_loader.attributes, self.kind)?;
            debug!(
                artifact = %name,
                dependencies = dependency_model.dependencies.len(),
                "Loaded dependency model"
            );
            builder = builder.dependency_model(dependency_model);
        }

        builder = builder.properties(self.properties(artifact_root)?);

        if let Some(domain) = &model.domain {
            if self.kind == ArtifactKind::Application {
                builder = builder.domain(domain.as_str());
            } else {
                warn!(artifact = %name, kind = %self.kind, "Ignoring domain declared by a non-application artifact");
            }
        }

        let descriptor = builder.build()?;
        info!(
            artifact = %descriptor.name(),
            kind = %self.kind,
            root = %artifact_root.display(),
            "Created artifact descriptor"
        );
        Ok(descriptor)
    }

    /// Builds a descriptor without any metadata file, used for the default
    /// domain. Only the system-level overrides populate its properties.
    pub fn create_empty(&self, name: &str, artifact_root: &Path) -> DescriptorResult<ArtifactDescriptor> {
        let mut properties = Default::default();
        self.system_properties.apply(&mut properties);
        ArtifactDescriptor::builder(name, self.kind, artifact_root)
            .properties(properties)
            .build()
    }

    fn config_resources(&self, root: &Path, model: &ArtifactModel) -> Vec<ConfigResource> {
        let Some(default_config) = self.kind.default_config_resource() else {
            if !model.configs.is_empty() {
                warn!(root = %root.display(), "Plugins carry no configuration resources; ignoring configs");
            }
            return Vec::new();
        };

        if model.configs.is_empty() {
            vec![ConfigResource::under(root, default_config)]
        } else {
            model
                .configs
                .iter()
                .map(|config| ConfigResource::under(root, config))
                .collect()
        }
    }

    fn properties(&self, root: &Path) -> DescriptorResult<std::collections::BTreeMap<String, String>> {
        let mut properties = read_artifact_properties(root)?;
        self.system_properties.apply(&mut properties);
        Ok(properties)
    }
}
