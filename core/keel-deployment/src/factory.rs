//! Domain and application factories.
//!
//! Both run the same pipeline: descriptor, plugin resolution against the
//! host's plugins, isolation hierarchy, wrapper, registry. A failure at any
//! step leaves no registry entry and no scopes behind.

use crate::artifact::{
    attribute_resolver_for, DefaultApplication, DefaultDomain, DeployableArtifact, ResolvedArtifact,
};
use crate::context::DeploymentContext;
use crate::error::{DeploymentError, DeploymentResult};
use crate::isolation::{ArtifactScopes, IsolationHierarchyBuilder, ScopeId, ScopeKind};
use crate::resolver::PluginDependenciesResolver;
use crate::wrapper::{ArtifactWrapper, LifecycleHooks};
use keel_config::ConfigurationAttributesResolver;
use keel_descriptor::{
    validate_artifact_name, ArtifactDescriptor, ArtifactKind, DescriptorError, DescriptorFactory,
    PluginDescriptor,
};
use std::sync::Arc;
use tracing::{info, warn};

fn check_name(name: &str, registry_has: bool) -> DeploymentResult<()> {
    validate_artifact_name(name).map_err(|e| match e {
        DescriptorError::InvalidName { name, reason } => DeploymentError::InvalidName { name, reason },
        other => DeploymentError::Descriptor(other),
    })?;
    if registry_has {
        return Err(DeploymentError::DuplicateName(name.to_string()));
    }
    Ok(())
}

fn check_descriptor_name(requested: &str, descriptor: &ArtifactDescriptor) -> DeploymentResult<()> {
    if descriptor.name() != requested {
        return Err(DeploymentError::InvalidName {
            name: requested.to_string(),
            reason: format!("descriptor declares the name '{}'", descriptor.name()),
        });
    }
    Ok(())
}

/// Steps shared by both factories.
struct Pipeline {
    kind: ArtifactKind,
    context: Arc<DeploymentContext>,
    resolver: PluginDependenciesResolver,
    hierarchy: IsolationHierarchyBuilder,
    hooks: LifecycleHooks,
}

impl Pipeline {
    fn new(kind: ArtifactKind, context: Arc<DeploymentContext>) -> Self {
        Self {
            kind,
            resolver: context.plugin_resolver(),
            hierarchy: IsolationHierarchyBuilder::new(Arc::clone(context.arena())),
            hooks: LifecycleHooks::default(),
            context,
        }
    }

    /// Resolves the descriptor's plugins against `host` and keeps the ones the
    /// unit must load itself.
    fn resolve(
        &self,
        descriptor: ArtifactDescriptor,
        host: &[PluginDescriptor],
    ) -> DeploymentResult<ResolvedArtifact> {
        let plugins = self
            .resolver
            .resolve(descriptor.dependency_model(), host)?
            .into_iter()
            .filter(|plugin| !host.contains(plugin))
            .collect();
        Ok(ResolvedArtifact { descriptor, plugins })
    }

    /// Builds scopes and the attribute resolver, then hands the finished unit
    /// to `make` and registers the wrapped result.
    fn deploy<F>(
        &self,
        resolved: ResolvedArtifact,
        parent_scope: ScopeId,
        parent_resolver: Option<Arc<ConfigurationAttributesResolver>>,
        make: F,
    ) -> DeploymentResult<Arc<ArtifactWrapper>>
    where
        F: FnOnce(ResolvedArtifact, ArtifactScopes, Arc<ConfigurationAttributesResolver>) -> Arc<dyn DeployableArtifact>,
    {
        let scopes = self
            .hierarchy
            .build(&resolved.descriptor, &resolved.plugins, Some(parent_scope))?;
        let unit_scope = scopes.unit;
        let name = resolved.descriptor.name().to_string();

        let registered = attribute_resolver_for(&resolved.descriptor, parent_resolver).and_then(|resolver| {
            let wrapper = Arc::new(ArtifactWrapper::with_hooks(make(resolved, scopes, resolver), self.hooks));
            self.context.registry().register(&name, wrapper.clone())?;
            Ok(wrapper)
        });

        if registered.is_err() {
            self.context.arena().teardown(unit_scope);
        }
        registered
    }

    /// Unregisters `name`, disposes it and tears its scopes down.
    ///
    /// Refuses artifacts of another kind, and units that still have other
    /// units deployed under their scope. An unknown name is a no-op.
    fn dispose(&self, name: &str) -> DeploymentResult<()> {
        let _deployments = self.context.deployment_guard();
        let registry = self.context.registry();
        let Some(artifact) = registry.lookup(name) else {
            return Ok(());
        };

        let kind = artifact.descriptor().kind();
        if kind != self.kind {
            return Err(DeploymentError::KindMismatch {
                name: name.to_string(),
                expected: self.kind,
                actual: kind,
            });
        }

        let arena = self.context.arena();
        let dependents: Vec<String> = arena
            .children(artifact.scope())
            .into_iter()
            .filter_map(|id| arena.get(id))
            .filter(|scope| scope.kind != ScopeKind::Plugin)
            .map(|scope| scope.name)
            .collect();
        if !dependents.is_empty() {
            return Err(DeploymentError::lifecycle(
                name,
                "dispose",
                format!("applications still deployed: {}", dependents.join(", ")),
            ));
        }

        let Some(artifact) = registry.unregister(name) else {
            return Ok(());
        };
        let disposed = artifact.dispose();
        if let Err(e) = &disposed {
            warn!(artifact = %name, error = %e, "Artifact failed to dispose, tearing down scopes anyway");
        }
        arena.teardown(artifact.scope());
        disposed
    }
}

/// Creates and disposes domains.
pub struct DomainFactory {
    descriptors: DescriptorFactory,
    pipeline: Pipeline,
}

impl DomainFactory {
    pub fn new(context: Arc<DeploymentContext>) -> Self {
        let descriptors = DescriptorFactory::domain(
            Arc::clone(context.loaders()),
            context.config().system_properties(),
        );
        Self {
            descriptors,
            pipeline: Pipeline::new(ArtifactKind::Domain, context),
        }
    }

    /// Forced-failure hooks applied to every domain this factory wraps.
    pub fn with_hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.pipeline.hooks = hooks;
        self
    }

    /// Creates and registers the domain `name` from `<domains_dir>/<name>`.
    ///
    /// The configured default domain needs no metadata file and gets an empty
    /// descriptor. Domain scopes are parented to the container scope, and
    /// container plugins are the host plugins.
    pub fn create(&self, name: &str) -> DeploymentResult<Arc<ArtifactWrapper>> {
        let context = &self.pipeline.context;
        let _deployments = context.deployment_guard();
        check_name(name, context.registry().contains(name))?;

        let config = context.config();
        let root = config.domain_root(name);
        let descriptor = if name == config.default_domain {
            self.descriptors.create_empty(name, &root)?
        } else {
            self.descriptors.create(&root)?
        };
        check_descriptor_name(name, &descriptor)?;

        let resolved = self.pipeline.resolve(descriptor, context.container_plugins())?;
        let domain = self.pipeline.deploy(
            resolved,
            context.arena().container(),
            None,
            |resolved, scopes, resolver| {
                Arc::new(DefaultDomain::new(resolved, scopes, resolver)) as Arc<dyn DeployableArtifact>
            },
        )?;
        info!(artifact = %name, plugins = domain.plugins().len(), "Created domain");
        Ok(domain)
    }

    /// Creates the configured default domain.
    pub fn create_default(&self) -> DeploymentResult<Arc<ArtifactWrapper>> {
        let name = self.pipeline.context.config().default_domain.clone();
        self.create(&name)
    }

    /// Unregisters, disposes and tears down the domain `name`.
    ///
    /// Fails while applications are still deployed into it, and for names
    /// registered as anything but a domain. Disposing an unknown name is a
    /// no-op.
    pub fn dispose(&self, name: &str) -> DeploymentResult<()> {
        self.pipeline.dispose(name)
    }
}

/// Creates and disposes applications.
pub struct ApplicationFactory {
    descriptors: DescriptorFactory,
    pipeline: Pipeline,
}

impl ApplicationFactory {
    pub fn new(context: Arc<DeploymentContext>) -> Self {
        let descriptors = DescriptorFactory::application(
            Arc::clone(context.loaders()),
            context.config().system_properties(),
        );
        Self {
            descriptors,
            pipeline: Pipeline::new(ArtifactKind::Application, context),
        }
    }

    /// Forced-failure hooks applied to every application this factory wraps.
    pub fn with_hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.pipeline.hooks = hooks;
        self
    }

    /// Creates and registers the application `name` from `<apps_dir>/<name>`.
    ///
    /// The application deploys into the domain its descriptor names, or the
    /// default domain. Its scope and attribute resolver are parented to the
    /// domain's, and the container's and domain's plugins count as host
    /// plugins.
    pub fn create(&self, name: &str) -> DeploymentResult<Arc<ArtifactWrapper>> {
        let context = &self.pipeline.context;
        let _deployments = context.deployment_guard();
        check_name(name, context.registry().contains(name))?;

        let config = context.config();
        let descriptor = self.descriptors.create(&config.application_root(name))?;
        check_descriptor_name(name, &descriptor)?;

        let domain_name = descriptor
            .domain()
            .unwrap_or(config.default_domain.as_str())
            .to_string();
        let domain = context
            .registry()
            .lookup(&domain_name)
            .filter(|artifact| artifact.descriptor().kind() == ArtifactKind::Domain)
            .ok_or_else(|| DeploymentError::DomainNotFound(domain_name.clone()))?;

        let host: Vec<PluginDescriptor> = context
            .container_plugins()
            .iter()
            .cloned()
            .chain(domain.plugins().iter().map(|plugin| plugin.descriptor.clone()))
            .collect();

        let resolved = self.pipeline.resolve(descriptor, &host)?;
        let domain_for_app = domain_name.clone();
        let application = self.pipeline.deploy(
            resolved,
            domain.scope(),
            Some(Arc::clone(domain.attribute_resolver())),
            move |resolved, scopes, resolver| {
                Arc::new(DefaultApplication::new(resolved, scopes, resolver, domain_for_app)) as Arc<dyn DeployableArtifact>
            },
        )?;
        info!(
            artifact = %name,
            domain = %domain_name,
            plugins = application.plugins().len(),
            "Created application"
        );
        Ok(application)
    }

    /// Unregisters, disposes and tears down the application `name`.
    /// Fails for names registered as anything but an application. Disposing
    /// an unknown name is a no-op.
    pub fn dispose(&self, name: &str) -> DeploymentResult<()> {
        self.pipeline.dispose(name)
    }
}
