//! Shared state for the artifact factories of one runtime.

use crate::config::DeploymentConfig;
use crate::isolation::ScopeArena;
use crate::registry::ArtifactRegistry;
use crate::resolver::PluginDependenciesResolver;
use keel_descriptor::{DescriptorFactory, DescriptorLoaderRepository, PluginDescriptor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything domains and applications of one runtime share: configuration,
/// descriptor loaders, the scope arena, the registry, and the plugins the
/// container itself provides.
pub struct DeploymentContext {
    config: DeploymentConfig,
    loaders: Arc<DescriptorLoaderRepository>,
    arena: Arc<ScopeArena>,
    registry: Arc<ArtifactRegistry>,
    container_plugins: Vec<PluginDescriptor>,
    deployments: Mutex<()>,
}

impl DeploymentContext {
    /// A context using the built-in descriptor loaders.
    pub fn new(config: DeploymentConfig) -> Self {
        Self::with_loaders(config, Arc::new(DescriptorLoaderRepository::with_builtin()))
    }

    pub fn with_loaders(config: DeploymentConfig, loaders: Arc<DescriptorLoaderRepository>) -> Self {
        Self {
            config,
            loaders,
            arena: Arc::new(ScopeArena::new()),
            registry: Arc::new(ArtifactRegistry::new()),
            container_plugins: Vec::new(),
            deployments: Mutex::new(()),
        }
    }

    /// Plugins provided by the container to every domain and application.
    pub fn with_container_plugins(mut self, plugins: Vec<PluginDescriptor>) -> Self {
        self.container_plugins = plugins;
        self
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn loaders(&self) -> &Arc<DescriptorLoaderRepository> {
        &self.loaders
    }

    pub fn arena(&self) -> &Arc<ScopeArena> {
        &self.arena
    }

    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    pub fn container_plugins(&self) -> &[PluginDescriptor] {
        &self.container_plugins
    }

    /// Serializes factory create and dispose calls, so a domain cannot be
    /// torn down while an application is being deployed into it.
    pub(crate) fn deployment_guard(&self) -> MutexGuard<'_, ()> {
        self.deployments.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn plugin_resolver(&self) -> PluginDependenciesResolver {
        PluginDependenciesResolver::new(
            Arc::new(DescriptorFactory::plugin(Arc::clone(&self.loaders))),
            self.config.plugin_deduplication,
        )
    }
}
