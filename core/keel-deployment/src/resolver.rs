//! Plugin dependency resolution and deduplication against host plugins.

use crate::error::{DeploymentError, DeploymentResult};
use keel_descriptor::{DependencyModel, DescriptorFactory, PluginDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Decides when a declared plugin is already provided by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeduplicationPolicy {
    /// Same plugin name. Versions are not compared.
    #[default]
    ByName,
    /// Same plugin name and bundle version.
    ByNameAndVersion,
}

impl DeduplicationPolicy {
    pub fn matches(&self, host: &PluginDescriptor, declared: &PluginDescriptor) -> bool {
        match self {
            Self::ByName => host.name() == declared.name(),
            Self::ByNameAndVersion => {
                host.name() == declared.name()
                    && host.bundle().map(|b| &b.version) == declared.bundle().map(|b| &b.version)
            }
        }
    }
}

/// Walks an artifact's dependency model and produces the plugins it needs.
pub struct PluginDependenciesResolver {
    plugin_factory: Arc<DescriptorFactory>,
    policy: DeduplicationPolicy,
}

impl PluginDependenciesResolver {
    pub fn new(plugin_factory: Arc<DescriptorFactory>, policy: DeduplicationPolicy) -> Self {
        Self {
            plugin_factory,
            policy,
        }
    }

    pub fn policy(&self) -> DeduplicationPolicy {
        self.policy
    }

    /// Loads every plugin reachable from `dependency_model` and reconciles the
    /// result with `host_plugins`.
    ///
    /// Returns the host plugins plus the declared plugins no host plugin
    /// matches, sorted by name. Declared plugins are keyed by name, so when two
    /// loads produce the same name the later one wins.
    ///
    /// # Errors
    /// [`DeploymentError::PluginResolutionFailure`] for the first plugin that
    /// cannot be loaded; nothing is returned for the rest.
    pub fn resolve(
        &self,
        dependency_model: Option<&DependencyModel>,
        host_plugins: &[PluginDescriptor],
    ) -> DeploymentResult<Vec<PluginDescriptor>> {
        let declared = self.load_declared(dependency_model)?;

        let mut resolved: Vec<PluginDescriptor> = host_plugins.to_vec();
        for plugin in declared.into_values() {
            match host_plugins.iter().find(|host| self.policy.matches(host, &plugin)) {
                Some(host) => debug!(
                    plugin = %plugin.name(),
                    host_root = %host.root().display(),
                    "Plugin already provided by host"
                ),
                None => resolved.push(plugin),
            }
        }
        resolved.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(resolved)
    }

    fn load_declared(
        &self,
        dependency_model: Option<&DependencyModel>,
    ) -> DeploymentResult<BTreeMap<String, PluginDescriptor>> {
        let mut pending: Vec<PathBuf> = dependency_model
            .map(|model| model.plugin_dependencies().map(|d| d.location.clone()).collect())
            .unwrap_or_default();
        // Depth-first in declaration order.
        pending.reverse();

        let mut visited = HashSet::new();
        let mut loaded = BTreeMap::new();
        while let Some(location) = pending.pop() {
            if !visited.insert(location.clone()) {
                continue;
            }

            let plugin = self
                .plugin_factory
                .create(&location)
                .map_err(|source| DeploymentError::PluginResolutionFailure {
                    location: location.clone(),
                    source,
                })?;
            debug!(plugin = %plugin.name(), location = %location.display(), "Loaded plugin descriptor");

            let mut transitive: Vec<PathBuf> = plugin
                .plugin_dependencies()
                .into_iter()
                .map(|dependency| dependency.location.clone())
                .collect();
            transitive.reverse();
            pending.extend(transitive);

            loaded.insert(plugin.name().to_string(), plugin);
        }
        Ok(loaded)
    }
}
