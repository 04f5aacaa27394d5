//! Deployable units and the stage results they are assembled from.

use crate::error::{DeploymentError, DeploymentResult};
use crate::isolation::{ArtifactScopes, ScopeId};
use keel_config::{ConfigurationAttribute, ConfigurationAttributesResolver};
use keel_descriptor::{ArtifactDescriptor, ArtifactKind, PluginDescriptor, ARTIFACT_PROPERTIES_FILE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// A descriptor together with the deduplicated plugins it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub descriptor: ArtifactDescriptor,
    pub plugins: Vec<PluginDescriptor>,
}

/// A resolved plugin and the scope created for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPlugin {
    pub descriptor: PluginDescriptor,
    pub scope: ScopeId,
}

impl ArtifactPlugin {
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// A domain or application that can be registered and driven through its
/// lifecycle.
pub trait DeployableArtifact: Send + Sync {
    fn name(&self) -> &str;
    fn descriptor(&self) -> &ArtifactDescriptor;
    fn start(&self) -> DeploymentResult<()>;
    fn stop(&self) -> DeploymentResult<()>;
    fn dispose(&self) -> DeploymentResult<()>;
    /// Plugins owned by this unit, sorted by name.
    fn plugins(&self) -> &[ArtifactPlugin];
    /// The unit's own isolation scope.
    fn scope(&self) -> ScopeId;
    fn attribute_resolver(&self) -> &Arc<ConfigurationAttributesResolver>;
}

/// Builds the attribute resolver for a unit from its descriptor properties.
pub fn attribute_resolver_for(
    descriptor: &ArtifactDescriptor,
    parent: Option<Arc<ConfigurationAttributesResolver>>,
) -> DeploymentResult<Arc<ConfigurationAttributesResolver>> {
    let source = descriptor.root().join(ARTIFACT_PROPERTIES_FILE).display().to_string();
    let attributes = descriptor
        .properties()
        .iter()
        .map(|(key, value)| ConfigurationAttribute::new(source.as_str(), key.as_str(), value.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Arc::new(ConfigurationAttributesResolver::new(parent, attributes)))
}

/// State shared by the default domain and application.
struct UnitState {
    resolved: ResolvedArtifact,
    scopes: ArtifactScopes,
    plugins: Vec<ArtifactPlugin>,
    resolver: Arc<ConfigurationAttributesResolver>,
    disposed: AtomicBool,
}

impl UnitState {
    fn new(
        resolved: ResolvedArtifact,
        scopes: ArtifactScopes,
        resolver: Arc<ConfigurationAttributesResolver>,
    ) -> Self {
        let mut plugins: Vec<ArtifactPlugin> = resolved
            .plugins
            .iter()
            .map(|descriptor| ArtifactPlugin {
                descriptor: descriptor.clone(),
                scope: scopes
                    .plugin(descriptor.name())
                    .unwrap_or_else(|| panic!("plugin '{}' has no isolation scope", descriptor.name())),
            })
            .collect();
        plugins.sort_by(|a, b| a.name().cmp(b.name()));
        Self {
            resolved,
            scopes,
            plugins,
            resolver,
            disposed: AtomicBool::new(false),
        }
    }

    fn name(&self) -> &str {
        self.resolved.descriptor.name()
    }

    fn kind(&self) -> ArtifactKind {
        self.resolved.descriptor.kind()
    }

    fn ensure_live(&self, operation: &'static str) -> DeploymentResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(DeploymentError::lifecycle(self.name(), operation, "artifact is disposed"));
        }
        Ok(())
    }

    fn start(&self) -> DeploymentResult<()> {
        self.ensure_live("start")?;
        info!(
            artifact = %self.name(),
            kind = %self.kind(),
            plugins = self.plugins.len(),
            "Starting artifact"
        );
        Ok(())
    }

    fn stop(&self) -> DeploymentResult<()> {
        self.ensure_live("stop")?;
        info!(artifact = %self.name(), kind = %self.kind(), "Stopping artifact");
        Ok(())
    }

    /// Idempotent.
    fn dispose(&self) -> DeploymentResult<()> {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            info!(artifact = %self.name(), kind = %self.kind(), "Disposed artifact");
        }
        Ok(())
    }
}

/// Implements [`DeployableArtifact`] for a type whose `unit` field holds its
/// [`UnitState`].
macro_rules! unit_artifact {
    ($ty:ty) => {
        impl DeployableArtifact for $ty {
            fn name(&self) -> &str {
                self.unit.name()
            }

            fn descriptor(&self) -> &ArtifactDescriptor {
                &self.unit.resolved.descriptor
            }

            fn start(&self) -> DeploymentResult<()> {
                self.unit.start()
            }

            fn stop(&self) -> DeploymentResult<()> {
                self.unit.stop()
            }

            fn dispose(&self) -> DeploymentResult<()> {
                self.unit.dispose()
            }

            fn plugins(&self) -> &[ArtifactPlugin] {
                &self.unit.plugins
            }

            fn scope(&self) -> ScopeId {
                self.unit.scopes.unit
            }

            fn attribute_resolver(&self) -> &Arc<ConfigurationAttributesResolver> {
                &self.unit.resolver
            }
        }
    };
}

/// A domain: a shared parent for applications and their plugins.
pub struct DefaultDomain {
    unit: UnitState,
}

impl DefaultDomain {
    pub fn new(
        resolved: ResolvedArtifact,
        scopes: ArtifactScopes,
        resolver: Arc<ConfigurationAttributesResolver>,
    ) -> Self {
        Self {
            unit: UnitState::new(resolved, scopes, resolver),
        }
    }

    pub fn scopes(&self) -> &ArtifactScopes {
        &self.unit.scopes
    }
}

unit_artifact!(DefaultDomain);

/// An application deployed into a domain.
pub struct DefaultApplication {
    unit: UnitState,
    domain: String,
}

impl DefaultApplication {
    pub fn new(
        resolved: ResolvedArtifact,
        scopes: ArtifactScopes,
        resolver: Arc<ConfigurationAttributesResolver>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            unit: UnitState::new(resolved, scopes, resolver),
            domain: domain.into(),
        }
    }

    /// Name of the domain the application was deployed into.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn scopes(&self) -> &ArtifactScopes {
        &self.unit.scopes
    }
}

unit_artifact!(DefaultApplication);
