//! Lifecycle decorator around a deployable artifact.

use crate::artifact::{ArtifactPlugin, DeployableArtifact};
use crate::error::{DeploymentError, DeploymentResult};
use crate::isolation::ScopeId;
use keel_config::ConfigurationAttributesResolver;
use keel_descriptor::ArtifactDescriptor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Initial settings for the forced-failure hooks of an [`ArtifactWrapper`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleHooks {
    pub fail_on_stop: bool,
    pub fail_on_dispose: bool,
}

/// Delegates every operation to the wrapped artifact unless a hook forces the
/// operation to fail. Hooks can be flipped at any time.
pub struct ArtifactWrapper {
    inner: Arc<dyn DeployableArtifact>,
    fail_on_stop: AtomicBool,
    fail_on_dispose: AtomicBool,
}

impl ArtifactWrapper {
    pub fn new(inner: Arc<dyn DeployableArtifact>) -> Self {
        Self::with_hooks(inner, LifecycleHooks::default())
    }

    pub fn with_hooks(inner: Arc<dyn DeployableArtifact>, hooks: LifecycleHooks) -> Self {
        Self {
            inner,
            fail_on_stop: AtomicBool::new(hooks.fail_on_stop),
            fail_on_dispose: AtomicBool::new(hooks.fail_on_dispose),
        }
    }

    pub fn inner(&self) -> &Arc<dyn DeployableArtifact> {
        &self.inner
    }

    pub fn set_fail_on_stop(&self, fail: bool) {
        self.fail_on_stop.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_on_dispose(&self, fail: bool) {
        self.fail_on_dispose.store(fail, Ordering::SeqCst);
    }

    pub fn hooks(&self) -> LifecycleHooks {
        LifecycleHooks {
            fail_on_stop: self.fail_on_stop.load(Ordering::SeqCst),
            fail_on_dispose: self.fail_on_dispose.load(Ordering::SeqCst),
        }
    }

    fn forced_failure(&self, operation: &'static str) -> DeploymentError {
        warn!(artifact = %self.name(), operation, "Forcing lifecycle failure");
        DeploymentError::lifecycle(self.name(), operation, "forced failure")
    }
}

impl std::fmt::Debug for ArtifactWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactWrapper")
            .field("name", &self.name())
            .field("kind", &self.descriptor().kind())
            .field("scope", &self.scope())
            .field("hooks", &self.hooks())
            .finish()
    }
}

impl DeployableArtifact for ArtifactWrapper {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn descriptor(&self) -> &ArtifactDescriptor {
        self.inner.descriptor()
    }

    fn start(&self) -> DeploymentResult<()> {
        self.inner.start()
    }

    fn stop(&self) -> DeploymentResult<()> {
        if self.fail_on_stop.load(Ordering::SeqCst) {
            return Err(self.forced_failure("stop"));
        }
        self.inner.stop()
    }

    fn dispose(&self) -> DeploymentResult<()> {
        if self.fail_on_dispose.load(Ordering::SeqCst) {
            return Err(self.forced_failure("dispose"));
        }
        self.inner.dispose()
    }

    fn plugins(&self) -> &[ArtifactPlugin] {
        self.inner.plugins()
    }

    fn scope(&self) -> ScopeId {
        self.inner.scope()
    }

    fn attribute_resolver(&self) -> &Arc<ConfigurationAttributesResolver> {
        self.inner.attribute_resolver()
    }
}
