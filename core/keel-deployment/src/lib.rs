//! Deployment of Keel domains and applications.
//!
//! Creating an artifact runs a fixed pipeline:
//! 1. [`keel_descriptor::DescriptorFactory`] parses the artifact's metadata
//! 2. [`PluginDependenciesResolver`] loads its plugins and drops those the host
//!    already provides
//! 3. [`IsolationHierarchyBuilder`] creates the unit scope and one scope per plugin
//! 4. the unit is wrapped in an [`ArtifactWrapper`] and added to the
//!    [`ArtifactRegistry`]
//!
//! [`DomainFactory`] and [`ApplicationFactory`] drive the pipeline over a
//! shared [`DeploymentContext`].

mod artifact;
mod config;
mod context;
mod error;
mod factory;
mod isolation;
mod registry;
mod resolver;
mod wrapper;

pub use artifact::{
    attribute_resolver_for, ArtifactPlugin, DefaultApplication, DefaultDomain, DeployableArtifact,
    ResolvedArtifact,
};
pub use config::{DeploymentConfig, CONFIG_FILE_NAME};
pub use context::DeploymentContext;
pub use error::{DeploymentError, DeploymentResult};
pub use factory::{ApplicationFactory, DomainFactory};
pub use isolation::{
    plugin_scope_name, ArtifactScopes, IsolationHierarchyBuilder, IsolationScope, ScopeArena,
    ScopeId, ScopeKind, CONTAINER_SCOPE_NAME,
};
pub use registry::{ArtifactRegistry, ArtifactState};
pub use resolver::{DeduplicationPolicy, PluginDependenciesResolver};
pub use wrapper::{ArtifactWrapper, LifecycleHooks};
