//! Error types for artifact deployment.

use crate::isolation::ScopeId;
use crate::registry::ArtifactState;
use keel_config::ConfigError;
use keel_descriptor::{ArtifactKind, DescriptorError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("failed to resolve plugin at {}: {source}", .location.display())]
    PluginResolutionFailure {
        location: PathBuf,
        #[source]
        source: DescriptorError,
    },

    #[error("artifact name already in use: {0}")]
    DuplicateName(String),

    #[error("invalid artifact name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("domain not found: {0}")]
    DomainNotFound(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("artifact '{name}' is a {actual}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: ArtifactKind,
        actual: ArtifactKind,
    },

    #[error("isolation scope not found: {0}")]
    ScopeNotFound(ScopeId),

    #[error("cannot {operation} artifact '{name}' in state {state}")]
    InvalidTransition {
        name: String,
        state: ArtifactState,
        operation: &'static str,
    },

    #[error("failed to {operation} artifact '{name}': {reason}")]
    Lifecycle {
        name: String,
        operation: &'static str,
        reason: String,
    },

    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("configuration attribute error: {0}")]
    Attributes(#[from] ConfigError),

    #[error("deployment configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl DeploymentError {
    pub(crate) fn lifecycle(name: &str, operation: &'static str, reason: impl ToString) -> Self {
        Self::Lifecycle {
            name: name.to_string(),
            operation,
            reason: reason.to_string(),
        }
    }
}

pub type DeploymentResult<T> = Result<T, DeploymentError>;
