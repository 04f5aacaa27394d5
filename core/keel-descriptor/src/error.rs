//! Error types for descriptor construction.

use crate::descriptor::ArtifactKind;
use crate::loader::LoaderCapability;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("descriptor file not found: {}", .0.display())]
    MissingDescriptorFile(PathBuf),

    #[error("malformed descriptor {}: {reason}", .location.display())]
    MalformedDescriptor { location: PathBuf, reason: String },

    #[error(
        "no {capability} loader '{id}' registered for {kind} artifacts (requested by {})",
        .location.display()
    )]
    LoaderNotFound {
        id: String,
        kind: ArtifactKind,
        capability: LoaderCapability,
        location: PathBuf,
    },

    #[error("invalid artifact name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DescriptorError {
    pub(crate) fn malformed(location: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MalformedDescriptor {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

pub type DescriptorResult<T> = Result<T, DescriptorError>;
