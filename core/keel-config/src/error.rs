//! Error types for configuration attribute handling.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or resolving configuration attributes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A placeholder references a key that no resolver in the chain declares.
    #[error("unresolved placeholder: no configuration attribute named '{key}'")]
    UnresolvedPlaceholder { key: String },

    /// A placeholder (directly or indirectly) references itself.
    #[error("placeholder cycle detected: {chain}")]
    PlaceholderCycle { chain: String },

    /// Placeholder values nest deeper than the resolver allows.
    #[error("placeholder nesting exceeded {depth} levels while resolving '{key}'")]
    PlaceholderDepthExceeded { key: String, depth: usize },

    /// Rescanning a value kept producing new placeholders.
    #[error("expanding '{value}' needed more than {limit} placeholder substitutions")]
    PlaceholderSubstitutionLimit { value: String, limit: usize },

    /// An attribute was declared without a provenance token.
    #[error("configuration attribute '{0}' has an empty source")]
    EmptySource(String),

    /// The attributes file does not exist.
    #[error("configuration attributes file not found: {}", .0.display())]
    AttributesFileNotFound(PathBuf),

    /// The attributes file exists but could not be read.
    #[error("could not read configuration attributes from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
