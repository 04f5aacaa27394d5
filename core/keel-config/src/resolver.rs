//! Placeholder resolution over a parent/child chain of attribute scopes.
//!
//! A value such as `http://${host}:${port}` is expanded by looking each key up
//! in the resolver's own attributes first and then in its parent's. Expanded
//! values are cached per literal input so a descriptor field is parsed once no
//! matter how many times it is read.

use crate::attribute::{AttributeLookup, ConfigurationAttribute};
use crate::error::{ConfigError, ConfigResult};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

/// Opens a placeholder.
pub const PLACEHOLDER_PREFIX: &str = "${";
/// Closes a placeholder.
pub const PLACEHOLDER_SUFFIX: &str = "}";
/// Maximum number of nested attribute expansions within one resolver scope.
pub const MAX_PLACEHOLDER_DEPTH: usize = 64;
/// Maximum number of substitutions while expanding a single value.
pub const MAX_PLACEHOLDER_SUBSTITUTIONS: usize = 1024;

/// Resolves `${key}` placeholders for one attribute scope.
///
/// Lookup order for a key is: this scope's attributes (whose raw value is then
/// expanded in this scope), then the parent resolver, and otherwise
/// [`ConfigError::UnresolvedPlaceholder`].
///
/// Results are memoized per literal input string. Failed resolutions are never
/// cached. Concurrent callers asking for the same uncached literal block until
/// the first computation finishes and then share its result.
pub struct ConfigurationAttributesResolver {
    parent: Option<Arc<ConfigurationAttributesResolver>>,
    attributes: Arc<dyn AttributeLookup>,
    cache: DashMap<String, Arc<OnceCell<String>>>,
}

impl ConfigurationAttributesResolver {
    /// Creates a resolver over an ordered attribute list.
    pub fn new(
        parent: Option<Arc<ConfigurationAttributesResolver>>,
        attributes: Vec<ConfigurationAttribute>,
    ) -> Self {
        Self::with_lookup(parent, Arc::new(attributes))
    }

    /// Creates a resolver over an arbitrary attribute source.
    pub fn with_lookup(
        parent: Option<Arc<ConfigurationAttributesResolver>>,
        attributes: Arc<dyn AttributeLookup>,
    ) -> Self {
        Self {
            parent,
            attributes,
            cache: DashMap::new(),
        }
    }

    pub fn parent(&self) -> Option<&Arc<ConfigurationAttributesResolver>> {
        self.parent.as_ref()
    }

    /// Resolves an optional value; `None` stays `None`.
    pub fn resolve_optional(&self, value: Option<&str>) -> ConfigResult<Option<String>> {
        value.map(|v| self.resolve_value(v)).transpose()
    }

    /// Expands every placeholder in `value`.
    ///
    /// Values without a `${` marker, and values whose first placeholder is
    /// never closed, are returned unchanged. Text produced by a substitution is
    /// scanned again, so a placeholder assembled from several pieces expands.
    pub fn resolve_value(&self, value: &str) -> ConfigResult<String> {
        if !value.contains(PLACEHOLDER_PREFIX) {
            return Ok(value.to_string());
        }

        let cell = Arc::clone(&self.cache.entry(value.to_string()).or_default());
        let result = cell
            .get_or_try_init(|| {
                debug!(value = %value, "Resolving configuration placeholders");
                self.expand(value, &mut Vec::new())
            })
            .cloned();

        if result.is_err() {
            self.cache.remove_if(value, |_, cell| cell.get().is_none());
        }
        result
    }

    /// Number of literal inputs with a cached resolution.
    pub fn cached_values(&self) -> usize {
        self.cache.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    /// Substitutes the first complete placeholder and rescans the result from
    /// the start until none is left. `chain` holds the keys currently being
    /// expanded in this scope.
    fn expand(&self, value: &str, chain: &mut Vec<String>) -> ConfigResult<String> {
        let mut resolved = value.to_string();

        for _ in 0..MAX_PLACEHOLDER_SUBSTITUTIONS {
            let Some(open) = resolved.find(PLACEHOLDER_PREFIX) else {
                return Ok(resolved);
            };
            let key_start = open + PLACEHOLDER_PREFIX.len();
            let Some(close) = resolved[key_start..]
                .find(PLACEHOLDER_SUFFIX)
                .map(|idx| idx + key_start)
            else {
                return Ok(resolved);
            };

            let key = resolved[key_start..close].to_string();
            let replacement = self.resolve_key(&key, chain)?;
            resolved.replace_range(open..close + PLACEHOLDER_SUFFIX.len(), &replacement);
        }

        Err(ConfigError::PlaceholderSubstitutionLimit {
            value: value.to_string(),
            limit: MAX_PLACEHOLDER_SUBSTITUTIONS,
        })
    }

    fn resolve_key(&self, key: &str, chain: &mut Vec<String>) -> ConfigResult<String> {
        if chain.iter().any(|k| k == key) {
            let mut cycle = chain.clone();
            cycle.push(key.to_string());
            return Err(ConfigError::PlaceholderCycle {
                chain: cycle.join(" -> "),
            });
        }
        if chain.len() >= MAX_PLACEHOLDER_DEPTH {
            return Err(ConfigError::PlaceholderDepthExceeded {
                key: key.to_string(),
                depth: MAX_PLACEHOLDER_DEPTH,
            });
        }

        match self.attributes.raw_value(key) {
            Some(raw) => {
                chain.push(key.to_string());
                let expanded = self.expand(&raw, chain);
                chain.pop();
                expanded
            }
            None => match &self.parent {
                Some(parent) => {
                    parent.resolve_value(&format!("{PLACEHOLDER_PREFIX}{key}{PLACEHOLDER_SUFFIX}"))
                }
                None => Err(ConfigError::UnresolvedPlaceholder {
                    key: key.to_string(),
                }),
            },
        }
    }
}

impl std::fmt::Debug for ConfigurationAttributesResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationAttributesResolver")
            .field("has_parent", &self.parent.is_some())
            .field("cached_values", &self.cached_values())
            .finish()
    }
}
