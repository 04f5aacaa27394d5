//! Configuration attributes for Keel artifacts.
//!
//! An artifact's configuration values may reference other attributes with
//! `${key}` placeholders. This crate provides:
//! - [`ConfigurationAttribute`]: an immutable `(source, key, raw value)` triple
//! - [`ConfigurationAttributes`]: attributes read from a properties file
//! - [`ConfigurationAttributesResolver`]: memoized placeholder expansion over a
//!   two-level chain (an application's attributes fall back to its domain's)
//!
//! Resolution is synchronous and thread-safe: concurrent callers asking for the
//! same literal value share a single computation.

mod attribute;
mod attributes;
mod error;
mod properties;
mod resolver;

pub use attribute::{AttributeLookup, ConfigurationAttribute};
pub use attributes::ConfigurationAttributes;
pub use error::{ConfigError, ConfigResult};
pub use properties::parse_properties;
pub use resolver::{
    ConfigurationAttributesResolver, MAX_PLACEHOLDER_DEPTH, MAX_PLACEHOLDER_SUBSTITUTIONS,
    PLACEHOLDER_PREFIX, PLACEHOLDER_SUFFIX,
};
