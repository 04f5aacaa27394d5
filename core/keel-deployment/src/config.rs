//! Deployment configuration read from `deployment.toml`.
//!
//! ```toml
//! [deployment]
//! domains-dir = "domains"
//! apps-dir = "apps"
//! default-domain = "default"
//!
//! [plugins]
//! deduplication = "by-name"
//!
//! [system-properties]
//! entries = ["-Odb.host=prod-db"]
//! ```
//!
//! Relative directories are resolved against the directory holding the file.

use crate::error::DeploymentResult;
use crate::resolver::DeduplicationPolicy;
use keel_descriptor::SystemProperties;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the configuration file inside a runtime home directory.
pub const CONFIG_FILE_NAME: &str = "deployment.toml";

fn default_domains_dir() -> PathBuf {
    PathBuf::from("domains")
}

fn default_apps_dir() -> PathBuf {
    PathBuf::from("apps")
}

fn default_domain_name() -> String {
    "default".to_string()
}

/// Settings shared by the domain and application factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub domains_dir: PathBuf,
    pub apps_dir: PathBuf,
    /// Domain that applications deploy into when they name none. Created
    /// without a metadata file.
    pub default_domain: String,
    pub plugin_deduplication: DeduplicationPolicy,
    /// System-level overrides as `-O<key>=<value>` entries.
    pub system_properties: Vec<String>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            domains_dir: default_domains_dir(),
            apps_dir: default_apps_dir(),
            default_domain: default_domain_name(),
            plugin_deduplication: DeduplicationPolicy::default(),
            system_properties: Vec::new(),
        }
    }
}

impl DeploymentConfig {
    /// Loads `deployment.toml` from `home`, with directories rooted there.
    pub fn load(home: &Path) -> Self {
        Self::load_from(&home.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from an explicit path.
    /// Falls back to defaults (rooted next to the file) with a warning when
    /// the file is missing, unreadable or malformed.
    pub fn load_from(path: &Path) -> Self {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        if !path.exists() {
            info!(path = %path.display(), "No deployment config found, using defaults");
            return Self::default().rooted_at(base);
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded deployment config");
                    config.rooted_at(base)
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse deployment config, falling back to defaults"
                    );
                    Self::default().rooted_at(base)
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read deployment config");
                Self::default().rooted_at(base)
            }
        }
    }

    /// Parses configuration text; directories are left as written.
    pub fn from_toml(contents: &str) -> DeploymentResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.into_config())
    }

    /// Resolves relative directories against `base`.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.domains_dir.is_relative() {
            self.domains_dir = base.join(&self.domains_dir);
        }
        if self.apps_dir.is_relative() {
            self.apps_dir = base.join(&self.apps_dir);
        }
        self
    }

    pub fn domain_root(&self, name: &str) -> PathBuf {
        self.domains_dir.join(name)
    }

    pub fn application_root(&self, name: &str) -> PathBuf {
        self.apps_dir.join(name)
    }

    pub fn system_properties(&self) -> SystemProperties {
        SystemProperties::from_args(&self.system_properties)
    }
}

/// Raw TOML structure matching the deployment.toml format.
#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    deployment: DeploymentSection,
    #[serde(default)]
    plugins: PluginsSection,
    #[serde(default, rename = "system-properties")]
    system_properties: SystemPropertiesSection,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeploymentSection {
    #[serde(default = "default_domains_dir")]
    domains_dir: PathBuf,
    #[serde(default = "default_apps_dir")]
    apps_dir: PathBuf,
    #[serde(default = "default_domain_name")]
    default_domain: String,
}

impl Default for DeploymentSection {
    fn default() -> Self {
        Self {
            domains_dir: default_domains_dir(),
            apps_dir: default_apps_dir(),
            default_domain: default_domain_name(),
        }
    }
}

#[derive(Deserialize, Default)]
struct PluginsSection {
    #[serde(default)]
    deduplication: DeduplicationPolicy,
}

#[derive(Deserialize, Default)]
struct SystemPropertiesSection {
    #[serde(default)]
    entries: Vec<String>,
}

impl ConfigFile {
    fn into_config(self) -> DeploymentConfig {
        DeploymentConfig {
            domains_dir: self.deployment.domains_dir,
            apps_dir: self.deployment.apps_dir,
            default_domain: self.deployment.default_domain,
            plugin_deduplication: self.plugins.deduplication,
            system_properties: self.system_properties.entries,
        }
    }
}
