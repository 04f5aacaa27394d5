//! Serialized metadata model read from an artifact's descriptor file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_redeployment_enabled() -> bool {
    true
}

/// Loader reference: which registered loader to use and the attributes handed
/// to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderModel {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Contents of `keel-domain.json`, `keel-application.json` or
/// `keel-plugin.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactModel {
    /// Artifact name. Defaults to the artifact root's directory name.
    #[serde(default)]
    pub name: Option<String>,
    /// Minimum runtime version (semver).
    pub min_runtime_version: String,
    #[serde(default = "default_redeployment_enabled")]
    pub redeployment_enabled: bool,
    /// Configuration resources relative to the `keel/` folder.
    #[serde(default)]
    pub configs: Vec<String>,
    /// Domain an application deploys into.
    #[serde(default)]
    pub domain: Option<String>,
    pub bundle_descriptor_loader: LoaderModel,
    #[serde(default)]
    pub dependency_model_loader: Option<LoaderModel>,
}

impl ArtifactModel {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
