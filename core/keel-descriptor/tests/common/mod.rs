//! Shared fixtures for descriptor tests.

#![allow(dead_code)]

use keel_descriptor::ArtifactKind;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Writes `model` as the metadata file of a `kind` artifact at `root`.
pub fn write_model(root: &Path, kind: ArtifactKind, model: &Value) -> PathBuf {
    let path = root.join(kind.descriptor_path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, serde_json::to_string_pretty(model).unwrap()).unwrap();
    path
}

/// A minimal valid model using the declared loaders.
pub fn minimal_model(artifact_id: &str) -> Value {
    json!({
        "minRuntimeVersion": "4.2.0",
        "bundleDescriptorLoader": {
            "id": "declared",
            "attributes": {
                "groupId": "com.acme",
                "artifactId": artifact_id,
                "version": "1.0.0"
            }
        }
    })
}

/// Creates `<parent>/<name>` and returns it.
pub fn artifact_dir(parent: &Path, name: &str) -> PathBuf {
    let root = parent.join(name);
    std::fs::create_dir_all(&root).unwrap();
    root
}
