//! Shared fixtures for deployment tests: artifacts laid out on disk under a
//! temporary runtime home.

#![allow(dead_code)]

use keel_deployment::{DeploymentConfig, DeploymentContext};
use keel_descriptor::ArtifactKind;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A metadata model declaring `plugins` (absolute plugin roots) as plugin
/// dependencies and `libraries` as library dependencies.
pub fn model(name: &str, version: &str, plugins: &[&Path], libraries: &[&str]) -> Value {
    let mut dependencies: Vec<Value> = plugins
        .iter()
        .map(|location| {
            let artifact_id = location.file_name().unwrap().to_string_lossy().into_owned();
            json!({
                "groupId": "com.acme.plugins",
                "artifactId": artifact_id,
                "version": "1.0.0",
                "location": location,
                "plugin": true
            })
        })
        .collect();
    dependencies.extend(libraries.iter().map(|library| {
        json!({
            "groupId": "com.acme.lib",
            "artifactId": library,
            "version": "1.0.0",
            "location": format!("lib/{library}.jar")
        })
    }));

    json!({
        "name": name,
        "minRuntimeVersion": "4.2.0",
        "bundleDescriptorLoader": {
            "id": "declared",
            "attributes": { "groupId": "com.acme", "artifactId": name, "version": version }
        },
        "dependencyModelLoader": {
            "id": "declared",
            "attributes": { "dependencies": dependencies }
        }
    })
}

pub fn write_model(root: &Path, kind: ArtifactKind, model: &Value) {
    let path = root.join(kind.descriptor_path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(model).unwrap()).unwrap();
}

/// Writes a plugin at `<home>/plugins/<name>-<version>` and returns its root.
pub fn plugin(home: &Path, name: &str, version: &str, plugins: &[&Path]) -> PathBuf {
    let root = home.join("plugins").join(format!("{name}-{version}"));
    write_model(&root, ArtifactKind::Plugin, &model(name, version, plugins, &[]));
    root
}

/// Writes a domain at `<home>/domains/<name>`.
pub fn domain(home: &Path, name: &str, plugins: &[&Path]) -> PathBuf {
    let root = home.join("domains").join(name);
    write_model(&root, ArtifactKind::Domain, &model(name, "1.0.0", plugins, &[]));
    root
}

/// Writes an application at `<home>/apps/<name>` deploying into `domain`.
pub fn application(home: &Path, name: &str, domain: Option<&str>, plugins: &[&Path]) -> PathBuf {
    let root = home.join("apps").join(name);
    let mut model = model(name, "1.0.0", plugins, &["json"]);
    if let Some(domain) = domain {
        model["domain"] = json!(domain);
    }
    write_model(&root, ArtifactKind::Application, &model);
    root
}

pub fn config(home: &Path) -> DeploymentConfig {
    DeploymentConfig::default().rooted_at(home)
}

pub fn context(home: &Path) -> Arc<DeploymentContext> {
    Arc::new(DeploymentContext::new(config(home)))
}
