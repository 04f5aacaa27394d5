mod common;

use keel_deployment::*;
use keel_descriptor::{ArtifactKind, DescriptorError, DescriptorFactory, DescriptorLoaderRepository};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn factories(context: &Arc<DeploymentContext>) -> (DomainFactory, ApplicationFactory) {
    (
        DomainFactory::new(Arc::clone(context)),
        ApplicationFactory::new(Arc::clone(context)),
    )
}

fn plugin_names(artifact: &dyn DeployableArtifact) -> Vec<String> {
    artifact.plugins().iter().map(|p| p.name().to_string()).collect()
}

// ── Domains ──────────────────────────────────────────────────────

#[test]
fn default_domain_needs_no_metadata_file() {
    let home = tempfile::tempdir().unwrap();
    let context = common::context(home.path());
    let (domains, _) = factories(&context);

    let domain = domains.create_default().unwrap();
    assert_eq!(domain.name(), "default");
    assert_eq!(domain.descriptor().kind(), ArtifactKind::Domain);
    assert!(domain.plugins().is_empty());
    assert_eq!(context.registry().state("default"), Some(ArtifactState::Registered));
    assert_eq!(context.arena().parent(domain.scope()), Some(context.arena().container()));
}

#[test]
fn domain_with_plugins_gets_a_scope_per_plugin() {
    let home = tempfile::tempdir().unwrap();
    let http = common::plugin(home.path(), "http", "1.0.0", &[]);
    let db = common::plugin(home.path(), "db", "1.0.0", &[]);
    common::domain(home.path(), "shared", &[&http, &db]);
    let context = common::context(home.path());
    let (domains, _) = factories(&context);

    let domain = domains.create("shared").unwrap();
    assert_eq!(plugin_names(domain.as_ref()), vec!["db", "http"]);
    for plugin in domain.plugins() {
        let scope = context.arena().get(plugin.scope).unwrap();
        assert_eq!(scope.parent, Some(domain.scope()));
        assert_eq!(scope.name, format!("shared/plugin/{}", plugin.name()));
    }
}

#[test]
fn missing_metadata_file_leaves_no_entry_and_no_scopes() {
    let home = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(home.path().join("domains").join("empty")).unwrap();
    let context = common::context(home.path());
    let (domains, _) = factories(&context);
    let scopes_before = context.arena().len();

    let err = domains.create("empty").unwrap_err();
    assert!(matches!(err, DeploymentError::Descriptor(DescriptorError::MissingDescriptorFile(_))));
    assert!(context.registry().lookup("empty").is_none());
    assert_eq!(context.arena().len(), scopes_before);
}

#[test]
fn unresolvable_plugin_leaves_no_entry_and_no_scopes() {
    let home = tempfile::tempdir().unwrap();
    let ghost = home.path().join("plugins").join("ghost-1.0.0");
    common::domain(home.path(), "shared", &[&ghost]);
    let context = common::context(home.path());
    let (domains, _) = factories(&context);

    let err = domains.create("shared").unwrap_err();
    assert!(matches!(err, DeploymentError::PluginResolutionFailure { .. }));
    assert!(context.registry().is_empty());
    assert_eq!(context.arena().len(), 1);
}

#[test]
fn invalid_and_duplicate_names_are_rejected() {
    let home = tempfile::tempdir().unwrap();
    let context = common::context(home.path());
    let (domains, _) = factories(&context);

    let err = domains.create("my domain").unwrap_err();
    assert!(matches!(err, DeploymentError::InvalidName { ref name, .. } if name == "my domain"));

    domains.create_default().unwrap();
    let err = domains.create("default").unwrap_err();
    assert!(matches!(err, DeploymentError::DuplicateName(ref n) if n == "default"));
    assert_eq!(context.registry().len(), 1);
}

#[test]
fn descriptor_name_must_match_requested_name() {
    let home = tempfile::tempdir().unwrap();
    let root = home.path().join("domains").join("shared");
    common::write_model(&root, ArtifactKind::Domain, &common::model("other", "1.0.0", &[], &[]));
    let context = common::context(home.path());
    let (domains, _) = factories(&context);

    let err = domains.create("shared").unwrap_err();
    assert!(err.to_string().contains("other"));
    assert!(context.registry().is_empty());
}

#[test]
fn domain_plugins_deduplicate_against_container_plugins() {
    let home = tempfile::tempdir().unwrap();
    let container_http = common::plugin(home.path(), "http", "1.0.0", &[]);
    let domain_http = common::plugin(home.path(), "http", "2.0.0", &[]);
    let db = common::plugin(home.path(), "db", "1.0.0", &[]);
    common::domain(home.path(), "shared", &[&domain_http, &db]);

    let loaders = Arc::new(DescriptorLoaderRepository::with_builtin());
    let container_plugin = DescriptorFactory::plugin(loaders.clone()).create(&container_http).unwrap();
    let context = Arc::new(
        DeploymentContext::with_loaders(common::config(home.path()), loaders)
            .with_container_plugins(vec![container_plugin]),
    );
    let (domains, _) = factories(&context);

    let domain = domains.create("shared").unwrap();
    assert_eq!(plugin_names(domain.as_ref()), vec!["db"]);
}

#[test]
fn dispose_tears_down_domain_and_is_idempotent() {
    let home = tempfile::tempdir().unwrap();
    let http = common::plugin(home.path(), "http", "1.0.0", &[]);
    common::domain(home.path(), "shared", &[&http]);
    let context = common::context(home.path());
    let (domains, _) = factories(&context);

    let domain = domains.create("shared").unwrap();
    let scope = domain.scope();
    domains.dispose("shared").unwrap();

    assert!(context.registry().lookup("shared").is_none());
    assert!(!context.arena().contains(scope));
    assert_eq!(context.arena().len(), 1);
    domains.dispose("shared").unwrap();

    // The name is free again.
    domains.create("shared").unwrap();
}

#[test]
fn forced_dispose_failure_still_releases_name_and_scopes() {
    let home = tempfile::tempdir().unwrap();
    let context = common::context(home.path());
    let domains = DomainFactory::new(Arc::clone(&context)).with_hooks(LifecycleHooks {
        fail_on_stop: false,
        fail_on_dispose: true,
    });

    let domain = domains.create_default().unwrap();
    let err = domains.dispose("default").unwrap_err();
    assert!(matches!(err, DeploymentError::Lifecycle { operation: "dispose", .. }));
    assert!(context.registry().is_empty());
    assert!(!context.arena().contains(domain.scope()));
}

// ── Applications ─────────────────────────────────────────────────

#[test]
fn application_deploys_into_default_domain() {
    let home = tempfile::tempdir().unwrap();
    common::application(home.path(), "orders", None, &[]);
    let context = common::context(home.path());
    let (domains, apps) = factories(&context);

    let domain = domains.create_default().unwrap();
    let app = apps.create("orders").unwrap();

    assert_eq!(app.descriptor().kind(), ArtifactKind::Application);
    assert_eq!(context.arena().parent(app.scope()), Some(domain.scope()));
    assert_eq!(
        context.arena().ancestry(app.scope()),
        vec![app.scope(), domain.scope(), context.arena().container()]
    );
    assert_eq!(context.registry().names(), vec!["default", "orders"]);
}

#[test]
fn application_into_missing_domain_fails() {
    let home = tempfile::tempdir().unwrap();
    common::application(home.path(), "orders", Some("shared"), &[]);
    let context = common::context(home.path());
    let (_, apps) = factories(&context);

    let err = apps.create("orders").unwrap_err();
    assert!(matches!(err, DeploymentError::DomainNotFound(ref d) if d == "shared"));
    assert!(context.registry().is_empty());
    assert_eq!(context.arena().len(), 1);
}

#[test]
fn application_into_non_domain_artifact_fails() {
    let home = tempfile::tempdir().unwrap();
    common::application(home.path(), "first", None, &[]);
    common::application(home.path(), "second", Some("first"), &[]);
    let context = common::context(home.path());
    let (domains, apps) = factories(&context);
    domains.create_default().unwrap();
    apps.create("first").unwrap();

    let err = apps.create("second").unwrap_err();
    assert!(matches!(err, DeploymentError::DomainNotFound(ref d) if d == "first"));
}

#[test]
fn application_plugins_already_in_domain_are_not_reloaded() {
    let home = tempfile::tempdir().unwrap();
    let domain_http = common::plugin(home.path(), "http", "1.0.0", &[]);
    let app_http = common::plugin(home.path(), "http", "2.0.0", &[]);
    let db = common::plugin(home.path(), "db", "1.0.0", &[]);
    common::domain(home.path(), "shared", &[&domain_http]);
    common::application(home.path(), "orders", Some("shared"), &[&app_http, &db]);
    let context = common::context(home.path());
    let (domains, apps) = factories(&context);

    let domain = domains.create("shared").unwrap();
    let app = apps.create("orders").unwrap();

    assert_eq!(plugin_names(domain.as_ref()), vec!["http"]);
    assert_eq!(plugin_names(app.as_ref()), vec!["db"]);
    assert!(context.arena().lookup("orders/plugin/http").is_none());
    assert!(context.arena().lookup("orders/plugin/db").is_some());
}

#[test]
fn by_name_and_version_policy_loads_differing_versions() {
    let home = tempfile::tempdir().unwrap();
    let domain_http = common::plugin(home.path(), "http", "1.0.0", &[]);
    let app_http = common::plugin(home.path(), "http", "2.0.0", &[]);
    common::domain(home.path(), "shared", &[&domain_http]);
    common::application(home.path(), "orders", Some("shared"), &[&app_http]);

    let mut config = common::config(home.path());
    config.plugin_deduplication = DeduplicationPolicy::ByNameAndVersion;
    let context = Arc::new(DeploymentContext::new(config));
    let (domains, apps) = factories(&context);

    domains.create("shared").unwrap();
    let app = apps.create("orders").unwrap();
    assert_eq!(plugin_names(app.as_ref()), vec!["http"]);
    assert_eq!(app.plugins()[0].descriptor.bundle().unwrap().version, "2.0.0");
}

#[test]
fn application_attributes_fall_back_to_domain_attributes() {
    let home = tempfile::tempdir().unwrap();
    let domain_root = common::domain(home.path(), "shared", &[]);
    std::fs::write(domain_root.join("keel-artifact.properties"), "db.host=shared-db\ndb.port=5432\n").unwrap();
    let app_root = common::application(home.path(), "orders", Some("shared"), &[]);
    std::fs::write(
        app_root.join("keel-artifact.properties"),
        "db.port=6543\ndb.url=jdbc://${db.host}:${db.port}/orders\n",
    )
    .unwrap();
    let context = common::context(home.path());
    let (domains, apps) = factories(&context);

    domains.create("shared").unwrap();
    let app = apps.create("orders").unwrap();
    assert_eq!(
        app.attribute_resolver().resolve_value("${db.url}").unwrap(),
        "jdbc://shared-db:6543/orders"
    );
}

#[test]
fn system_overrides_win_over_artifact_properties() {
    let home = tempfile::tempdir().unwrap();
    let app_root = common::application(home.path(), "orders", None, &[]);
    std::fs::write(app_root.join("keel-artifact.properties"), "env=dev\n").unwrap();

    let mut config = common::config(home.path());
    config.system_properties = vec!["-Oenv=prod".to_string()];
    let context = Arc::new(DeploymentContext::new(config));
    let (domains, apps) = factories(&context);

    domains.create_default().unwrap();
    let app = apps.create("orders").unwrap();
    assert_eq!(app.descriptor().property("env"), Some("prod"));
    assert_eq!(app.attribute_resolver().resolve_value("${env}").unwrap(), "prod");
}

#[test]
fn domain_with_applications_cannot_be_disposed() {
    let home = tempfile::tempdir().unwrap();
    common::application(home.path(), "orders", None, &[]);
    let context = common::context(home.path());
    let (domains, apps) = factories(&context);
    domains.create_default().unwrap();
    apps.create("orders").unwrap();

    let err = domains.dispose("default").unwrap_err();
    assert!(err.to_string().contains("orders"));
    assert!(context.registry().contains("default"));

    apps.dispose("orders").unwrap();
    domains.dispose("default").unwrap();
    assert!(context.registry().is_empty());
    assert_eq!(context.arena().len(), 1);
}

#[test]
fn full_lifecycle_through_the_registry() {
    let home = tempfile::tempdir().unwrap();
    common::application(home.path(), "orders", None, &[]);
    let context = common::context(home.path());
    let (domains, apps) = factories(&context);
    domains.create_default().unwrap();
    apps.create("orders").unwrap();

    let registry = context.registry();
    registry.start("default").unwrap();
    registry.start("orders").unwrap();
    registry.stop("orders").unwrap();
    assert_eq!(registry.state("orders"), Some(ArtifactState::Stopped));

    apps.dispose("orders").unwrap();
    assert!(registry.state("orders").is_none());
}

#[test]
fn application_factory_refuses_to_dispose_a_domain() {
    let home = tempfile::tempdir().unwrap();
    common::application(home.path(), "orders", None, &[]);
    let context = common::context(home.path());
    let (domains, apps) = factories(&context);
    let domain = domains.create_default().unwrap();
    let app = apps.create("orders").unwrap();

    let err = apps.dispose("default").unwrap_err();
    match err {
        DeploymentError::KindMismatch { name, expected, actual } => {
            assert_eq!(name, "default");
            assert_eq!(expected, ArtifactKind::Application);
            assert_eq!(actual, ArtifactKind::Domain);
        }
        other => panic!("expected KindMismatch, got {other:?}"),
    }

    assert!(context.registry().contains("default"));
    assert!(context.registry().contains("orders"));
    assert!(context.arena().contains(domain.scope()));
    assert!(context.arena().contains(app.scope()));
}

#[test]
fn domain_factory_refuses_to_dispose_an_application() {
    let home = tempfile::tempdir().unwrap();
    common::application(home.path(), "orders", None, &[]);
    let context = common::context(home.path());
    let (domains, apps) = factories(&context);
    domains.create_default().unwrap();
    let app = apps.create("orders").unwrap();

    let err = domains.dispose("orders").unwrap_err();
    assert!(matches!(err, DeploymentError::KindMismatch { actual: ArtifactKind::Application, .. }));
    assert!(context.registry().contains("orders"));
    assert!(context.arena().contains(app.scope()));
}

#[test]
fn created_artifact_debug_output_names_it() {
    let home = tempfile::tempdir().unwrap();
    let context = common::context(home.path());
    let (domains, _) = factories(&context);

    let domain = domains.create_default().unwrap();
    let debug = format!("{domain:?}");
    assert!(debug.contains("ArtifactWrapper"));
    assert!(debug.contains("\"default\""));
}
