//! Isolation scopes: one loading boundary per deployed unit and per plugin.
//!
//! Scopes form a tree stored in a [`ScopeArena`] and are addressed by
//! [`ScopeId`]. Parents own their children; tearing a scope down removes its
//! whole subtree, deepest scopes first.

use crate::error::{DeploymentError, DeploymentResult};
use keel_descriptor::{ArtifactDescriptor, ArtifactKind, PluginDescriptor};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Name of the root scope every arena starts with.
pub const CONTAINER_SCOPE_NAME: &str = "container";

/// Handle of a scope inside its arena. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Container,
    Domain,
    Application,
    Plugin,
}

impl From<ArtifactKind> for ScopeKind {
    fn from(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Domain => Self::Domain,
            ArtifactKind::Application => Self::Application,
            ArtifactKind::Plugin => Self::Plugin,
        }
    }
}

/// A resource-loading boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationScope {
    pub id: ScopeId,
    pub name: String,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Locations this scope loads from, in lookup order.
    pub resources: Vec<PathBuf>,
}

struct ArenaSlots {
    scopes: HashMap<ScopeId, IsolationScope>,
    by_name: HashMap<String, ScopeId>,
    next_id: usize,
}

/// Owns every live scope.
pub struct ScopeArena {
    inner: RwLock<ArenaSlots>,
    container: ScopeId,
}

impl ScopeArena {
    /// Creates an arena holding only the container root scope.
    pub fn new() -> Self {
        let container = ScopeId(0);
        let root = IsolationScope {
            id: container,
            name: CONTAINER_SCOPE_NAME.to_string(),
            kind: ScopeKind::Container,
            parent: None,
            children: Vec::new(),
            resources: Vec::new(),
        };
        let slots = ArenaSlots {
            scopes: HashMap::from([(container, root)]),
            by_name: HashMap::from([(CONTAINER_SCOPE_NAME.to_string(), container)]),
            next_id: 1,
        };
        Self {
            inner: RwLock::new(slots),
            container,
        }
    }

    pub fn container(&self) -> ScopeId {
        self.container
    }

    /// Adds a scope under `parent`.
    ///
    /// Fails with [`DeploymentError::DuplicateName`] when a live scope already
    /// uses `name`, and with [`DeploymentError::ScopeNotFound`] when `parent`
    /// has been torn down.
    pub fn create(
        &self,
        name: impl Into<String>,
        kind: ScopeKind,
        parent: Option<ScopeId>,
        resources: Vec<PathBuf>,
    ) -> DeploymentResult<ScopeId> {
        let name = name.into();
        let mut arena = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if arena.by_name.contains_key(&name) {
            return Err(DeploymentError::DuplicateName(name));
        }
        if let Some(parent) = parent {
            if !arena.scopes.contains_key(&parent) {
                return Err(DeploymentError::ScopeNotFound(parent));
            }
        }

        let id = ScopeId(arena.next_id);
        arena.next_id += 1;
        arena.scopes.insert(
            id,
            IsolationScope {
                id,
                name: name.clone(),
                kind,
                parent,
                children: Vec::new(),
                resources,
            },
        );
        if let Some(parent) = parent.and_then(|p| arena.scopes.get_mut(&p)) {
            parent.children.push(id);
        }
        debug!(scope = %name, id = %id, "Created isolation scope");
        arena.by_name.insert(name, id);
        Ok(id)
    }

    pub fn get(&self, id: ScopeId) -> Option<IsolationScope> {
        self.read().scopes.get(&id).cloned()
    }

    pub fn lookup(&self, name: &str) -> Option<ScopeId> {
        self.read().by_name.get(name).copied()
    }

    pub fn contains(&self, id: ScopeId) -> bool {
        self.read().scopes.contains_key(&id)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.read().scopes.get(&id).and_then(|scope| scope.parent)
    }

    pub fn children(&self, id: ScopeId) -> Vec<ScopeId> {
        self.read()
            .scopes
            .get(&id)
            .map(|scope| scope.children.clone())
            .unwrap_or_default()
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn ancestry(&self, id: ScopeId) -> Vec<ScopeId> {
        let arena = self.read();
        let mut chain = Vec::new();
        let mut current = arena.scopes.get(&id);
        while let Some(scope) = current {
            chain.push(scope.id);
            current = scope.parent.and_then(|p| arena.scopes.get(&p));
        }
        chain
    }

    /// Removes `id` and its subtree, children before parents. Returns the
    /// removed ids in removal order; empty when `id` is not live.
    pub fn teardown(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut arena = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(parent) = arena.scopes.get(&id).map(|scope| scope.parent) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        Self::remove_subtree(&mut arena, id, &mut removed);
        if let Some(parent) = parent.and_then(|p| arena.scopes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        info!(id = %id, removed = removed.len(), "Tore down isolation scope");
        removed
    }

    fn remove_subtree(arena: &mut ArenaSlots, id: ScopeId, removed: &mut Vec<ScopeId>) {
        let children = arena
            .scopes
            .get(&id)
            .map(|scope| scope.children.clone())
            .unwrap_or_default();
        for child in children {
            Self::remove_subtree(arena, child, removed);
        }
        if let Some(scope) = arena.scopes.remove(&id) {
            arena.by_name.remove(&scope.name);
            removed.push(id);
        }
    }

    /// Number of live scopes, the container root included.
    pub fn len(&self) -> usize {
        self.read().scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ArenaSlots> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Scopes created for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactScopes {
    pub unit: ScopeId,
    pub plugins: BTreeMap<String, ScopeId>,
}

impl ArtifactScopes {
    pub fn plugin(&self, name: &str) -> Option<ScopeId> {
        self.plugins.get(name).copied()
    }
}

/// Scope name of a plugin owned by `unit`.
pub fn plugin_scope_name(unit: &str, plugin: &str) -> String {
    format!("{unit}/plugin/{plugin}")
}

/// Builds the scope tree for a unit and its plugins.
pub struct IsolationHierarchyBuilder {
    arena: Arc<ScopeArena>,
}

impl IsolationHierarchyBuilder {
    pub fn new(arena: Arc<ScopeArena>) -> Self {
        Self { arena }
    }

    /// Creates the unit scope under `parent` and one child scope per plugin.
    ///
    /// Each scope loads from its descriptor's root followed by that
    /// descriptor's library dependencies; plugin dependencies get sibling
    /// scopes of their own. Plugins are processed in name order, so the
    /// result does not depend on the order of `plugins`. If any scope cannot
    /// be created, the scopes made so far are torn down.
    pub fn build(
        &self,
        unit: &ArtifactDescriptor,
        plugins: &[PluginDescriptor],
        parent: Option<ScopeId>,
    ) -> DeploymentResult<ArtifactScopes> {
        let unit_scope = self.arena.create(
            unit.name(),
            ScopeKind::from(unit.kind()),
            parent,
            scope_resources(unit),
        )?;

        let mut ordered: Vec<&PluginDescriptor> = plugins.iter().collect();
        ordered.sort_by(|a, b| a.name().cmp(b.name()));

        let mut plugin_scopes = BTreeMap::new();
        for plugin in ordered {
            let created = self.arena.create(
                plugin_scope_name(unit.name(), plugin.name()),
                ScopeKind::Plugin,
                Some(unit_scope),
                scope_resources(plugin),
            );
            match created {
                Ok(id) => {
                    plugin_scopes.insert(plugin.name().to_string(), id);
                }
                Err(e) => {
                    self.arena.teardown(unit_scope);
                    return Err(e);
                }
            }
        }

        for plugin in plugins {
            assert!(
                plugin_scopes.contains_key(plugin.name()),
                "plugin '{}' has no isolation scope under '{}'",
                plugin.name(),
                unit.name()
            );
        }

        info!(
            artifact = %unit.name(),
            scope = %unit_scope,
            plugins = plugin_scopes.len(),
            "Built isolation hierarchy"
        );
        Ok(ArtifactScopes {
            unit: unit_scope,
            plugins: plugin_scopes,
        })
    }
}

fn scope_resources(descriptor: &ArtifactDescriptor) -> Vec<PathBuf> {
    std::iter::once(descriptor.root().to_path_buf())
        .chain(
            descriptor
                .library_dependencies()
                .into_iter()
                .map(|dependency| dependency.location.clone()),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_arena_has_container_root() {
        let arena = ScopeArena::new();
        assert_eq!(arena.len(), 1);
        let root = arena.get(arena.container()).unwrap();
        assert_eq!(root.name, CONTAINER_SCOPE_NAME);
        assert_eq!(root.kind, ScopeKind::Container);
        assert_eq!(arena.parent(arena.container()), None);
    }

    #[test]
    fn create_links_parent_and_child() {
        let arena = ScopeArena::new();
        let domain = arena
            .create("shared", ScopeKind::Domain, Some(arena.container()), vec![])
            .unwrap();
        let app = arena.create("orders", ScopeKind::Application, Some(domain), vec![]).unwrap();

        assert_eq!(arena.children(domain), vec![app]);
        assert_eq!(arena.parent(app), Some(domain));
        assert_eq!(arena.ancestry(app), vec![app, domain, arena.container()]);
        assert_eq!(arena.lookup("orders"), Some(app));
    }

    #[test]
    fn duplicate_live_name_is_rejected() {
        let arena = ScopeArena::new();
        arena.create("orders", ScopeKind::Application, None, vec![]).unwrap();
        let err = arena.create("orders", ScopeKind::Application, None, vec![]).unwrap_err();
        assert!(matches!(err, DeploymentError::DuplicateName(ref n) if n == "orders"));
    }

    #[test]
    fn teardown_is_bottom_up_and_detaches_from_parent() {
        let arena = ScopeArena::new();
        let domain = arena
            .create("shared", ScopeKind::Domain, Some(arena.container()), vec![])
            .unwrap();
        let plugin = arena.create("shared/plugin/http", ScopeKind::Plugin, Some(domain), vec![]).unwrap();
        let app = arena.create("orders", ScopeKind::Application, Some(domain), vec![]).unwrap();
        let app_plugin = arena.create("orders/plugin/db", ScopeKind::Plugin, Some(app), vec![]).unwrap();

        let removed = arena.teardown(domain);
        assert_eq!(removed, vec![plugin, app_plugin, app, domain]);
        assert_eq!(arena.len(), 1);
        assert!(arena.children(arena.container()).is_empty());
        assert!(!arena.contains(app_plugin));
        assert_eq!(arena.lookup("orders"), None);
    }

    #[test]
    fn teardown_of_unknown_scope_is_empty() {
        let arena = ScopeArena::new();
        let id = arena.create("a", ScopeKind::Domain, None, vec![]).unwrap();
        assert_eq!(arena.teardown(id), vec![id]);
        assert!(arena.teardown(id).is_empty());
    }

    #[test]
    fn name_is_reusable_after_teardown() {
        let arena = ScopeArena::new();
        let first = arena.create("a", ScopeKind::Domain, None, vec![]).unwrap();
        arena.teardown(first);
        let second = arena.create("a", ScopeKind::Domain, None, vec![]).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn dead_parent_is_rejected() {
        let arena = ScopeArena::new();
        let domain = arena
            .create("shared", ScopeKind::Domain, Some(arena.container()), vec![])
            .unwrap();
        arena.teardown(domain);

        let err = arena
            .create("orders", ScopeKind::Application, Some(domain), vec![])
            .unwrap_err();
        assert!(matches!(err, DeploymentError::ScopeNotFound(id) if id == domain));
        assert_eq!(arena.lookup("orders"), None);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn torn_down_scopes_release_their_storage() {
        let arena = ScopeArena::new();
        for _ in 0..16 {
            let id = arena.create("orders", ScopeKind::Application, None, vec![]).unwrap();
            arena.create("orders/plugin/db", ScopeKind::Plugin, Some(id), vec![]).unwrap();
            arena.teardown(id);
        }
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.read().scopes.len(), 1);
        assert!(arena.read().by_name.contains_key(CONTAINER_SCOPE_NAME));
    }
}
