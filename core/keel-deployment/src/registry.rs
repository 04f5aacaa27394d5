//! Registry of live artifacts keyed by unique name.

use crate::artifact::DeployableArtifact;
use crate::error::{DeploymentError, DeploymentResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle state of a registered artifact. Absent and disposed artifacts
/// have no entry.
///
/// `Starting` and `Stopping` mark an entry whose `start` or `stop` call is
/// still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Registered,
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Registered => "REGISTERED",
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
        })
    }
}

struct Transition {
    operation: &'static str,
    from: &'static [ArtifactState],
    pending: ArtifactState,
    done: ArtifactState,
}

struct RegistryEntry {
    artifact: Arc<dyn DeployableArtifact>,
    state: ArtifactState,
}

/// At most one live artifact per name.
///
/// Each operation is atomic per name. `start` and `stop` claim the entry by
/// moving it to a pending state, run the artifact's own lifecycle call with no
/// lock held, then commit the outcome if the same artifact is still
/// registered.
#[derive(Default)]
pub struct ArtifactRegistry {
    entries: DashMap<String, RegistryEntry>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `artifact` under `name` in state `REGISTERED`.
    ///
    /// Concurrent registrations of one name have exactly one winner; the
    /// others fail with [`DeploymentError::DuplicateName`].
    pub fn register(&self, name: &str, artifact: Arc<dyn DeployableArtifact>) -> DeploymentResult<()> {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(_) => Err(DeploymentError::DuplicateName(name.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(RegistryEntry {
                    artifact,
                    state: ArtifactState::Registered,
                });
                info!(artifact = %name, "Registered artifact");
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn DeployableArtifact>> {
        self.entries.get(name).map(|entry| Arc::clone(&entry.artifact))
    }

    pub fn state(&self, name: &str) -> Option<ArtifactState> {
        self.entries.get(name).map(|entry| entry.state)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// `REGISTERED | STOPPED → STARTED`. A failing start leaves the entry in
    /// its previous state.
    pub fn start(&self, name: &str) -> DeploymentResult<()> {
        self.transition(
            name,
            Transition {
                operation: "start",
                from: &[ArtifactState::Registered, ArtifactState::Stopped],
                pending: ArtifactState::Starting,
                done: ArtifactState::Started,
            },
            |artifact| artifact.start(),
        )
    }

    /// `STARTED → STOPPED`. A failing stop leaves the entry `STARTED`.
    pub fn stop(&self, name: &str) -> DeploymentResult<()> {
        self.transition(
            name,
            Transition {
                operation: "stop",
                from: &[ArtifactState::Started],
                pending: ArtifactState::Stopping,
                done: ArtifactState::Stopped,
            },
            |artifact| artifact.stop(),
        )
    }

    fn transition<F>(&self, name: &str, transition: Transition, call: F) -> DeploymentResult<()>
    where
        F: FnOnce(&dyn DeployableArtifact) -> DeploymentResult<()>,
    {
        let (artifact, previous) = {
            let mut entry = self
                .entries
                .get_mut(name)
                .ok_or_else(|| DeploymentError::ArtifactNotFound(name.to_string()))?;
            if !transition.from.contains(&entry.state) {
                return Err(DeploymentError::InvalidTransition {
                    name: name.to_string(),
                    state: entry.state,
                    operation: transition.operation,
                });
            }
            let previous = std::mem::replace(&mut entry.state, transition.pending);
            (Arc::clone(&entry.artifact), previous)
        };

        let outcome = call(artifact.as_ref());

        // The entry may have been unregistered, or replaced, while unlocked.
        match self.entries.get_mut(name) {
            Some(mut entry) if Arc::ptr_eq(&entry.artifact, &artifact) => {
                entry.state = if outcome.is_ok() { transition.done } else { previous };
            }
            _ => {
                warn!(
                    artifact = %name,
                    operation = transition.operation,
                    "Artifact was unregistered during its lifecycle call"
                );
            }
        }

        match outcome {
            Ok(()) => {
                info!(artifact = %name, state = %transition.done, "Artifact changed state");
                Ok(())
            }
            Err(e) => {
                warn!(
                    artifact = %name,
                    operation = transition.operation,
                    error = %e,
                    "Artifact lifecycle call failed"
                );
                Err(e)
            }
        }
    }

    /// Removes `name` regardless of state and returns what was registered.
    /// Unregistering an absent name is a no-op.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn DeployableArtifact>> {
        let (_, entry) = self.entries.remove(name)?;
        info!(artifact = %name, state = %entry.state, "Unregistered artifact");
        Some(entry.artifact)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
