//! Guards against duplicate generation requests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::ArtifactKind;
use crate::{Error, Result};

type Key = (String, ArtifactKind);

/// Set of `(session_id, artifact)` generations currently outstanding.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<Key>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Key>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the slot for `(session_id, kind)`; a second claim fails until the
    /// guard is dropped.
    pub fn try_acquire(&self, session_id: &str, kind: ArtifactKind) -> Result<InFlightGuard> {
        let key = (session_id.to_string(), kind);
        if !self.lock().insert(key.clone()) {
            return Err(Error::AlreadyInFlight {
                session_id: session_id.to_string(),
                kind,
            });
        }
        Ok(InFlightGuard {
            registry: self.clone(),
            key,
        })
    }

    pub fn is_active(&self, session_id: &str, kind: ArtifactKind) -> bool {
        self.lock().contains(&(session_id.to_string(), kind))
    }
}

/// Releases its slot when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    key: Key,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}
