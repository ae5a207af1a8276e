//! Per-owner freshness markers.
//!
//! # Invariants
//! - Markers are scoped per owner; one owner's writes never touch another
//!   owner's marker.
//! - A marker never decreases, and every mutation moves it strictly forward.
//! - A scope that was never listed or mutated cannot answer "not modified".

use crate::model::note::Timestamp;
use crate::model::owner::OwnerId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Tracks the last mutation time of each owner's collection.
#[derive(Debug, Default)]
pub struct ConditionalCache {
    markers: Mutex<HashMap<OwnerId, Timestamp>>,
}

impl ConditionalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a caller holding `client_marker` already has the
    /// current view of `scope`.
    pub fn should_serve_cached(&self, scope: &OwnerId, client_marker: Option<Timestamp>) -> bool {
        let Some(client_marker) = client_marker else {
            return false;
        };
        self.lock()
            .get(scope)
            .is_some_and(|marker| *marker <= client_marker)
    }

    /// Returns the marker to hand out with a full read, establishing it at
    /// `now` on first observation.
    pub fn mark_fresh(&self, scope: &OwnerId, now: Timestamp) -> Timestamp {
        *self.lock().entry(scope.clone()).or_insert(now)
    }

    /// Moves the marker of `scope` past `now` and past its previous value.
    pub fn record_mutation(&self, scope: &OwnerId, now: Timestamp) -> Timestamp {
        *self
            .lock()
            .entry(scope.clone())
            .and_modify(|marker| *marker = now.max(marker.saturating_add(1)))
            .or_insert(now)
    }

    /// Current marker of `scope`, if it has been observed.
    pub fn marker(&self, scope: &OwnerId) -> Option<Timestamp> {
        self.lock().get(scope).copied()
    }

    // Every critical section is a single map operation; a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<OwnerId, Timestamp>> {
        self.markers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
