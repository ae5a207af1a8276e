//! Note use-case service.
//!
//! # Responsibility
//! - Expose list/get/create/upsert/delete scoped to one owner identity.
//! - Bump the owner's freshness marker and publish a change event after
//!   every committed mutation.
//!
//! # Invariants
//! - Reads and writes of another owner's note yield `Forbidden`, never the body.
//! - `delete` is idempotent and always emits `deleted`.
//! - Broadcast delivery never affects an operation's result.
//! - Writes of one owner commit and publish one at a time, so subscribers
//!   see events in commit order.

use crate::broadcast::{ChangeBroadcaster, NoteEvent, Subscription};
use crate::cache::freshness::ConditionalCache;
use crate::clock::{Clock, SystemClock};
use crate::error::{NoteError, NoteResult};
use crate::guard::access::AccessGuard;
use crate::guard::version::{UpsertOutcome, UpsertRequest, VersionGuard};
use crate::model::note::{Note, NoteBody, NoteFields, NoteId, Timestamp};
use crate::model::owner::OwnerId;
use crate::repo::note_store::{NoteFilter, NoteStore};
use log::{error, info, warn};
use std::sync::Arc;

/// Result of a conditional collection read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// The caller's marker is current; no body needs to be sent.
    NotModified,
    /// Full collection plus the marker to present next time.
    Fresh { notes: Vec<Note>, marker: Timestamp },
}

/// Note service facade over a store implementation.
pub struct NoteService<S: NoteStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    access: AccessGuard,
    versions: VersionGuard,
    cache: Arc<ConditionalCache>,
    broadcaster: Arc<ChangeBroadcaster>,
}

impl<S: NoteStore> NoteService<S> {
    /// Creates a service stamping mutations with the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: NoteStore, C: Clock> NoteService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self::with_shared(
            store,
            clock,
            Arc::new(ConditionalCache::new()),
            Arc::new(ChangeBroadcaster::new()),
        )
    }

    /// Creates a service sharing freshness markers and subscribers with
    /// other services over the same store (e.g. one per connection).
    pub fn with_shared(
        store: S,
        clock: C,
        cache: Arc<ConditionalCache>,
        broadcaster: Arc<ChangeBroadcaster>,
    ) -> Self {
        let access = AccessGuard::new();
        Self {
            store,
            clock,
            access,
            versions: VersionGuard::new(access),
            cache,
            broadcaster,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ConditionalCache> {
        &self.cache
    }

    pub fn broadcaster(&self) -> &Arc<ChangeBroadcaster> {
        &self.broadcaster
    }

    /// Opens a change subscription for an authenticated identity.
    pub fn subscribe(&self, identity: &OwnerId) -> Subscription {
        self.broadcaster.subscribe(identity)
    }

    /// Lists the identity's notes unless `client_marker` proves the caller
    /// already holds the current view.
    pub fn list(
        &self,
        identity: &OwnerId,
        client_marker: Option<Timestamp>,
    ) -> NoteResult<ListOutcome> {
        if self.cache.should_serve_cached(identity, client_marker) {
            info!("event=note_list module=service status=ok result=not_modified");
            return Ok(ListOutcome::NotModified);
        }

        // Marker first: a write racing this read then invalidates it.
        let marker = self.cache.mark_fresh(identity, self.clock.now_ms());
        let notes = self
            .store
            .find(&NoteFilter::by_owner(identity))
            .map_err(|err| self.failed("note_list", None, err.into()))?;

        info!(
            "event=note_list module=service status=ok result=fresh count={} marker={marker}",
            notes.len()
        );
        Ok(ListOutcome::Fresh { notes, marker })
    }

    /// Reads one note owned by `identity`.
    pub fn get(&self, id: NoteId, identity: &OwnerId) -> NoteResult<Note> {
        let note = self
            .store
            .find_one(&NoteFilter::by_id(id))
            .map_err(|err| self.failed("note_get", Some(id), err.into()))?
            .ok_or_else(|| self.failed("note_get", Some(id), NoteError::NotFound(id)))?;

        self.access
            .ensure_owner(identity, &note)
            .map_err(|err| self.failed("note_get", Some(id), err))?;

        info!(
            "event=note_get module=service status=ok note_id={id} version={}",
            note.version
        );
        Ok(note)
    }

    /// Creates a note owned by `identity` and emits `created`.
    pub fn create(&self, identity: &OwnerId, fields: &NoteFields) -> NoteResult<Note> {
        let note = self
            .broadcaster
            .in_order(identity, || -> NoteResult<Note> {
                let now = self.clock.now_ms();
                let note = self.versions.create(&self.store, identity, fields, now)?;
                self.commit(identity, now, NoteEvent::created(note.clone()));
                Ok(note)
            })
            .map_err(|err| self.failed("note_create", None, err))?;

        info!("event=note_create module=service status=ok note_id={}", note.id);
        Ok(note)
    }

    /// Creates or updates a note under optimistic concurrency.
    ///
    /// `id` is the addressed note; `version_tag` is a version asserted outside
    /// the body and takes precedence over `body.version`. A body without `_id`
    /// always creates.
    pub fn upsert(
        &self,
        id: Option<NoteId>,
        identity: &OwnerId,
        body: &NoteBody,
        version_tag: Option<i64>,
    ) -> NoteResult<UpsertOutcome> {
        let request = UpsertRequest {
            target: id,
            body,
            version_tag,
        };
        let outcome = self
            .broadcaster
            .in_order(identity, || -> NoteResult<UpsertOutcome> {
                let now = self.clock.now_ms();
                let outcome = self
                    .versions
                    .apply_update(&self.store, identity, &request, now)?;
                let note = outcome.note().clone();
                let at = note.updated.max(now);
                let event = if outcome.is_created() {
                    NoteEvent::created(note)
                } else {
                    NoteEvent::updated(note)
                };
                self.commit(identity, at, event);
                Ok(outcome)
            })
            .map_err(|err| self.failed("note_upsert", body.id.or(id), err))?;

        info!(
            "event=note_upsert module=service status=ok result={} note_id={} version={}",
            if outcome.is_created() { "created" } else { "updated" },
            outcome.note().id,
            outcome.note().version
        );
        Ok(outcome)
    }

    /// Deletes a note owned by `identity`.
    ///
    /// Succeeds when the note is already absent; fails with `Forbidden` only
    /// when it exists under another owner.
    pub fn delete(&self, id: NoteId, identity: &OwnerId) -> NoteResult<()> {
        let removed = self
            .broadcaster
            .in_order(identity, || -> NoteResult<usize> {
                if let Some(note) = self.store.find_one(&NoteFilter::by_id(id))? {
                    self.access.ensure_owner(identity, &note)?;
                }
                let removed = self.store.remove(&NoteFilter::owned(id, identity))?;
                self.commit(
                    identity,
                    self.clock.now_ms(),
                    NoteEvent::deleted(identity.clone(), id),
                );
                Ok(removed)
            })
            .map_err(|err| self.failed("note_delete", Some(id), err))?;

        info!("event=note_delete module=service status=ok note_id={id} removed={removed}");
        Ok(())
    }

    fn commit(&self, identity: &OwnerId, at: Timestamp, event: NoteEvent) {
        self.cache.record_mutation(identity, at);
        self.broadcaster.publish(identity, event);
    }

    fn failed(&self, op: &'static str, id: Option<NoteId>, err: NoteError) -> NoteError {
        let note_id = id.map_or_else(|| "-".to_string(), |id| id.to_string());
        match &err {
            NoteError::Conflict {
                claimed, current, ..
            } => warn!(
                "event={op} module=service status=error error_code=conflict note_id={note_id} claimed={claimed} current={current}"
            ),
            NoteError::Storage(cause) => error!(
                "event={op} module=service status=error error_code=storage note_id={note_id} error={cause}"
            ),
            other => warn!(
                "event={op} module=service status=error error_code={} note_id={note_id}",
                other.code()
            ),
        }
        err
    }
}
