//! Optimistic-concurrency rules for note writes.
//!
//! # Invariants
//! - Created notes start at version 1.
//! - An accepted update writes `claimed + 1` and a strictly later `updated`.
//! - A claim older than the persisted version is a conflict and writes nothing.
//! - The version check is re-asserted inside the store's conditional update,
//!   so two writers holding the same claim cannot both succeed.

use crate::error::{MalformedReason, NoteError, NoteResult};
use crate::guard::access::AccessGuard;
use crate::model::note::{
    validate_text, NewNote, Note, NoteBody, NoteFields, NoteId, Timestamp, DEFAULT_STATUS,
    INITIAL_VERSION,
};
use crate::model::owner::OwnerId;
use crate::repo::note_store::{NoteFilter, NoteStore};
use log::{debug, warn};

/// Result of an accepted upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(Note),
    Updated(Note),
}

impl UpsertOutcome {
    pub fn note(&self) -> &Note {
        match self {
            Self::Created(note) | Self::Updated(note) => note,
        }
    }

    pub fn into_note(self) -> Note {
        match self {
            Self::Created(note) | Self::Updated(note) => note,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// One upsert as received from the boundary.
#[derive(Debug, Clone, Copy)]
pub struct UpsertRequest<'a> {
    /// Id addressed by the request (e.g. the resource path).
    pub target: Option<NoteId>,
    pub body: &'a NoteBody,
    /// Version asserted out of band (e.g. an ETag), preferred over `body.version`.
    pub version_tag: Option<i64>,
}

/// Applies create/update decisions in a fixed order.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionGuard {
    access: AccessGuard,
}

impl VersionGuard {
    pub fn new(access: AccessGuard) -> Self {
        Self { access }
    }

    /// Resolves the version the caller claims to have seen.
    ///
    /// The out-of-band tag wins over the body field. Non-positive values count
    /// as absent.
    pub fn resolve_claimed_version(version_tag: Option<i64>, body_version: Option<i64>) -> Option<i64> {
        let tag = version_tag.filter(|version| *version > 0);
        let body = body_version.filter(|version| *version > 0);
        if let (Some(tag), Some(body)) = (tag, body) {
            if tag != body {
                warn!(
                    "event=version_resolve module=guard status=diverged tag_version={tag} body_version={body} chosen=tag"
                );
            }
        }
        tag.or(body)
    }

    /// Inserts a new note owned by `identity` at version 1.
    pub fn create<S: NoteStore + ?Sized>(
        &self,
        store: &S,
        identity: &OwnerId,
        fields: &NoteFields,
        now: Timestamp,
    ) -> NoteResult<Note> {
        validate_text(&fields.text)
            .map_err(|_| NoteError::MalformedRequest(MalformedReason::MissingText))?;

        let note = store.insert(&NewNote {
            text: fields.text.clone(),
            status: fields
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            updated: now,
            owner: identity.clone(),
            version: INITIAL_VERSION,
        })?;
        debug!("event=version_create module=guard status=ok note_id={}", note.id);
        Ok(note)
    }

    /// Runs the upsert decision table.
    ///
    /// 1. addressed id and body id differ -> malformed request
    /// 2. blank text -> malformed request
    /// 3. no body id -> create
    /// 4. note absent -> gone
    /// 5. not the owner -> forbidden
    /// 6. no version claim -> version required
    /// 7. claim older than persisted -> conflict
    /// 8. conditional write; lost race -> gone or conflict
    pub fn apply_update<S: NoteStore + ?Sized>(
        &self,
        store: &S,
        identity: &OwnerId,
        request: &UpsertRequest<'_>,
        now: Timestamp,
    ) -> NoteResult<UpsertOutcome> {
        let body = request.body;
        if let (Some(target), Some(body_id)) = (request.target, body.id) {
            if target != body_id {
                return Err(NoteError::MalformedRequest(MalformedReason::IdMismatch {
                    target,
                    body: body_id,
                }));
            }
        }

        validate_text(&body.text)
            .map_err(|_| NoteError::MalformedRequest(MalformedReason::MissingText))?;

        let Some(id) = body.id else {
            let fields = NoteFields {
                text: body.text.clone(),
                status: body.status.clone(),
            };
            return self
                .create(store, identity, &fields, now)
                .map(UpsertOutcome::Created);
        };

        let persisted = store
            .find_one(&NoteFilter::by_id(id))?
            .ok_or(NoteError::Gone(id))?;
        self.access.ensure_owner(identity, &persisted)?;

        let claimed = Self::resolve_claimed_version(request.version_tag, body.version)
            .ok_or(NoteError::VersionRequired(id))?;
        if claimed < persisted.version {
            return Err(NoteError::Conflict {
                id,
                claimed,
                current: persisted.version,
            });
        }

        let version = claimed.checked_add(1).ok_or(NoteError::MalformedRequest(
            MalformedReason::VersionOutOfRange(claimed),
        ))?;
        let next = Note {
            id,
            text: body.text.clone(),
            status: body.status.clone().unwrap_or(persisted.status),
            updated: now.max(persisted.updated.saturating_add(1)),
            owner: persisted.owner,
            version,
        };

        if store.update_if_version_at_most(id, &next, claimed)? == 0 {
            // Lost the race between our read and the conditional write.
            return match store.find_one(&NoteFilter::by_id(id))? {
                None => Err(NoteError::Gone(id)),
                Some(current) => Err(NoteError::Conflict {
                    id,
                    claimed,
                    current: current.version,
                }),
            };
        }

        debug!(
            "event=version_update module=guard status=ok note_id={id} version={}",
            next.version
        );
        Ok(UpsertOutcome::Updated(next))
    }
}

#[cfg(test)]
mod tests {
    use super::{UpsertOutcome, UpsertRequest, VersionGuard};
    use crate::db::open_db_in_memory;
    use crate::error::{MalformedReason, NoteError};
    use crate::model::note::{Note, NoteBody, NoteFields};
    use crate::model::owner::OwnerId;
    use crate::repo::note_store::{NoteFilter, NoteStore, SqliteNoteStore};
    use uuid::Uuid;

    fn alice() -> OwnerId {
        OwnerId::parse("alice").expect("valid owner")
    }

    fn update(
        guard: &VersionGuard,
        store: &SqliteNoteStore<'_>,
        target: Option<Uuid>,
        body: &NoteBody,
        tag: Option<i64>,
        now: i64,
    ) -> Result<UpsertOutcome, NoteError> {
        let request = UpsertRequest {
            target,
            body,
            version_tag: tag,
        };
        guard.apply_update(store, &alice(), &request, now)
    }

    fn seeded(store: &SqliteNoteStore<'_>) -> Note {
        VersionGuard::default()
            .create(store, &alice(), &NoteFields::new("A"), 1_000)
            .expect("create should succeed")
    }

    #[test]
    fn tag_is_preferred_over_body_version() {
        assert_eq!(VersionGuard::resolve_claimed_version(Some(2), Some(3)), Some(2));
        assert_eq!(VersionGuard::resolve_claimed_version(None, Some(3)), Some(3));
        assert_eq!(VersionGuard::resolve_claimed_version(Some(0), Some(3)), Some(3));
        assert_eq!(VersionGuard::resolve_claimed_version(None, None), None);
        assert_eq!(VersionGuard::resolve_claimed_version(Some(-1), Some(0)), None);
    }

    #[test]
    fn create_starts_at_version_one_with_default_status() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let note = seeded(&store);
        assert_eq!(note.version, 1);
        assert_eq!(note.status, "active");
        assert_eq!(note.owner, alice());
        assert_eq!(note.updated, 1_000);
    }

    #[test]
    fn mismatched_ids_are_rejected_before_text_validation() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let body = NoteBody::new("").with_id(Uuid::new_v4());
        let err = update(&VersionGuard::default(), &store, Some(Uuid::new_v4()), &body, None, 1)
            .expect_err("mismatch must fail");
        assert!(matches!(
            err,
            NoteError::MalformedRequest(MalformedReason::IdMismatch { .. })
        ));
    }

    #[test]
    fn blank_text_is_malformed() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let err = update(&VersionGuard::default(), &store, None, &NoteBody::new("  "), None, 1)
            .expect_err("blank text must fail");
        assert!(matches!(
            err,
            NoteError::MalformedRequest(MalformedReason::MissingText)
        ));
    }

    #[test]
    fn missing_version_is_reported_after_existence_check() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let guard = VersionGuard::default();
        let note = seeded(&store);

        let err = update(&guard, &store, Some(note.id), &NoteBody::new("B").with_id(note.id), None, 2_000)
            .expect_err("version is required");
        assert!(matches!(err, NoteError::VersionRequired(id) if id == note.id));

        let missing = Uuid::new_v4();
        let err = update(&guard, &store, Some(missing), &NoteBody::new("B").with_id(missing), None, 2_000)
            .expect_err("absent note is gone");
        assert!(matches!(err, NoteError::Gone(id) if id == missing));
    }

    #[test]
    fn newer_claim_is_accepted_and_bumps_from_claim() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let note = seeded(&store);

        let body = NoteBody::new("B").with_id(note.id).with_version(5);
        let outcome = update(&VersionGuard::default(), &store, Some(note.id), &body, None, 2_000)
            .expect("claim above persisted is accepted");
        assert_eq!(outcome.note().version, 6);
    }

    #[test]
    fn body_without_id_creates_even_when_addressed() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let note = seeded(&store);

        let body = NoteBody::new("B");
        let outcome = update(&VersionGuard::default(), &store, Some(note.id), &body, None, 2_000)
            .expect("create");
        assert!(outcome.is_created());
        assert_ne!(outcome.note().id, note.id);
        assert_eq!(outcome.note().version, 1);
    }

    #[test]
    fn claim_at_the_version_ceiling_is_malformed() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let note = seeded(&store);

        let body = NoteBody::new("B").with_id(note.id).with_version(i64::MAX);
        let err = update(&VersionGuard::default(), &store, Some(note.id), &body, None, 2_000)
            .expect_err("no room for a next version");
        assert!(matches!(
            err,
            NoteError::MalformedRequest(MalformedReason::VersionOutOfRange(i64::MAX))
        ));
        let persisted = store
            .find_one(&NoteFilter::by_id(note.id))
            .expect("find")
            .expect("present");
        assert_eq!(persisted.version, 1);
    }

    #[test]
    fn updated_is_strictly_later_even_when_clock_stalls() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let note = seeded(&store);

        let body = NoteBody::new("B").with_id(note.id).with_version(1);
        let outcome = update(&VersionGuard::default(), &store, Some(note.id), &body, None, 500)
            .expect("update");
        assert_eq!(outcome.note().updated, 1_001);
    }

    #[test]
    fn conditional_write_losing_to_a_newer_version_is_a_conflict() {
        let conn = open_db_in_memory().expect("db");
        let store = SqliteNoteStore::try_new(&conn).expect("store");
        let note = seeded(&store);

        let mut newer = note.clone();
        newer.version = 3;
        assert_eq!(store.update(note.id, &newer).expect("raw update"), 1);

        let mut stale = note.clone();
        stale.version = 2;
        assert_eq!(
            store
                .update_if_version_at_most(note.id, &stale, 1)
                .expect("conditional update"),
            0
        );
        let persisted = store
            .find_one(&NoteFilter::by_id(note.id))
            .expect("find")
            .expect("still present");
        assert_eq!(persisted.version, 3);
    }
}
