//! Default data for fresh installs.

use crate::clock::Clock;
use crate::model::note::{NewNote, DEFAULT_STATUS, INITIAL_VERSION};
use crate::model::owner::OwnerId;
use crate::repo::note_store::{NoteFilter, NoteStore};
use crate::repo::owner_repo::OwnerRepository;
use crate::repo::RepoResult;
use log::info;

/// What seeding did for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub owner: OwnerId,
    pub owner_created: bool,
    pub notes_seeded: usize,
}

/// Ensures each owner exists and has at least one note.
///
/// Owners without notes receive `per_owner` notes named `Note {owner}{i}`.
/// Owners that already have notes are left untouched. No change events are
/// emitted; seeding runs before any subscriber can connect.
pub fn ensure_default_data<O, S>(
    owners: &O,
    store: &S,
    clock: &dyn Clock,
    names: &[OwnerId],
    per_owner: usize,
) -> RepoResult<Vec<SeedReport>>
where
    O: OwnerRepository + ?Sized,
    S: NoteStore + ?Sized,
{
    let mut reports = Vec::with_capacity(names.len());
    for owner in names {
        let owner_created = owners.ensure_owner(owner, clock.now_ms())?;
        let existing = store.find(&NoteFilter::by_owner(owner))?.len();

        let mut notes_seeded = 0;
        if existing == 0 {
            for index in 0..per_owner {
                store.insert(&NewNote {
                    text: format!("Note {owner}{index}"),
                    status: DEFAULT_STATUS.to_string(),
                    updated: clock.now_ms(),
                    owner: owner.clone(),
                    version: INITIAL_VERSION,
                })?;
                notes_seeded += 1;
            }
        }

        info!(
            "event=seed_owner module=service status=ok owner_created={owner_created} existing_notes={existing} notes_seeded={notes_seeded}"
        );
        reports.push(SeedReport {
            owner: owner.clone(),
            owner_created,
            notes_seeded,
        });
    }
    Ok(reports)
}
