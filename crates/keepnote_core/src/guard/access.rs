//! Single-owner access checks.

use crate::error::{NoteError, NoteResult};
use crate::model::note::Note;
use crate::model::owner::OwnerId;

/// Authorization decision for one identity against one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

/// Grants access iff the identity owns the note.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn authorize(&self, identity: &OwnerId, note: &Note) -> Access {
        if &note.owner == identity {
            Access::Allowed
        } else {
            Access::Denied
        }
    }

    /// Maps a denial to `NoteError::Forbidden` carrying only the note id.
    pub fn ensure_owner(&self, identity: &OwnerId, note: &Note) -> NoteResult<()> {
        match self.authorize(identity, note) {
            Access::Allowed => Ok(()),
            Access::Denied => Err(NoteError::Forbidden(note.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Access, AccessGuard};
    use crate::error::NoteError;
    use crate::model::note::Note;
    use crate::model::owner::OwnerId;
    use uuid::Uuid;

    fn owner(name: &str) -> OwnerId {
        OwnerId::parse(name).expect("valid owner")
    }

    fn note_of(name: &str) -> Note {
        Note {
            id: Uuid::new_v4(),
            text: "secret".to_string(),
            status: "active".to_string(),
            updated: 1,
            owner: owner(name),
            version: 1,
        }
    }

    #[test]
    fn owner_is_allowed() {
        let note = note_of("alice");
        assert_eq!(AccessGuard::new().authorize(&owner("alice"), &note), Access::Allowed);
        assert!(AccessGuard::new().ensure_owner(&owner("alice"), &note).is_ok());
    }

    #[test]
    fn other_identity_is_denied_with_forbidden() {
        let note = note_of("alice");
        let guard = AccessGuard::new();
        assert_eq!(guard.authorize(&owner("bob"), &note), Access::Denied);

        let err = guard
            .ensure_owner(&owner("bob"), &note)
            .expect_err("bob must be denied");
        assert!(matches!(err, NoteError::Forbidden(id) if id == note.id));
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let note = note_of("alice");
        assert_eq!(AccessGuard::new().authorize(&owner("Alice"), &note), Access::Denied);
    }
}
