use crate::model::note::{Note, NoteId};
use crate::model::owner::OwnerId;
use serde::{Deserialize, Serialize};

/// Kind of committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteEventKind {
    Created,
    Updated,
    Deleted,
}

impl NoteEventKind {
    /// Topic name used by push transports.
    pub fn topic(self) -> &'static str {
        match self {
            Self::Created => "note/created",
            Self::Updated => "note/updated",
            Self::Deleted => "note/deleted",
        }
    }
}

/// Change notification delivered to an owner's subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub kind: NoteEventKind,
    pub owner: OwnerId,
    pub note_id: NoteId,
    /// Full record for created/updated; `None` for deletions.
    pub note: Option<Note>,
}

impl NoteEvent {
    pub fn created(note: Note) -> Self {
        Self::with_note(NoteEventKind::Created, note)
    }

    pub fn updated(note: Note) -> Self {
        Self::with_note(NoteEventKind::Updated, note)
    }

    pub fn deleted(owner: OwnerId, note_id: NoteId) -> Self {
        Self {
            kind: NoteEventKind::Deleted,
            owner,
            note_id,
            note: None,
        }
    }

    fn with_note(kind: NoteEventKind, note: Note) -> Self {
        Self {
            kind,
            owner: note.owner.clone(),
            note_id: note.id,
            note: Some(note),
        }
    }
}
