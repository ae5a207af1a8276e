//! Note domain model.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `text` is never empty.
//! - `version` starts at 1 and only ever grows.
//! - `updated` is Unix epoch milliseconds of the last successful mutation.

use crate::model::owner::OwnerId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a note, assigned by the store on insert.
pub type NoteId = Uuid;

/// Unix epoch milliseconds.
pub type Timestamp = i64;

/// Status assigned when the caller does not provide one.
pub const DEFAULT_STATUS: &str = "active";

/// Version every freshly created note starts at.
pub const INITIAL_VERSION: i64 = 1;

/// Canonical persisted note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
    /// Free-form, `active` unless the caller says otherwise.
    pub status: String,
    pub updated: Timestamp,
    /// Immutable after creation.
    pub owner: OwnerId,
    pub version: i64,
}

impl Note {
    /// Returns the concurrency metadata reported alongside a note.
    pub fn meta(&self) -> NoteMeta {
        NoteMeta {
            version: self.version,
            updated: self.updated,
        }
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_text(&self.text)?;
        validate_version(self.version)
    }
}

/// Version/updated pair returned with single-note responses.
///
/// Boundaries map this onto their own conditional-request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMeta {
    pub version: i64,
    pub updated: Timestamp,
}

/// Insert payload; the store assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub text: String,
    pub status: String,
    pub updated: Timestamp,
    pub owner: OwnerId,
    pub version: i64,
}

impl NewNote {
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_text(&self.text)?;
        validate_version(self.version)
    }

    /// Materializes the persisted record under the given id.
    pub fn into_note(self, id: NoteId) -> Note {
        Note {
            id,
            text: self.text,
            status: self.status,
            updated: self.updated,
            owner: self.owner,
            version: self.version,
        }
    }
}

/// Caller-supplied fields for creating a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    pub text: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl NoteFields {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Body of an upsert request.
///
/// `id` and `version` mirror the fields a client echoes back from a note it
/// previously read; both are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteBody {
    #[serde(default, rename = "_id")]
    pub id: Option<NoteId>,
    pub text: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
}

impl NoteBody {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Note invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyText,
    NonPositiveVersion(i64),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "note text must not be empty"),
            Self::NonPositiveVersion(version) => {
                write!(f, "note version must be positive, got {version}")
            }
        }
    }
}

impl Error for NoteValidationError {}

/// Rejects empty and whitespace-only text.
pub fn validate_text(text: &str) -> Result<(), NoteValidationError> {
    if text.trim().is_empty() {
        return Err(NoteValidationError::EmptyText);
    }
    Ok(())
}

fn validate_version(version: i64) -> Result<(), NoteValidationError> {
    if version < INITIAL_VERSION {
        return Err(NoteValidationError::NonPositiveVersion(version));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_text, NewNote, NoteBody, NoteValidationError, DEFAULT_STATUS};
    use crate::model::owner::OwnerId;
    use uuid::Uuid;

    fn new_note(text: &str, version: i64) -> NewNote {
        NewNote {
            text: text.to_string(),
            status: DEFAULT_STATUS.to_string(),
            updated: 10,
            owner: OwnerId::parse("alice").expect("valid owner"),
            version,
        }
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(validate_text(""), Err(NoteValidationError::EmptyText));
        assert_eq!(validate_text(" \n\t"), Err(NoteValidationError::EmptyText));
        assert!(validate_text("x").is_ok());
    }

    #[test]
    fn zero_version_is_rejected() {
        let err = new_note("text", 0).validate().expect_err("version 0 must fail");
        assert_eq!(err, NoteValidationError::NonPositiveVersion(0));
    }

    #[test]
    fn into_note_keeps_fields_and_meta() {
        let id = Uuid::new_v4();
        let note = new_note("text", 3).into_note(id);
        assert_eq!(note.id, id);
        assert_eq!(note.meta().version, 3);
        assert_eq!(note.meta().updated, 10);
        assert!(note.validate().is_ok());
    }

    #[test]
    fn body_builders_fill_optional_fields() {
        let id = Uuid::new_v4();
        let body = NoteBody::new("B").with_id(id).with_version(2);
        assert_eq!(body.id, Some(id));
        assert_eq!(body.version, Some(2));
        assert_eq!(body.status, None);
    }
}
