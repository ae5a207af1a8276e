//! Operation error taxonomy shared by guards and the note service.

use crate::model::note::NoteId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NoteResult<T> = Result<T, NoteError>;

/// Why a request was rejected as malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// Text is missing or blank.
    MissingText,
    /// The addressed id and the body-embedded id disagree.
    IdMismatch { target: NoteId, body: NoteId },
    /// The claimed version leaves no room for a successor.
    VersionOutOfRange(i64),
}

/// Note operation error.
///
/// Every variant except `Storage` is recoverable by the caller.
#[derive(Debug)]
pub enum NoteError {
    MalformedRequest(MalformedReason),
    /// The caller does not own the note.
    Forbidden(NoteId),
    /// No such note is visible.
    NotFound(NoteId),
    /// The note existed but is gone now.
    Gone(NoteId),
    /// Update carried no version assertion.
    VersionRequired(NoteId),
    /// Claimed version is older than the persisted one.
    Conflict {
        id: NoteId,
        claimed: i64,
        current: i64,
    },
    Storage(RepoError),
}

impl NoteError {
    /// Stable code used in log events and boundary mappings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(MalformedReason::MissingText) => "missing_text",
            Self::MalformedRequest(MalformedReason::IdMismatch { .. }) => "id_mismatch",
            Self::MalformedRequest(MalformedReason::VersionOutOfRange(_)) => "version_out_of_range",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Gone(_) => "gone",
            Self::VersionRequired(_) => "version_required",
            Self::Conflict { .. } => "conflict",
            Self::Storage(_) => "storage",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl Display for NoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRequest(MalformedReason::MissingText) => write!(f, "text is missing"),
            Self::MalformedRequest(MalformedReason::IdMismatch { target, body }) => write!(
                f,
                "addressed id {target} and body id {body} should be the same"
            ),
            Self::MalformedRequest(MalformedReason::VersionOutOfRange(version)) => {
                write!(f, "claimed version {version} is out of range")
            }
            Self::Forbidden(id) => write!(f, "note {id} belongs to another owner"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Gone(id) => write!(f, "note no longer exists: {id}"),
            Self::VersionRequired(id) => write!(f, "no version specified for note {id}"),
            Self::Conflict {
                id,
                claimed,
                current,
            } => write!(
                f,
                "version conflict on note {id}: claimed {claimed}, current {current}"
            ),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{MalformedReason, NoteError};
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn only_storage_errors_are_unrecoverable() {
        let id = Uuid::new_v4();
        assert!(NoteError::Gone(id).is_recoverable());
        assert!(NoteError::MalformedRequest(MalformedReason::MissingText).is_recoverable());
        let storage = NoteError::from(RepoError::MissingRequiredTable("notes"));
        assert!(!storage.is_recoverable());
        assert_eq!(storage.code(), "storage");
    }

    #[test]
    fn conflict_message_names_both_versions() {
        let err = NoteError::Conflict {
            id: Uuid::nil(),
            claimed: 1,
            current: 2,
        };
        assert_eq!(err.code(), "conflict");
        assert!(err.to_string().contains("claimed 1, current 2"));
    }
}
