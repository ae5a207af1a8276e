//! Core of the KeepNote service.
//!
//! Owner-scoped note storage with optimistic concurrency, conditional
//! collection reads and per-owner change fan-out. Transport, credential
//! handling and process bootstrap live outside this crate.

pub mod broadcast;
pub mod cache;
pub mod clock;
pub mod db;
pub mod error;
pub mod guard;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use broadcast::{ChangeBroadcaster, NoteEvent, NoteEventKind, Subscription};
pub use cache::freshness::ConditionalCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{MalformedReason, NoteError, NoteResult};
pub use guard::access::{Access, AccessGuard};
pub use guard::version::{UpsertOutcome, UpsertRequest, VersionGuard};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{
    NewNote, Note, NoteBody, NoteFields, NoteId, NoteMeta, NoteValidationError, Timestamp,
    DEFAULT_STATUS,
};
pub use model::owner::{OwnerId, OwnerIdError};
pub use repo::note_store::{NoteFilter, NoteStore, SqliteNoteStore};
pub use repo::owner_repo::{OwnerRecord, OwnerRepository, SqliteOwnerRepository};
pub use repo::{RepoError, RepoResult};
pub use service::note_service::{ListOutcome, NoteService};
pub use service::seed::{ensure_default_data, SeedReport};

/// Minimal health-check API for smoke probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
