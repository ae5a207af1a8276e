//! Domain model for owner-scoped notes.
//!
//! # Responsibility
//! - Define the canonical note record and the inputs that mutate it.
//! - Define the owner identity used for access checks and fan-out.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId` assigned on insert.
//! - `owner` is set once at creation and never rewritten.
//! - Deletion is a hard delete; no tombstones are kept.

pub mod note;
pub mod owner;
