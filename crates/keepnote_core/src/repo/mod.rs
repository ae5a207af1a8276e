//! Persistence primitives over the SQLite document store.
//!
//! # Responsibility
//! - Typed CRUD over `notes` and `owners` with no business rules.
//! - Isolate SQL details from guards and service orchestration.
//!
//! # Invariants
//! - Writes validate record-level invariants before touching SQL.
//! - Reads reject malformed persisted rows instead of masking them.
//! - Ownership and version policy live in `guard`, never here.

mod error;
pub mod note_store;
pub mod owner_repo;
mod schema;

pub use error::{RepoError, RepoResult};
