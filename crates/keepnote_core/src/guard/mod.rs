//! Policy checks applied before a note mutation reaches the store.
//!
//! # Responsibility
//! - `access`: single-owner read/write/delete authorization.
//! - `version`: optimistic-concurrency rules for create and update.
//!
//! # Invariants
//! - "Forbidden" is always distinguishable from "absent".
//! - An accepted update lands through the store's conditional write, never
//!   through a separate read-then-write.

pub mod access;
pub mod version;
