//! Per-owner real-time change fan-out.
//!
//! # Responsibility
//! - Keep one channel per owner identity with any number of live subscribers.
//! - Deliver created/updated/deleted events best-effort, at most once.
//!
//! # Invariants
//! - Events reach only subscribers of the event's owner.
//! - Publishing never blocks and never fails the mutation that caused it.
//! - Each subscriber sees events in publish order.

mod channel;
mod event;

pub use channel::{ChangeBroadcaster, Subscription};
pub use event::{NoteEvent, NoteEventKind};
