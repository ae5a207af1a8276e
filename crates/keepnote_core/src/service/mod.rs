//! Use-case services.
//!
//! # Responsibility
//! - Compose store, guards, freshness cache and broadcaster into the public
//!   note operations.
//! - Seed default owners and notes for fresh installs.

pub mod note_service;
pub mod seed;
