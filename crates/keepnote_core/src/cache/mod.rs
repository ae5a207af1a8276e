//! Freshness tracking for conditional collection reads.

pub mod freshness;
