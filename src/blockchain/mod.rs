// src/blockchain/mod.rs
//! Plumbing shared by the on-ledger components: the block clock and the
//! append-only event log.

pub mod clock;
pub mod events;
