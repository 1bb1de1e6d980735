// src/blockchain/events.rs
//! Append-only audit log of every state change in the registry and ledger.
//!
//! Events are never mutated or removed once appended. Each event carries a
//! sequence number (its position in the log) and the ledger timestamp at
//! which the change was applied.

use ethers_core::types::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A state change recorded by the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    #[serde(rename_all = "camelCase")]
    IssuerRegistered { identity: Address, name: String },
    #[serde(rename_all = "camelCase")]
    IssuerUpdated { identity: Address },
    #[serde(rename_all = "camelCase")]
    IssuerDeactivated { identity: Address },
    #[serde(rename_all = "camelCase")]
    IssuerActivated { identity: Address },
    #[serde(rename_all = "camelCase")]
    IssuedCountIncremented { identity: Address, count: u64 },
    #[serde(rename_all = "camelCase")]
    CredentialIssued {
        id: u64,
        recipient: Address,
        issuer: Address,
        credential_type: String,
    },
    #[serde(rename_all = "camelCase")]
    CredentialRevoked { id: u64, issuer: Address, reason: String },
}

/// An entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub sequence: u64,
    pub timestamp: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Thread-safe append-only event log shared by the registry and the ledger.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: RwLock<Vec<LedgerEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns its sequence number.
    pub fn append(&self, timestamp: u64, kind: EventKind) -> u64 {
        let mut entries = self.entries.write();
        let sequence = entries.len() as u64;
        log::debug!("event #{}: {:?}", sequence, kind);
        entries.push(LedgerEvent {
            sequence,
            timestamp,
            kind,
        });
        sequence
    }

    /// Returns a copy of the full log.
    pub fn all(&self) -> Vec<LedgerEvent> {
        self.entries.read().clone()
    }

    /// Returns every event with a sequence number at or after `sequence`.
    pub fn since(&self, sequence: u64) -> Vec<LedgerEvent> {
        let entries = self.entries.read();
        let start = usize::try_from(sequence).map_or(entries.len(), |s| s.min(entries.len()));
        entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
