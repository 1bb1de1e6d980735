// src/models/credential.rs
//! Soulbound credential data model.
//!
//! A credential is an immutable issuance record plus a separately mutable
//! revocation flag. Validity is never stored on the record: it is derived at
//! read time from the record, the clock and the issuer's current state.

use ethers_core::types::Address;
use serde::{Deserialize, Serialize};

/// Sentinel `valid_until` value meaning "never expires".
pub const NEVER_EXPIRES: u64 = 0;

/// A non-transferable credential bound to one recipient.
///
/// # Immutability
/// Every field except `is_revoked`, `revoked_at` and `revocation_reason` is
/// fixed at issuance. `is_revoked` goes from `false` to `true` exactly once.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Sequential identifier, starting at 0
    pub id: u64,

    /// Example: "UniversityDegree"
    pub credential_type: String,

    /// Example: "BSc Computer Science"
    pub subject: String,

    /// Holder the credential is permanently bound to
    pub recipient: Address,

    pub recipient_name: String,

    /// Registry identity that minted the credential
    pub issuer: Address,

    pub issued_at: u64,

    /// Expiry in UNIX seconds, or [`NEVER_EXPIRES`]
    pub valid_until: u64,

    /// Opaque structured payload supplied by the issuer
    pub additional_data: serde_json::Value,

    /// Token metadata reference supplied at issuance (may point into the
    /// content-addressed store)
    pub presentation_ref: Option<String>,

    pub is_revoked: bool,

    pub revoked_at: Option<u64>,

    pub revocation_reason: Option<String>,
}

impl Credential {
    /// Whether the credential has passed its expiry at `now`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.valid_until != NEVER_EXPIRES && self.valid_until <= now
    }
}

/// Why a credential is or is not currently valid.
///
/// Revocation is reported before issuer state, and issuer state before
/// expiry, so a revoked credential always reads as `Revoked`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ValidityStatus {
    Valid,
    Revoked,
    IssuerInactive,
    Expired,
}

impl ValidityStatus {
    pub fn is_valid(self) -> bool {
        matches!(self, ValidityStatus::Valid)
    }
}

/// Outcome of `CredentialRegistry::verify`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialVerification {
    pub is_valid: bool,
    pub status: ValidityStatus,
    /// Issuer's registered name, or a placeholder if the lookup failed
    pub issuer_name: String,
    pub credential: Credential,
}
