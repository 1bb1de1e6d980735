// src/models/issuer.rs
//! Issuer record held by the authorization registry.

use ethers_core::types::Address;
use serde::{Deserialize, Serialize};

/// An identity authorized to mint credentials.
///
/// # Invariants
/// - `identity` is registered at most once and never changes
/// - `name` is claimed by exactly this identity and never changes
/// - `credentials_issued` only ever increments
///
/// Records are never deleted. Deactivation is expressed through `is_active`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    /// Account address of the issuer (primary key)
    pub identity: Address,

    /// Unique human-readable name (secondary key)
    /// Example: "Acme University"
    pub name: String,

    pub description: String,

    pub website: String,

    pub logo_url: String,

    /// Whether the issuer may currently mint, and whether its credentials
    /// currently count as valid
    pub is_active: bool,

    /// Ledger timestamp of registration (UNIX seconds)
    pub registered_at: u64,

    /// Number of credentials minted by this issuer
    pub credentials_issued: u64,
}

/// Mutable profile fields of an issuer, as accepted by `register` and `update`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerProfile {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub logo_url: String,
}
