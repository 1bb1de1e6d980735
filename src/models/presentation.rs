// src/models/presentation.rs
//! Presentation bundle data model.
//!
//! A presentation has two halves:
//! - the **compact** form, small enough for a QR code, which points at the
//!   credential and at a content-addressed metadata blob and carries the
//!   issuer's signature claim
//! - the **extended** form stored in the content-addressed store under
//!   `content_ref`, holding a snapshot of the credential
//!
//! Neither half is authoritative. Validity is re-derived at verification time.

use crate::models::credential::Credential;
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};

/// Compact, shareable proof bundle embedded in a QR payload.
///
/// Wire format (JSON, camelCase):
/// ```text
/// { "contentRef": string, "signature": string, "issuerIdentity": string,
///   "credentialId": integer, "holderIdentity": string, "timestamp"?: integer }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompactPresentation {
    /// Content hash of the extended metadata blob
    pub content_ref: String,

    /// `0x`-prefixed hex encoding of the issuer's recoverable signature
    pub signature: String,

    pub issuer_identity: Address,

    pub credential_id: u64,

    pub holder_identity: Address,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<u64>,
}

/// Immutable issuance fields of a credential, captured when the presentation
/// was created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSnapshot {
    pub id: u64,
    pub credential_type: String,
    pub subject: String,
    pub recipient: Address,
    pub recipient_name: String,
    pub issuer: Address,
    pub issuer_name: String,
    pub issued_at: u64,
    pub valid_until: u64,
    #[serde(default)]
    pub additional_data: serde_json::Value,
}

impl CredentialSnapshot {
    pub fn capture(credential: &Credential, issuer_name: impl Into<String>) -> Self {
        CredentialSnapshot {
            id: credential.id,
            credential_type: credential.credential_type.clone(),
            subject: credential.subject.clone(),
            recipient: credential.recipient,
            recipient_name: credential.recipient_name.clone(),
            issuer: credential.issuer,
            issuer_name: issuer_name.into(),
            issued_at: credential.issued_at,
            valid_until: credential.valid_until,
            additional_data: credential.additional_data.clone(),
        }
    }
}

/// Full presentation metadata stored at `content_ref`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedPresentation {
    pub credential_snapshot: CredentialSnapshot,

    /// Example: "urn:uuid:123e4567-e89b-12d3-a456-426614174000"
    pub presentation_id: String,

    pub created_at: u64,

    /// Example: "employment-screening"
    pub purpose: String,

    /// Example: "EcdsaSecp256k1RecoverySignature"
    pub verification_method: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub challenge: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub domain: Option<String>,
}

/// Verification method name recorded in extended metadata produced by this crate.
pub const VERIFICATION_METHOD: &str = "EcdsaSecp256k1RecoverySignature";
