// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Issuer-side workflow on top of the ledger: mints credentials as the
//! signer's identity, revokes them, and produces the presentation bundle a
//! holder shares with verifiers.
//!
//! Producing a presentation takes three steps:
//! 1. Snapshot the credential into extended metadata
//! 2. Pin the metadata to the content-addressed store
//! 3. Sign the compact bundle together with the metadata digest

use crate::blockchain::clock::Clock;
use crate::codec::presentation::{encode, encode_extended, signing_payload};
use crate::contracts::credential_registry::{CredentialRegistry, IssueRequest};
use crate::errors::{IssuanceError, LedgerError};
use crate::models::presentation::{
    CompactPresentation, CredentialSnapshot, ExtendedPresentation, VERIFICATION_METHOD,
};
use crate::storage::content_store::ContentStore;
use crate::utils::crypto::encode_signature;
use crate::wallet::key_management::Signer;
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Holder-chosen context recorded in the extended metadata.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresentationOptions {
    /// Why the credential is being presented
    #[serde(default)]
    pub purpose: String,

    /// Verifier-supplied nonce, if any
    #[serde(default)]
    pub challenge: Option<String>,

    /// Verifier domain the presentation is meant for
    #[serde(default)]
    pub domain: Option<String>,
}

/// Output of [`CredentialIssuer::present`].
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedPresentation {
    pub compact: CompactPresentation,
    /// Encoded compact bundle, ready for a QR code
    pub payload: Vec<u8>,
    /// Exact metadata bytes pinned under `compact.content_ref`
    pub metadata: Vec<u8>,
}

/// Service acting on the ledger as the signer's identity.
#[derive(Clone)]
pub struct CredentialIssuer {
    ledger: Arc<CredentialRegistry>,
    store: Arc<dyn ContentStore>,
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Clock>,
}

impl CredentialIssuer {
    pub fn new(
        ledger: Arc<CredentialRegistry>,
        store: Arc<dyn ContentStore>,
        signer: Arc<dyn Signer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        CredentialIssuer {
            ledger,
            store,
            signer,
            clock,
        }
    }

    /// Identity this service issues and signs as.
    pub fn identity(&self) -> Address {
        self.signer.address()
    }

    /// Issues a credential and immediately builds its presentation bundle.
    ///
    /// # Returns
    /// The new credential id and its presentation.
    ///
    /// # Errors
    /// - `Ledger` if the ledger rejects the issuance; nothing was minted
    /// - `PresentationFailed { id, .. }` if the credential was minted but
    ///   pinning or signing its presentation failed. Issuing again would
    ///   mint a second credential; call [`Self::present`] with `id` instead.
    pub async fn issue_credential(
        &self,
        request: IssueRequest,
        options: PresentationOptions,
    ) -> Result<(u64, IssuedPresentation), IssuanceError> {
        let id = self.ledger.issue(self.identity(), request)?;
        match self.present(id, options).await {
            Ok(presentation) => Ok((id, presentation)),
            Err(source) => {
                log::warn!("credential {} issued without a presentation: {}", id, source);
                Err(IssuanceError::PresentationFailed {
                    id,
                    source: Box::new(source),
                })
            }
        }
    }

    /// Revokes a credential previously issued by this identity.
    pub fn revoke_credential(&self, id: u64, reason: &str) -> Result<(), LedgerError> {
        self.ledger.revoke(self.identity(), id, reason)
    }

    /// Builds a signed presentation bundle for an existing credential.
    ///
    /// # Errors
    /// - `Ledger(NotFound)` if the credential does not exist
    /// - `Ledger(Unauthorized)` if this identity did not issue it, since
    ///   verifiers check the signature against the credential's issuer
    /// - `Storage` if the metadata cannot be pinned
    /// - `Signer` if signing fails
    pub async fn present(
        &self,
        id: u64,
        options: PresentationOptions,
    ) -> Result<IssuedPresentation, IssuanceError> {
        let verification = self.ledger.verify(id)?;
        let credential = verification.credential;
        if credential.issuer != self.identity() {
            let err = LedgerError::unauthorized(self.identity(), "sign presentations for this credential");
            return Err(err.into());
        }

        let now = self.clock.now();
        let metadata = ExtendedPresentation {
            credential_snapshot: CredentialSnapshot::capture(&credential, verification.issuer_name),
            presentation_id: format!("urn:uuid:{}", Uuid::new_v4()),
            created_at: now,
            purpose: options.purpose,
            verification_method: VERIFICATION_METHOD.to_string(),
            challenge: options.challenge,
            domain: options.domain,
        };
        let metadata_bytes = encode_extended(&metadata)?;
        let content_ref = self.store.put(metadata_bytes.clone()).await?;

        let mut compact = CompactPresentation {
            content_ref,
            signature: String::new(),
            issuer_identity: credential.issuer,
            credential_id: id,
            holder_identity: credential.recipient,
            timestamp: Some(now),
        };
        let signature = self.signer.sign(&signing_payload(&compact, &metadata_bytes))?;
        compact.signature = encode_signature(&signature);

        log::info!("built presentation for credential {} at {}", id, compact.content_ref);
        Ok(IssuedPresentation {
            payload: encode(&compact),
            compact,
            metadata: metadata_bytes,
        })
    }
}
