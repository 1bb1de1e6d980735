// src/services/verifier.rs
//! Verification Engine: the trust decision for a presented credential.
//!
//! Two modes:
//! - **online** ([`Verifier::verify_online`]): the ledger decides validity;
//!   extended metadata is fetched alongside and only used to surface
//!   discrepancies
//! - **offline** ([`Verifier::verify_offline`]): no ledger access; only
//!   structural and signature checks against metadata the caller supplies
//!
//! Results carry a [`ConfirmationLevel`] so a structurally sound offline
//! result can never be mistaken for a chain-confirmed one. The engine holds
//! no state of its own and never writes.

use crate::blockchain::clock::Clock;
use crate::codec::presentation::{decode, decode_extended, signing_payload};
use crate::contracts::credential_registry::CredentialRegistry;
use crate::errors::{LedgerError, PresentationError, StorageError};
use crate::models::credential::{Credential, ValidityStatus, NEVER_EXPIRES};
use crate::models::presentation::{CompactPresentation, CredentialSnapshot, ExtendedPresentation};
use crate::storage::content_store::ContentStore;
use crate::utils::crypto::{decode_signature, format_address, recover_address};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

/// How strongly a result is backed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationLevel {
    /// Validity was read from the authoritative ledger
    ChainConfirmed,
    /// Only local structure and signature were checked; the ledger was never consulted
    StructuralOnly,
}

/// Why a presentation was judged invalid.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    /// The credential id does not exist on the ledger
    NotFound,
    Revoked,
    IssuerInactive,
    Expired,
    /// The ledger could not be queried
    LedgerUnavailable(String),
    /// Extended metadata is not a valid presentation document
    MetadataUnreadable(String),
    /// The compact bundle and the extended metadata describe different credentials
    MetadataMismatch,
    /// The signature is not well formed
    InvalidSignature(String),
    /// The signature does not recover to the claimed issuer
    SignatureMismatch,
}

/// Availability of the extended metadata during verification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state", content = "reason")]
pub enum MetadataStatus {
    Available,
    /// Fetch failed or timed out
    Unavailable(String),
    /// Bytes were retrieved but could not be parsed
    Unreadable(String),
}

/// A field on which two sources disagree.
///
/// Online, `expected` is the ledger's value. Offline, `expected` is the
/// compact bundle's claim and `found` is the metadata snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub field: String,
    pub expected: String,
    pub found: String,
}

/// Outcome of a verification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub confirmation: ConfirmationLevel,
    pub is_valid: bool,
    pub failure: Option<FailureReason>,
    /// Authoritative record (online only)
    pub credential: Option<Credential>,
    pub issuer_name: Option<String>,
    pub extended_metadata: Option<ExtendedPresentation>,
    pub metadata: MetadataStatus,
    pub discrepancies: Vec<Discrepancy>,
    /// Clock reading at verification time
    pub checked_at: u64,
}

impl VerificationResult {
    fn new(confirmation: ConfirmationLevel, checked_at: u64) -> Self {
        VerificationResult {
            confirmation,
            is_valid: false,
            failure: None,
            credential: None,
            issuer_name: None,
            extended_metadata: None,
            metadata: MetadataStatus::Unavailable("not fetched".into()),
            discrepancies: Vec::new(),
            checked_at,
        }
    }

    /// True only for a valid result backed by the ledger.
    pub fn is_chain_confirmed_valid(&self) -> bool {
        self.is_valid && self.confirmation == ConfirmationLevel::ChainConfirmed
    }

    fn fail(&mut self, reason: FailureReason) {
        self.is_valid = false;
        // Keep the first failure; later checks only add detail
        if self.failure.is_none() {
            self.failure = Some(reason);
        }
    }
}

/// Default timeout for content-store fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Presentation verifier over the ledger and a content store.
#[derive(Clone)]
pub struct Verifier {
    ledger: Arc<CredentialRegistry>,
    store: Arc<dyn ContentStore>,
    clock: Arc<dyn Clock>,
    fetch_timeout: Duration,
}

impl Verifier {
    pub fn new(
        ledger: Arc<CredentialRegistry>,
        store: Arc<dyn ContentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Verifier {
            ledger,
            store,
            clock,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Verifies a presentation against the ledger.
    ///
    /// The metadata fetch and the ledger query run concurrently. A failed or
    /// timed-out fetch only marks the metadata unavailable. Validity always
    /// comes from the ledger; where the bundle or its metadata disagree with
    /// the ledger record the disagreement is listed in `discrepancies`.
    ///
    /// # Errors
    /// Only decode failures of `payload` are errors. An unknown credential is
    /// an invalid result with `FailureReason::NotFound`.
    pub async fn verify_online(&self, payload: &[u8]) -> Result<VerificationResult, PresentationError> {
        let compact = decode(payload)?;
        let mut result = VerificationResult::new(ConfirmationLevel::ChainConfirmed, self.clock.now());

        let (fetched, ledger) = tokio::join!(self.fetch_metadata(&compact.content_ref), async {
            self.ledger.verify(compact.credential_id)
        });

        let metadata_bytes = match fetched {
            Ok(bytes) => match decode_extended(&bytes) {
                Ok(metadata) => {
                    result.metadata = MetadataStatus::Available;
                    result.extended_metadata = Some(metadata);
                    Some(bytes)
                }
                Err(e) => {
                    log::warn!("metadata at {} is unreadable: {}", compact.content_ref, e);
                    result.metadata = MetadataStatus::Unreadable(e.to_string());
                    None
                }
            },
            Err(e) => {
                log::warn!("metadata at {} unavailable: {}", compact.content_ref, e);
                result.metadata = MetadataStatus::Unavailable(e.to_string());
                None
            }
        };

        match ledger {
            Ok(verification) => {
                result.is_valid = verification.is_valid;
                result.failure = match verification.status {
                    ValidityStatus::Valid => None,
                    ValidityStatus::Revoked => Some(FailureReason::Revoked),
                    ValidityStatus::IssuerInactive => Some(FailureReason::IssuerInactive),
                    ValidityStatus::Expired => Some(FailureReason::Expired),
                };
                result.issuer_name = Some(verification.issuer_name);
                result.discrepancies =
                    ledger_discrepancies(&compact, &verification.credential, result.extended_metadata.as_ref());
                result.credential = Some(verification.credential);
            }
            Err(LedgerError::NotFound(_)) => result.fail(FailureReason::NotFound),
            Err(e) => result.fail(FailureReason::LedgerUnavailable(e.to_string())),
        }

        if let Some(bytes) = metadata_bytes {
            if let Err(reason) = check_signature(&compact, &bytes) {
                result.discrepancies.push(Discrepancy {
                    field: "signature".into(),
                    expected: format!("signed by {}", format_address(&compact.issuer_identity)),
                    found: format!("{:?}", reason),
                });
            }
        }

        log::debug!(
            "online verification of credential {}: valid={} failure={:?}",
            compact.credential_id,
            result.is_valid,
            result.failure
        );
        Ok(result)
    }

    /// Verifies a presentation without the ledger.
    ///
    /// Checks that the payload decodes, that the extended metadata parses
    /// and describes the same credential, issuer and holder as the bundle,
    /// that the signature recovers to the claimed issuer, and that the
    /// snapshot has not expired by the local clock.
    ///
    /// The result is always [`ConfirmationLevel::StructuralOnly`]: revocation
    /// and issuer deactivation are invisible offline.
    pub fn verify_offline(
        &self,
        payload: &[u8],
        extended_metadata: &[u8],
    ) -> Result<VerificationResult, PresentationError> {
        let compact = decode(payload)?;
        let mut result = VerificationResult::new(ConfirmationLevel::StructuralOnly, self.clock.now());
        result.is_valid = true;

        let metadata = match decode_extended(extended_metadata) {
            Ok(metadata) => metadata,
            Err(e) => {
                result.metadata = MetadataStatus::Unreadable(e.to_string());
                result.fail(FailureReason::MetadataUnreadable(e.to_string()));
                return Ok(result);
            }
        };
        result.metadata = MetadataStatus::Available;

        let snapshot = &metadata.credential_snapshot;
        result.discrepancies = snapshot_discrepancies(&compact, snapshot);
        if !result.discrepancies.is_empty() {
            result.fail(FailureReason::MetadataMismatch);
        }

        if let Err(reason) = check_signature(&compact, extended_metadata) {
            result.fail(reason);
        }

        if snapshot.valid_until != NEVER_EXPIRES && snapshot.valid_until <= result.checked_at {
            result.fail(FailureReason::Expired);
        }

        result.issuer_name = Some(snapshot.issuer_name.clone());
        result.extended_metadata = Some(metadata);
        Ok(result)
    }

    async fn fetch_metadata(&self, content_ref: &str) -> Result<Vec<u8>, StorageError> {
        match tokio::time::timeout(self.fetch_timeout, self.store.get(content_ref)).await {
            Ok(fetched) => fetched,
            Err(_) => Err(StorageError::Timeout),
        }
    }
}

/// Checks that the bundle's signature recovers to its claimed issuer.
fn check_signature(compact: &CompactPresentation, metadata: &[u8]) -> Result<(), FailureReason> {
    let signature = decode_signature(&compact.signature)
        .map_err(|e| FailureReason::InvalidSignature(e.to_string()))?;
    let signer = recover_address(&signing_payload(compact, metadata), &signature)
        .map_err(|e| FailureReason::InvalidSignature(e.to_string()))?;
    if signer == compact.issuer_identity {
        Ok(())
    } else {
        Err(FailureReason::SignatureMismatch)
    }
}

fn compare<T: PartialEq + Display>(out: &mut Vec<Discrepancy>, field: &str, expected: T, found: T) {
    if expected != found {
        out.push(Discrepancy {
            field: field.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
}

/// Fields of the bundle that must agree with its own metadata snapshot.
fn snapshot_discrepancies(compact: &CompactPresentation, snapshot: &CredentialSnapshot) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    compare(&mut out, "credentialId", compact.credential_id, snapshot.id);
    compare(
        &mut out,
        "issuerIdentity",
        format_address(&compact.issuer_identity),
        format_address(&snapshot.issuer),
    );
    compare(
        &mut out,
        "holderIdentity",
        format_address(&compact.holder_identity),
        format_address(&snapshot.recipient),
    );
    out
}

/// Fields of the bundle and its metadata that disagree with the ledger record.
fn ledger_discrepancies(
    compact: &CompactPresentation,
    record: &Credential,
    metadata: Option<&ExtendedPresentation>,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    compare(
        &mut out,
        "issuerIdentity",
        format_address(&record.issuer),
        format_address(&compact.issuer_identity),
    );
    compare(
        &mut out,
        "holderIdentity",
        format_address(&record.recipient),
        format_address(&compact.holder_identity),
    );

    if let Some(snapshot) = metadata.map(|m| &m.credential_snapshot) {
        let prefix = "credentialSnapshot";
        compare(&mut out, &format!("{}.id", prefix), record.id, snapshot.id);
        compare(
            &mut out,
            &format!("{}.credentialType", prefix),
            record.credential_type.as_str(),
            snapshot.credential_type.as_str(),
        );
        compare(&mut out, &format!("{}.subject", prefix), record.subject.as_str(), snapshot.subject.as_str());
        compare(
            &mut out,
            &format!("{}.recipient", prefix),
            format_address(&record.recipient),
            format_address(&snapshot.recipient),
        );
        compare(
            &mut out,
            &format!("{}.recipientName", prefix),
            record.recipient_name.as_str(),
            snapshot.recipient_name.as_str(),
        );
        compare(
            &mut out,
            &format!("{}.issuer", prefix),
            format_address(&record.issuer),
            format_address(&snapshot.issuer),
        );
        compare(&mut out, &format!("{}.issuedAt", prefix), record.issued_at, snapshot.issued_at);
        compare(&mut out, &format!("{}.validUntil", prefix), record.valid_until, snapshot.valid_until);
        compare(
            &mut out,
            &format!("{}.additionalData", prefix),
            &record.additional_data,
            &snapshot.additional_data,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::clock::ManualClock;
    use crate::codec::presentation::{encode, encode_extended};
    use crate::contracts::credential_registry::IssueRequest;
    use crate::contracts::Deployment;
    use crate::models::issuer::IssuerProfile;
    use crate::services::credential_issuer::{CredentialIssuer, IssuedPresentation, PresentationOptions};
    use crate::storage::content_store::MemoryContentStore;
    use crate::utils::crypto::encode_signature;
    use crate::wallet::key_management::{KeyManager, Signer};
    use async_trait::async_trait;
    use ethers_core::types::Address;

    const ADMIN: Address = Address::repeat_byte(0xad);
    const HOLDER: Address = Address::repeat_byte(0x40);
    const START: u64 = 1_700_000_000;
    const DAY: u64 = 86_400;

    struct Fixture {
        clock: Arc<ManualClock>,
        deployment: Deployment,
        keys: Arc<KeyManager>,
        store: Arc<MemoryContentStore>,
        issuer: CredentialIssuer,
        verifier: Verifier,
    }

    fn setup() -> Fixture {
        let clock = Arc::new(ManualClock::new(START));
        let deployment = Deployment::new(ADMIN, clock.clone());
        let keys = Arc::new(KeyManager::new());
        deployment
            .registry
            .register(ADMIN, keys.address(), "Acme U", IssuerProfile::default())
            .unwrap();
        let store = Arc::new(MemoryContentStore::new());
        let issuer = CredentialIssuer::new(
            deployment.ledger.clone(),
            store.clone(),
            keys.clone(),
            clock.clone(),
        );
        let verifier = Verifier::new(deployment.ledger.clone(), store.clone(), clock.clone());
        Fixture {
            clock,
            deployment,
            keys,
            store,
            issuer,
            verifier,
        }
    }

    fn request(valid_until: u64) -> IssueRequest {
        IssueRequest {
            recipient: HOLDER,
            credential_type: "UniversityDegree".into(),
            subject: "BSc Computer Science".into(),
            recipient_name: "Hana Holder".into(),
            valid_until,
            additional_data: serde_json::json!({ "honours": true }),
            presentation_ref: None,
        }
    }

    async fn issue(f: &Fixture, valid_until: u64) -> IssuedPresentation {
        f.issuer
            .issue_credential(request(valid_until), PresentationOptions::default())
            .await
            .unwrap()
            .1
    }

    /// Builds and signs a bundle for an arbitrary snapshot, bypassing the ledger.
    fn forge(keys: &KeyManager, snapshot: CredentialSnapshot, compact_id: u64) -> (Vec<u8>, Vec<u8>) {
        let metadata = ExtendedPresentation {
            credential_snapshot: snapshot,
            presentation_id: "urn:uuid:test".into(),
            created_at: START,
            purpose: "test".into(),
            verification_method: "EcdsaSecp256k1RecoverySignature".into(),
            challenge: None,
            domain: None,
        };
        let metadata_bytes = encode_extended(&metadata).unwrap();
        let mut compact = CompactPresentation {
            content_ref: MemoryContentStore::content_ref(&metadata_bytes),
            signature: String::new(),
            issuer_identity: keys.address(),
            credential_id: compact_id,
            holder_identity: HOLDER,
            timestamp: Some(START),
        };
        compact.signature = encode_signature(&keys.sign(&signing_payload(&compact, &metadata_bytes)).unwrap());
        (encode(&compact), metadata_bytes)
    }

    fn snapshot(keys: &KeyManager, id: u64) -> CredentialSnapshot {
        CredentialSnapshot {
            id,
            credential_type: "UniversityDegree".into(),
            subject: "BSc Computer Science".into(),
            recipient: HOLDER,
            recipient_name: "Hana Holder".into(),
            issuer: keys.address(),
            issuer_name: "Acme U".into(),
            issued_at: START,
            valid_until: 0,
            additional_data: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_online_valid_presentation() {
        let f = setup();
        let presentation = issue(&f, 0).await;

        let result = f.verifier.verify_online(&presentation.payload).await.unwrap();
        assert_eq!(result.confirmation, ConfirmationLevel::ChainConfirmed);
        assert!(result.is_valid);
        assert!(result.is_chain_confirmed_valid());
        assert_eq!(result.failure, None);
        assert_eq!(result.issuer_name.as_deref(), Some("Acme U"));
        assert_eq!(result.metadata, MetadataStatus::Available);
        assert_eq!(result.credential.unwrap().id, 0);
        assert_eq!(result.extended_metadata.unwrap().credential_snapshot.id, 0);
        assert!(result.discrepancies.is_empty(), "{:?}", result.discrepancies);
    }

    #[tokio::test]
    async fn test_online_reflects_revocation_and_deactivation() {
        let f = setup();
        let presentation = issue(&f, 0).await;

        f.deployment.registry.deactivate(ADMIN, f.keys.address()).unwrap();
        let result = f.verifier.verify_online(&presentation.payload).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.failure, Some(FailureReason::IssuerInactive));
        assert!(!result.credential.unwrap().is_revoked);

        f.deployment.registry.activate(ADMIN, f.keys.address()).unwrap();
        f.issuer.revoke_credential(0, "degree rescinded").unwrap();
        let result = f.verifier.verify_online(&presentation.payload).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.failure, Some(FailureReason::Revoked));
    }

    #[tokio::test]
    async fn test_online_expiry() {
        let f = setup();
        let presentation = issue(&f, START + DAY).await;
        assert!(f.verifier.verify_online(&presentation.payload).await.unwrap().is_valid);

        f.clock.advance(DAY + 1);
        let result = f.verifier.verify_online(&presentation.payload).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.failure, Some(FailureReason::Expired));
    }

    #[tokio::test]
    async fn test_online_unknown_credential_is_not_found() {
        let f = setup();
        let (payload, metadata) = forge(&f.keys, snapshot(&f.keys, 9999), 9999);
        f.store.put(metadata).await.unwrap();

        let result = f.verifier.verify_online(&payload).await.unwrap();
        assert_eq!(result.confirmation, ConfirmationLevel::ChainConfirmed);
        assert!(!result.is_valid);
        assert_eq!(result.failure, Some(FailureReason::NotFound));
        assert!(result.credential.is_none());
    }

    #[tokio::test]
    async fn test_offline_never_issued_is_structural_only() {
        let f = setup();
        let (payload, metadata) = forge(&f.keys, snapshot(&f.keys, 9999), 9999);

        let offline = f.verifier.verify_offline(&payload, &metadata).unwrap();
        assert_eq!(offline.confirmation, ConfirmationLevel::StructuralOnly);
        assert!(offline.is_valid);
        assert!(!offline.is_chain_confirmed_valid());
        assert!(offline.credential.is_none());

        f.store.put(metadata).await.unwrap();
        let online = f.verifier.verify_online(&payload).await.unwrap();
        assert!(!online.is_valid);
        assert_ne!(offline.confirmation, online.confirmation);
    }

    #[tokio::test]
    async fn test_online_degrades_when_metadata_missing() {
        let f = setup();
        let presentation = issue(&f, 0).await;
        let mut compact = presentation.compact.clone();
        compact.content_ref = "0xmissing".into();

        let result = f.verifier.verify_online(&encode(&compact)).await.unwrap();
        assert!(result.is_valid);
        assert!(matches!(result.metadata, MetadataStatus::Unavailable(_)));
        assert!(result.extended_metadata.is_none());
        assert_eq!(result.issuer_name.as_deref(), Some("Acme U"));
    }

    struct SlowStore;

    #[async_trait]
    impl ContentStore for SlowStore {
        async fn put(&self, _data: Vec<u8>) -> Result<String, StorageError> {
            Err(StorageError::Backend("read only".into()))
        }
        async fn get(&self, _content_ref: &str) -> Result<Vec<u8>, StorageError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(StorageError::NotFound("never".into()))
        }
    }

    #[tokio::test]
    async fn test_online_fetch_timeout_does_not_abort() {
        let f = setup();
        let presentation = issue(&f, 0).await;
        let verifier = Verifier::new(f.deployment.ledger.clone(), Arc::new(SlowStore), f.clock.clone())
            .with_fetch_timeout(Duration::from_millis(20));

        let result = verifier.verify_online(&presentation.payload).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(
            result.metadata,
            MetadataStatus::Unavailable(StorageError::Timeout.to_string())
        );
    }

    #[tokio::test]
    async fn test_online_ledger_wins_and_reports_discrepancy() {
        let f = setup();
        issue(&f, 0).await;
        // Metadata claiming a different credential type, correctly signed
        let mut claimed = snapshot(&f.keys, 0);
        claimed.credential_type = "DoctoralDegree".into();
        let (payload, metadata) = forge(&f.keys, claimed, 0);
        f.store.put(metadata).await.unwrap();

        let result = f.verifier.verify_online(&payload).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.credential.unwrap().credential_type, "UniversityDegree");
        assert!(result.discrepancies.contains(&Discrepancy {
            field: "credentialSnapshot.credentialType".into(),
            expected: "UniversityDegree".into(),
            found: "DoctoralDegree".into(),
        }));
    }

    #[tokio::test]
    async fn test_online_surfaces_forged_signature() {
        let f = setup();
        let presentation = issue(&f, 0).await;
        let mut compact = presentation.compact.clone();
        let forger = KeyManager::new();
        compact.signature = encode_signature(&forger.sign(b"whatever").unwrap());

        let result = f.verifier.verify_online(&encode(&compact)).await.unwrap();
        // Ledger still decides validity
        assert!(result.is_valid);
        assert!(result.discrepancies.iter().any(|d| d.field == "signature"));
    }

    #[tokio::test]
    async fn test_decode_errors_propagate() {
        let f = setup();
        assert!(matches!(
            f.verifier.verify_online(b"").await,
            Err(PresentationError::MalformedPayload(_))
        ));
        assert!(matches!(
            f.verifier.verify_online(br#"{"contentRef":"x"}"#).await,
            Err(PresentationError::SchemaViolation { .. })
        ));
        assert!(matches!(
            f.verifier.verify_offline(b"{", b"{}"),
            Err(PresentationError::MalformedPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_offline_valid_presentation() {
        let f = setup();
        let presentation = issue(&f, 0).await;

        let result = f
            .verifier
            .verify_offline(&presentation.payload, &presentation.metadata)
            .unwrap();
        assert!(result.is_valid);
        assert_eq!(result.confirmation, ConfirmationLevel::StructuralOnly);
        assert_eq!(result.issuer_name.as_deref(), Some("Acme U"));
        assert_eq!(result.metadata, MetadataStatus::Available);
    }

    #[tokio::test]
    async fn test_offline_cannot_see_revocation() {
        let f = setup();
        let presentation = issue(&f, 0).await;
        f.issuer.revoke_credential(0, "rescinded").unwrap();

        let offline = f
            .verifier
            .verify_offline(&presentation.payload, &presentation.metadata)
            .unwrap();
        let online = f.verifier.verify_online(&presentation.payload).await.unwrap();
        assert!(offline.is_valid && !offline.is_chain_confirmed_valid());
        assert!(!online.is_valid);
    }

    #[tokio::test]
    async fn test_offline_detects_tampered_metadata() {
        let f = setup();
        let presentation = issue(&f, 0).await;
        let mut metadata = decode_extended(&presentation.metadata).unwrap();
        metadata.credential_snapshot.subject = "PhD Astrophysics".into();
        let tampered = encode_extended(&metadata).unwrap();

        let result = f.verifier.verify_offline(&presentation.payload, &tampered).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.failure, Some(FailureReason::SignatureMismatch));
    }

    #[tokio::test]
    async fn test_offline_detects_wrong_issuer_claim() {
        let f = setup();
        let presentation = issue(&f, 0).await;
        let mut compact = presentation.compact.clone();
        compact.issuer_identity = Address::repeat_byte(0x77);

        let result = f.verifier.verify_offline(&encode(&compact), &presentation.metadata).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.failure, Some(FailureReason::MetadataMismatch));
        assert_eq!(result.discrepancies[0].field, "issuerIdentity");
    }

    #[test]
    fn test_offline_detects_credential_id_mismatch() {
        let f = setup();
        let (payload, metadata) = forge(&f.keys, snapshot(&f.keys, 3), 4);

        let result = f.verifier.verify_offline(&payload, &metadata).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.failure, Some(FailureReason::MetadataMismatch));
        assert_eq!(
            result.discrepancies,
            vec![Discrepancy {
                field: "credentialId".into(),
                expected: "4".into(),
                found: "3".into(),
            }]
        );
    }

    #[test]
    fn test_offline_unreadable_metadata() {
        let f = setup();
        let (payload, _) = forge(&f.keys, snapshot(&f.keys, 0), 0);

        let result = f.verifier.verify_offline(&payload, b"\x00garbage").unwrap();
        assert!(!result.is_valid);
        assert!(matches!(result.failure, Some(FailureReason::MetadataUnreadable(_))));
        assert!(matches!(result.metadata, MetadataStatus::Unreadable(_)));
    }

    #[test]
    fn test_offline_invalid_signature_encoding() {
        let f = setup();
        let (payload, metadata) = forge(&f.keys, snapshot(&f.keys, 0), 0);
        let mut compact = decode(&payload).unwrap();
        compact.signature = "0xnothex".into();

        let result = f.verifier.verify_offline(&encode(&compact), &metadata).unwrap();
        assert!(matches!(result.failure, Some(FailureReason::InvalidSignature(_))));
    }

    #[test]
    fn test_offline_expiry_uses_local_clock() {
        let f = setup();
        let mut expiring = snapshot(&f.keys, 0);
        expiring.valid_until = START + DAY;
        let (payload, metadata) = forge(&f.keys, expiring, 0);

        assert!(f.verifier.verify_offline(&payload, &metadata).unwrap().is_valid);
        f.clock.advance(DAY);
        let result = f.verifier.verify_offline(&payload, &metadata).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.failure, Some(FailureReason::Expired));
    }
}
