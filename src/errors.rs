// src/errors.rs
//! Error taxonomy for the credential system.
//!
//! Every failure mode is a distinct variant so callers can tell
//! "this issuer is not authorized" apart from "this credential does not exist"
//! without string matching.

use ethers_core::types::Address;
use thiserror::Error;

/// Errors raised by the authoritative store (issuer registry and credential ledger).
///
/// A failed call never partially applies: validation happens before any
/// state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The caller does not currently hold the capability the operation requires.
    #[error("unauthorized: {caller:#x} may not {action}")]
    Unauthorized { caller: Address, action: &'static str },

    /// The referenced issuer, credential or name does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate identity or name on registration.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Second revocation of the same credential.
    #[error("credential {0} is already revoked")]
    AlreadyRevoked(u64),

    /// Empty required field, non-future expiry or null identity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation exists on the underlying token primitive but is
    /// disabled for soulbound credentials.
    #[error("not supported: {0}")]
    NotSupported(&'static str),
}

impl LedgerError {
    pub(crate) fn unauthorized(caller: Address, action: &'static str) -> Self {
        LedgerError::Unauthorized { caller, action }
    }
}

/// Decode failures of a presentation payload.
///
/// Kept separate from [`LedgerError`] so a scanner can report
/// "unreadable code" distinctly from "invalid credential".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentationError {
    /// The input is not parseable as a JSON object at all.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The input parsed but a required field is missing or has the wrong shape.
    #[error("schema violation on `{field}`: {reason}")]
    SchemaViolation { field: &'static str, reason: String },
}

/// Failures of the content-addressed store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("content {0} not found")]
    NotFound(String),

    #[error("content store backend error: {0}")]
    Backend(String),

    #[error("content store request timed out")]
    Timeout,
}

/// Failures of the signing capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Failures of the issuer-side presentation flow, which spans the ledger,
/// the content store and the signer.
#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Presentation(#[from] PresentationError),

    /// The credential was minted, but building its presentation failed.
    /// The credential stays on the ledger; retry with `present(id)`.
    #[error("credential {id} was issued but its presentation failed: {source}")]
    PresentationFailed {
        id: u64,
        source: Box<IssuanceError>,
    },
}

impl IssuanceError {
    /// Id of a credential that exists despite this error, if any.
    pub fn credential_id(&self) -> Option<u64> {
        match self {
            IssuanceError::PresentationFailed { id, .. } => Some(*id),
            _ => None,
        }
    }
}
