// src/contracts/credential_registry.rs
//! Credential Ledger: issuance, revocation and validity of soulbound credentials.
//!
//! # State machine
//! ```text
//! Active ──revoke (original issuer only)──▶ Revoked (terminal)
//! ```
//! Expiry is not a stored state. It is a time-dependent view over `Active`,
//! as is the issuer's activation flag. Validity is therefore recomputed on
//! every query from the record, the clock and the registry.

use crate::blockchain::clock::Clock;
use crate::blockchain::events::{EventKind, EventLog};
use crate::contracts::issuer_registry::IssuerAuthority;
use crate::contracts::soulbound::{Soulbound, TokenOwnership};
use crate::errors::LedgerError;
use crate::models::credential::{
    Credential, CredentialVerification, ValidityStatus, NEVER_EXPIRES,
};
use ethers_core::types::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Issuer name reported when the registry lookup fails during `verify`.
pub const UNKNOWN_ISSUER: &str = "Unknown Issuer";

/// Arguments of [`CredentialRegistry::issue`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub recipient: Address,
    pub credential_type: String,
    pub subject: String,
    pub recipient_name: String,
    /// UNIX seconds, or 0 for "never expires"
    #[serde(default)]
    pub valid_until: u64,
    #[serde(default)]
    pub additional_data: serde_json::Value,
    #[serde(default)]
    pub presentation_ref: Option<String>,
}

#[derive(Debug, Default)]
struct LedgerState {
    /// Indexed by credential id
    credentials: Vec<Credential>,
    by_recipient: HashMap<Address, Vec<u64>>,
    by_issuer: HashMap<Address, Vec<u64>>,
    tokens: TokenOwnership,
}

impl LedgerState {
    /// Ids that do not fit in `usize` on this target simply do not exist.
    fn credential(&self, id: u64) -> Option<&Credential> {
        usize::try_from(id).ok().and_then(|index| self.credentials.get(index))
    }

    fn credential_mut(&mut self, id: u64) -> Option<&mut Credential> {
        usize::try_from(id).ok().and_then(|index| self.credentials.get_mut(index))
    }
}

/// In-process credential ledger.
///
/// Writes hold the state lock for their whole validate-then-apply sequence,
/// which keeps ids sequential and revocation exactly-once under concurrency.
pub struct CredentialRegistry {
    /// Identity the ledger presents when calling back into the registry
    address: Address,
    authority: Arc<dyn IssuerAuthority>,
    events: Arc<EventLog>,
    clock: Arc<dyn Clock>,
    state: RwLock<LedgerState>,
}

impl CredentialRegistry {
    pub fn new(
        address: Address,
        authority: Arc<dyn IssuerAuthority>,
        events: Arc<EventLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        CredentialRegistry {
            address,
            authority,
            events,
            clock,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Identity of the ledger itself.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Mints a credential to `request.recipient` on behalf of `caller`.
    ///
    /// # Returns
    /// The new credential's id. Ids start at 0 and increase by one per
    /// successful issuance across all issuers.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not an active issuer right now
    /// - `InvalidArgument` for a null recipient, an empty type, subject or
    ///   recipient name, or a non-zero `valid_until` that is not in the future
    ///
    /// The issuer's counter is bumped afterwards on a best-effort basis; a
    /// failure there is logged and does not affect the issuance.
    pub fn issue(&self, caller: Address, request: IssueRequest) -> Result<u64, LedgerError> {
        let mut state = self.state.write();

        if !self.authority.is_active_issuer(caller) {
            return Err(LedgerError::unauthorized(caller, "issue credentials"));
        }
        if request.recipient.is_zero() {
            return Err(LedgerError::InvalidArgument("recipient is the null address".into()));
        }
        require_non_empty("credential type", &request.credential_type)?;
        require_non_empty("subject", &request.subject)?;
        require_non_empty("recipient name", &request.recipient_name)?;

        let now = self.clock.now();
        if request.valid_until != NEVER_EXPIRES && request.valid_until <= now {
            return Err(LedgerError::InvalidArgument(
                "expiration must be in the future".into(),
            ));
        }

        let id = state.credentials.len() as u64;
        state.tokens.mint(id, request.recipient, &Soulbound)?;

        let credential = Credential {
            id,
            credential_type: request.credential_type,
            subject: request.subject,
            recipient: request.recipient,
            recipient_name: request.recipient_name,
            issuer: caller,
            issued_at: now,
            valid_until: request.valid_until,
            additional_data: request.additional_data,
            presentation_ref: request.presentation_ref.filter(|r| !r.is_empty()),
            is_revoked: false,
            revoked_at: None,
            revocation_reason: None,
        };
        state.by_recipient.entry(credential.recipient).or_default().push(id);
        state.by_issuer.entry(caller).or_default().push(id);
        self.events.append(
            now,
            EventKind::CredentialIssued {
                id,
                recipient: credential.recipient,
                issuer: caller,
                credential_type: credential.credential_type.clone(),
            },
        );
        state.credentials.push(credential);
        drop(state);

        log::info!("issued credential {} by 0x{:x}", id, caller);
        best_effort("issuer counter increment", || {
            self.authority.increment_issued_count(self.address, caller)
        });
        Ok(id)
    }

    /// Revokes a credential. Irreversible.
    ///
    /// # Errors
    /// - `NotFound` if `id` does not exist
    /// - `Unauthorized` unless `caller` is the credential's original issuer
    ///   (Administrators included)
    /// - `AlreadyRevoked` on a second revocation
    /// - `InvalidArgument` if `reason` is empty
    pub fn revoke(&self, caller: Address, id: u64, reason: &str) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let credential = state
            .credential_mut(id)
            .ok_or_else(|| credential_not_found(id))?;

        if credential.issuer != caller {
            return Err(LedgerError::unauthorized(caller, "revoke this credential"));
        }
        if credential.is_revoked {
            return Err(LedgerError::AlreadyRevoked(id));
        }
        require_non_empty("revocation reason", reason)?;

        let now = self.clock.now();
        credential.is_revoked = true;
        credential.revoked_at = Some(now);
        credential.revocation_reason = Some(reason.to_string());

        self.events.append(
            now,
            EventKind::CredentialRevoked {
                id,
                issuer: caller,
                reason: reason.to_string(),
            },
        );
        log::info!("revoked credential {}: {}", id, reason);
        Ok(())
    }

    /// Current validity status of a credential, or `None` if it does not exist.
    pub fn status(&self, id: u64) -> Option<ValidityStatus> {
        let state = self.state.read();
        state
            .credential(id)
            .map(|credential| self.status_of(credential))
    }

    fn status_of(&self, credential: &Credential) -> ValidityStatus {
        if credential.is_revoked {
            ValidityStatus::Revoked
        } else if !self.authority.is_active(credential.issuer) {
            ValidityStatus::IssuerInactive
        } else if credential.is_expired_at(self.clock.now()) {
            ValidityStatus::Expired
        } else {
            ValidityStatus::Valid
        }
    }

    /// Whether a credential is currently valid. Unknown ids are simply invalid.
    pub fn is_valid(&self, id: u64) -> bool {
        self.status(id).map_or(false, ValidityStatus::is_valid)
    }

    /// Validity plus the issuer's display name.
    ///
    /// The issuer lookup is best-effort: if it fails the name degrades to
    /// [`UNKNOWN_ISSUER`] rather than failing the verification.
    ///
    /// # Errors
    /// `NotFound` if `id` does not exist.
    pub fn verify(&self, id: u64) -> Result<CredentialVerification, LedgerError> {
        let (credential, status) = {
            let state = self.state.read();
            let credential = state
                .credential(id)
                .ok_or_else(|| credential_not_found(id))?;
            (credential.clone(), self.status_of(credential))
        };

        let issuer_name = best_effort("issuer name lookup", || {
            self.authority.issuer_name(credential.issuer)
        })
        .unwrap_or_else(|| UNKNOWN_ISSUER.to_string());

        Ok(CredentialVerification {
            is_valid: status.is_valid(),
            status,
            issuer_name,
            credential,
        })
    }

    pub fn get(&self, id: u64) -> Result<Credential, LedgerError> {
        self.state
            .read()
            .credential(id)
            .cloned()
            .ok_or_else(|| credential_not_found(id))
    }

    /// Credentials held by `recipient`, in issuance order.
    pub fn credentials_of(&self, recipient: Address) -> Vec<Credential> {
        let state = self.state.read();
        collect(&state, state.by_recipient.get(&recipient))
    }

    /// Credentials minted by `issuer`, in issuance order.
    pub fn issued_by(&self, issuer: Address) -> Vec<Credential> {
        let state = self.state.read();
        collect(&state, state.by_issuer.get(&issuer))
    }

    pub fn total_issued(&self) -> u64 {
        self.state.read().credentials.len() as u64
    }

    pub fn owner_of(&self, id: u64) -> Result<Address, LedgerError> {
        self.state
            .read()
            .tokens
            .owner_of(id)
            .ok_or_else(|| credential_not_found(id))
    }

    pub fn balance_of(&self, holder: Address) -> u64 {
        self.state.read().tokens.balance_of(holder)
    }

    /// Token-style transfer entry point. Always rejected for existing
    /// credentials, whoever the caller is.
    pub fn transfer_from(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        id: u64,
    ) -> Result<(), LedgerError> {
        let result = self.state.write().tokens.transfer(id, from, to, &Soulbound);
        if let Err(e) = &result {
            log::warn!("rejected transfer of credential {} requested by 0x{:x}: {}", id, caller, e);
        }
        result
    }

    /// Token-style approval entry point. Always rejected for existing credentials.
    pub fn approve(&self, caller: Address, operator: Address, id: u64) -> Result<(), LedgerError> {
        let result = self.state.write().tokens.approve(id, operator, &Soulbound);
        if let Err(e) = &result {
            log::warn!("rejected approval on credential {} requested by 0x{:x}: {}", id, caller, e);
        }
        result
    }
}

/// Runs a cross-component call whose failure must not propagate.
fn best_effort<T>(what: &str, call: impl FnOnce() -> Result<T, LedgerError>) -> Option<T> {
    match call() {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("best-effort {} failed: {}", what, e);
            None
        }
    }
}

fn collect(state: &LedgerState, ids: Option<&Vec<u64>>) -> Vec<Credential> {
    ids.map(|ids| {
        ids.iter()
            .filter_map(|id| state.credential(*id).cloned())
            .collect()
    })
    .unwrap_or_default()
}

fn require_non_empty(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        Err(LedgerError::InvalidArgument(format!("{} is empty", field)))
    } else {
        Ok(())
    }
}

fn credential_not_found(id: u64) -> LedgerError {
    LedgerError::NotFound(format!("credential {}", id))
}
