// src/contracts/issuer_registry.rs
//! Authorization Registry: the single source of truth for who may issue.
//!
//! Tracks issuer records, enforces the one-identity-one-name binding and owns
//! the issuer lifecycle (`register` → `deactivate` ⇄ `activate`). Records are
//! never deleted. Every mutation is Administrator-gated, checked against the
//! shared [`AccessControl`] table at call time, and appended to the audit log.

use crate::blockchain::clock::Clock;
use crate::blockchain::events::{EventKind, EventLog};
use crate::contracts::access_control::{AccessControl, Role};
use crate::errors::LedgerError;
use crate::models::issuer::{Issuer, IssuerProfile};
use ethers_core::types::Address;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// What the credential ledger needs from the issuer registry.
///
/// The ledger depends on this trait rather than on [`IssuerRegistry`] so its
/// best-effort calls can be exercised against an authority that fails.
pub trait IssuerAuthority: Send + Sync {
    /// Whether `identity` is registered and active.
    fn is_active(&self, identity: Address) -> bool;

    /// Whether `identity` may mint right now: active and holding the Issuer role.
    fn is_active_issuer(&self, identity: Address) -> bool;

    /// Registered name of `identity`.
    fn issuer_name(&self, identity: Address) -> Result<String, LedgerError>;

    /// Bumps the issued-credential counter of `identity` on behalf of `caller`.
    fn increment_issued_count(&self, caller: Address, identity: Address)
        -> Result<u64, LedgerError>;
}

#[derive(Debug, Default)]
struct RegistryState {
    issuers: HashMap<Address, Issuer>,
    by_name: HashMap<String, Address>,
    /// Registration order, for stable listing
    order: Vec<Address>,
}

/// In-process issuer registry.
///
/// All state sits behind one lock: each mutating call validates and applies
/// under the write guard, so calls are totally ordered and never partially
/// visible.
pub struct IssuerRegistry {
    access: Arc<AccessControl>,
    events: Arc<EventLog>,
    clock: Arc<dyn Clock>,
    state: RwLock<RegistryState>,
}

impl IssuerRegistry {
    pub fn new(access: Arc<AccessControl>, events: Arc<EventLog>, clock: Arc<dyn Clock>) -> Self {
        IssuerRegistry {
            access,
            events,
            clock,
            state: RwLock::new(RegistryState::default()),
        }
    }

    fn require_admin(&self, caller: Address, action: &'static str) -> Result<(), LedgerError> {
        if self.access.has_role(Role::Administrator, caller) {
            Ok(())
        } else {
            Err(LedgerError::unauthorized(caller, action))
        }
    }

    /// Registers a new issuer.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not an Administrator
    /// - `InvalidArgument` if `identity` is the null address or `name` is empty
    /// - `AlreadyExists` if the identity is registered or the name is claimed
    pub fn register(
        &self,
        caller: Address,
        identity: Address,
        name: &str,
        profile: IssuerProfile,
    ) -> Result<Issuer, LedgerError> {
        self.require_admin(caller, "register issuers")?;
        if identity.is_zero() {
            return Err(LedgerError::InvalidArgument("issuer identity is the null address".into()));
        }
        // Surrounding whitespace never distinguishes two names
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidArgument("issuer name is empty".into()));
        }

        let mut state = self.state.write();
        if state.issuers.contains_key(&identity) {
            return Err(LedgerError::AlreadyExists(format!("issuer 0x{:x}", identity)));
        }
        if state.by_name.contains_key(name) {
            return Err(LedgerError::AlreadyExists(format!("issuer name {:?}", name)));
        }

        let now = self.clock.now();
        let issuer = Issuer {
            identity,
            name: name.to_string(),
            description: profile.description,
            website: profile.website,
            logo_url: profile.logo_url,
            is_active: true,
            registered_at: now,
            credentials_issued: 0,
        };
        state.issuers.insert(identity, issuer.clone());
        state.by_name.insert(issuer.name.clone(), identity);
        state.order.push(identity);

        self.access.grant_role(Role::Issuer, identity);
        self.events.append(
            now,
            EventKind::IssuerRegistered {
                identity,
                name: issuer.name.clone(),
            },
        );
        log::info!("registered issuer {:?} at 0x{:x}", issuer.name, identity);
        Ok(issuer)
    }

    /// Replaces the description, website and logo of an issuer.
    ///
    /// Name and identity are fixed at registration.
    pub fn update(
        &self,
        caller: Address,
        identity: Address,
        profile: IssuerProfile,
    ) -> Result<Issuer, LedgerError> {
        self.require_admin(caller, "update issuers")?;

        let mut state = self.state.write();
        let issuer = state
            .issuers
            .get_mut(&identity)
            .ok_or_else(|| not_registered(identity))?;
        issuer.description = profile.description;
        issuer.website = profile.website;
        issuer.logo_url = profile.logo_url;
        let updated = issuer.clone();

        self.events
            .append(self.clock.now(), EventKind::IssuerUpdated { identity });
        log::info!("updated profile of issuer {:?} at 0x{:x}", updated.name, identity);
        Ok(updated)
    }

    /// Deactivates an issuer and withdraws its Issuer role.
    ///
    /// Every credential it issued reads as invalid from now on, without any
    /// write to the credentials themselves. Deactivating an inactive issuer
    /// succeeds and records the event again.
    pub fn deactivate(&self, caller: Address, identity: Address) -> Result<(), LedgerError> {
        self.set_active(caller, identity, false)
    }

    /// Reactivates an issuer and restores its Issuer role.
    ///
    /// Activating an active issuer succeeds and records the event again.
    pub fn activate(&self, caller: Address, identity: Address) -> Result<(), LedgerError> {
        self.set_active(caller, identity, true)
    }

    fn set_active(&self, caller: Address, identity: Address, active: bool) -> Result<(), LedgerError> {
        self.require_admin(
            caller,
            if active { "activate issuers" } else { "deactivate issuers" },
        )?;

        let mut state = self.state.write();
        let issuer = state
            .issuers
            .get_mut(&identity)
            .ok_or_else(|| not_registered(identity))?;
        issuer.is_active = active;

        let kind = if active {
            self.access.grant_role(Role::Issuer, identity);
            EventKind::IssuerActivated { identity }
        } else {
            self.access.revoke_role(Role::Issuer, identity);
            EventKind::IssuerDeactivated { identity }
        };
        self.events.append(self.clock.now(), kind);
        log::info!(
            "issuer 0x{:x} {}",
            identity,
            if active { "activated" } else { "deactivated" }
        );
        Ok(())
    }

    /// Increments the issued-credential counter.
    ///
    /// # Errors
    /// - `Unauthorized` unless `caller` holds the Ledger or Administrator role
    /// - `NotFound` if `identity` is not registered
    pub fn increment_issued_count(
        &self,
        caller: Address,
        identity: Address,
    ) -> Result<u64, LedgerError> {
        if !self.access.has_role(Role::Ledger, caller)
            && !self.access.has_role(Role::Administrator, caller)
        {
            return Err(LedgerError::unauthorized(caller, "increment issuer counters"));
        }

        let mut state = self.state.write();
        let issuer = state
            .issuers
            .get_mut(&identity)
            .ok_or_else(|| not_registered(identity))?;
        issuer.credentials_issued += 1;
        let count = issuer.credentials_issued;

        self.events.append(
            self.clock.now(),
            EventKind::IssuedCountIncremented { identity, count },
        );
        Ok(count)
    }

    pub fn is_registered(&self, identity: Address) -> bool {
        self.state.read().issuers.contains_key(&identity)
    }

    pub fn is_active(&self, identity: Address) -> bool {
        self.state
            .read()
            .issuers
            .get(&identity)
            .map_or(false, |issuer| issuer.is_active)
    }

    /// Fetches an issuer record.
    ///
    /// # Errors
    /// `NotFound` if `identity` is not registered.
    pub fn get(&self, identity: Address) -> Result<Issuer, LedgerError> {
        self.state
            .read()
            .issuers
            .get(&identity)
            .cloned()
            .ok_or_else(|| not_registered(identity))
    }

    /// Resolves a name to the identity that claimed it. A miss is not an error.
    pub fn get_by_name(&self, name: &str) -> Option<Address> {
        self.state.read().by_name.get(name.trim()).copied()
    }

    /// All issuers in registration order.
    pub fn list_all(&self) -> Vec<Issuer> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|identity| state.issuers.get(identity).cloned())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.state.read().issuers.len()
    }
}

impl IssuerAuthority for IssuerRegistry {
    fn is_active(&self, identity: Address) -> bool {
        IssuerRegistry::is_active(self, identity)
    }

    fn is_active_issuer(&self, identity: Address) -> bool {
        IssuerRegistry::is_active(self, identity) && self.access.has_role(Role::Issuer, identity)
    }

    fn issuer_name(&self, identity: Address) -> Result<String, LedgerError> {
        self.get(identity).map(|issuer| issuer.name)
    }

    fn increment_issued_count(
        &self,
        caller: Address,
        identity: Address,
    ) -> Result<u64, LedgerError> {
        IssuerRegistry::increment_issued_count(self, caller, identity)
    }
}

fn not_registered(identity: Address) -> LedgerError {
    LedgerError::NotFound(format!("issuer 0x{:x}", identity))
}
