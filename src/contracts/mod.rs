// src/contracts/mod.rs
//! The authoritative store: access control, issuer registry and credential ledger.

pub mod access_control;
pub mod credential_registry;
pub mod issuer_registry;
pub mod soulbound;

use crate::blockchain::clock::Clock;
use crate::blockchain::events::EventLog;
use access_control::{AccessControl, Role};
use credential_registry::CredentialRegistry;
use ethers_core::types::Address;
use issuer_registry::IssuerRegistry;
use std::sync::Arc;

/// Fixed identity of the credential ledger within a deployment.
pub const LEDGER_ADDRESS: Address = Address::repeat_byte(0x5b);

/// A wired-up registry and ledger sharing one role table, event log and clock.
#[derive(Clone)]
pub struct Deployment {
    pub access: Arc<AccessControl>,
    pub events: Arc<EventLog>,
    pub registry: Arc<IssuerRegistry>,
    pub ledger: Arc<CredentialRegistry>,
}

impl Deployment {
    /// Deploys both components with `admin` as the platform Administrator.
    ///
    /// The ledger is granted the Ledger role so its counter notifications
    /// are accepted by the registry.
    pub fn new(admin: Address, clock: Arc<dyn Clock>) -> Self {
        let access = Arc::new(AccessControl::with_admin(admin));
        let events = Arc::new(EventLog::new());
        let registry = Arc::new(IssuerRegistry::new(
            access.clone(),
            events.clone(),
            clock.clone(),
        ));
        let ledger = Arc::new(CredentialRegistry::new(
            LEDGER_ADDRESS,
            registry.clone(),
            events.clone(),
            clock,
        ));
        access.grant_role(Role::Ledger, LEDGER_ADDRESS);

        Deployment {
            access,
            events,
            registry,
            ledger,
        }
    }
}
