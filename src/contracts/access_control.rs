// src/contracts/access_control.rs
//! Role-based capabilities of the authoritative store.
//!
//! Roles are looked up on every privileged call; nothing caches a role
//! decision, so revoking a role takes effect on the very next call.

use ethers_core::types::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Capabilities a caller may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Platform operator: manages issuers
    Administrator,
    /// Registered issuer: may mint credentials while active
    Issuer,
    /// The credential ledger itself: may bump issuer counters
    Ledger,
}

/// Shared role table.
#[derive(Debug, Default)]
pub struct AccessControl {
    members: RwLock<HashMap<Role, HashSet<Address>>>,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a role table with `admin` holding the Administrator role.
    pub fn with_admin(admin: Address) -> Self {
        let access = Self::new();
        access.grant_role(Role::Administrator, admin);
        access
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.members
            .read()
            .get(&role)
            .map_or(false, |set| set.contains(&account))
    }

    /// Grants `role` to `account`. Returns whether the account was newly added.
    pub fn grant_role(&self, role: Role, account: Address) -> bool {
        let added = self.members.write().entry(role).or_default().insert(account);
        if added {
            log::info!("granted {:?} to 0x{:x}", role, account);
        }
        added
    }

    /// Revokes `role` from `account`. Returns whether the account held it.
    pub fn revoke_role(&self, role: Role, account: Address) -> bool {
        let removed = self
            .members
            .write()
            .get_mut(&role)
            .map_or(false, |set| set.remove(&account));
        if removed {
            log::info!("revoked {:?} from 0x{:x}", role, account);
        }
        removed
    }
}
