// src/contracts/soulbound.rs
//! Token ownership primitive with a transfer guard.
//!
//! [`TokenOwnership`] is a plain ownable-token table: it can mint, transfer
//! and approve. Every path that changes or delegates ownership goes through
//! a [`TransferGuard`] first. Credentials use the [`Soulbound`] guard, which
//! admits only the mint-time assignment from "no holder" to the recipient.

use crate::errors::LedgerError;
use ethers_core::types::Address;
use std::collections::HashMap;

/// Policy consulted before any ownership change or delegation.
pub trait TransferGuard {
    /// `from` is `None` for a mint.
    fn check_transfer(&self, token_id: u64, from: Option<Address>, to: Address)
        -> Result<(), LedgerError>;

    fn check_approval(&self, token_id: u64, owner: Address, operator: Address)
        -> Result<(), LedgerError>;
}

/// Guard for non-transferable tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct Soulbound;

impl TransferGuard for Soulbound {
    fn check_transfer(
        &self,
        _token_id: u64,
        from: Option<Address>,
        to: Address,
    ) -> Result<(), LedgerError> {
        match from {
            None if !to.is_zero() => Ok(()),
            None => Err(LedgerError::InvalidArgument("cannot mint to the null address".into())),
            Some(_) => Err(LedgerError::NotSupported("credentials are non-transferable")),
        }
    }

    fn check_approval(
        &self,
        _token_id: u64,
        _owner: Address,
        _operator: Address,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::NotSupported("credentials cannot be approved for transfer"))
    }
}

/// Ownership table of a token collection.
#[derive(Debug, Default, Clone)]
pub struct TokenOwnership {
    owners: HashMap<u64, Address>,
    balances: HashMap<Address, u64>,
    approvals: HashMap<u64, Address>,
}

impl TokenOwnership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner_of(&self, token_id: u64) -> Option<Address> {
        self.owners.get(&token_id).copied()
    }

    pub fn balance_of(&self, owner: Address) -> u64 {
        self.balances.get(&owner).copied().unwrap_or(0)
    }

    pub fn approved(&self, token_id: u64) -> Option<Address> {
        self.approvals.get(&token_id).copied()
    }

    /// Assigns a fresh token to `to`.
    pub fn mint(
        &mut self,
        token_id: u64,
        to: Address,
        guard: &dyn TransferGuard,
    ) -> Result<(), LedgerError> {
        if self.owners.contains_key(&token_id) {
            return Err(LedgerError::AlreadyExists(format!("token {}", token_id)));
        }
        guard.check_transfer(token_id, None, to)?;
        self.assign(token_id, None, to);
        Ok(())
    }

    /// Moves a token from `from` to `to`.
    pub fn transfer(
        &mut self,
        token_id: u64,
        from: Address,
        to: Address,
        guard: &dyn TransferGuard,
    ) -> Result<(), LedgerError> {
        let owner = self
            .owner_of(token_id)
            .ok_or_else(|| LedgerError::NotFound(format!("token {}", token_id)))?;
        guard.check_transfer(token_id, Some(owner), to)?;
        if owner != from {
            return Err(LedgerError::InvalidArgument(format!(
                "token {} is not held by 0x{:x}",
                token_id, from
            )));
        }
        self.assign(token_id, Some(owner), to);
        Ok(())
    }

    /// Lets `operator` transfer the token on the owner's behalf.
    pub fn approve(
        &mut self,
        token_id: u64,
        operator: Address,
        guard: &dyn TransferGuard,
    ) -> Result<(), LedgerError> {
        let owner = self
            .owner_of(token_id)
            .ok_or_else(|| LedgerError::NotFound(format!("token {}", token_id)))?;
        guard.check_approval(token_id, owner, operator)?;
        self.approvals.insert(token_id, operator);
        Ok(())
    }

    fn assign(&mut self, token_id: u64, from: Option<Address>, to: Address) {
        if let Some(from) = from {
            if let Some(balance) = self.balances.get_mut(&from) {
                *balance = balance.saturating_sub(1);
            }
        }
        self.approvals.remove(&token_id);
        self.owners.insert(token_id, to);
        *self.balances.entry(to).or_insert(0) += 1;
    }
}
