// src/wallet/key_management.rs
//! Signing capability for issuers.
//!
//! The rest of the system only ever sees the [`Signer`] trait: an account
//! address and a way to sign bytes. [`KeyManager`] is the secp256k1
//! implementation backed by an in-process private key.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - Keccak-256 hashing (via `ethers-core`)
//! - Cryptographically secure random number generation

use crate::errors::SignerError;
use crate::utils::crypto::{address_of, hash_data};
use ethers_core::types::Address;
use ethers_core::utils::hex;
use k256::ecdsa::SigningKey;

/// Opaque signing capability.
///
/// Used to produce the `signature` field of a compact presentation. Verifiers
/// never need a `Signer`; they recover the signer's address instead.
pub trait Signer: Send + Sync {
    /// Account address the signatures recover to.
    fn address(&self) -> Address;

    /// Signs `payload`, returning a 65-byte `r || s || v` signature.
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, SignerError>;
}

/// Secure key management for elliptic curve cryptography.
///
/// # Security Notes
/// - The signing key is never exposed
/// - Signatures are deterministic (RFC 6979)
#[derive(Clone)]
pub struct KeyManager {
    /// Securely stored private key (never exposed)
    signing_key: SigningKey,
    /// Account address derived from the public key
    address: Address,
}

impl KeyManager {
    /// Generates a new KeyManager with a fresh random key.
    pub fn new() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Loads a KeyManager from a hex-encoded private key.
    ///
    /// # Arguments
    /// * `private_key` - 32-byte secret, hex-encoded, with or without `0x` prefix
    ///
    /// # Errors
    /// Returns `SignerError::InvalidKey` if the hex is malformed or the scalar
    /// is not a valid secp256k1 secret.
    pub fn from_private_key(private_key: &str) -> Result<Self, SignerError> {
        let bare = private_key.trim().strip_prefix("0x").unwrap_or(private_key.trim());
        let bytes = hex::decode(bare).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_of(signing_key.verifying_key());
        KeyManager {
            signing_key,
            address,
        }
    }

    /// Signs a message using ECDSA (secp256k1) with Keccak-256 prehashing.
    ///
    /// # Process Flow
    /// 1. Hashes message with Keccak-256
    /// 2. Signs the hash, keeping the recovery id
    /// 3. Serializes as `r || s || v` with `v` in `{0, 1}`
    pub fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        let hash = hash_data(message);

        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte());
        Ok(bytes)
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for KeyManager {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, SignerError> {
        self.sign_message(payload)
    }
}
