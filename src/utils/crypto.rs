// src/utils/crypto.rs
//! Cryptographic utilities optimized for blockchain compatibility.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for all hashing and
//! secp256k1 recoverable ECDSA signatures, so a signature alone identifies
//! the account address that produced it.

use crate::errors::SignerError;
use ethers_core::types::Address;
use ethers_core::utils::{hex, keccak256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

/// Length of a recoverable signature: `r || s || v`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Hex encoding of the Keccak-256 digest of `data`, with `0x` prefix.
pub fn digest_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(hash_data(data)))
}

/// Derives the account address of a public key.
///
/// The address is the last 20 bytes of the Keccak-256 hash of the
/// uncompressed SEC1 point without its `0x04` tag.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = hash_data(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Formats an address as a full lowercase hex string with 0x prefix.
pub fn format_address(addr: &Address) -> String {
    format!("0x{:x}", addr)
}

/// Encodes signature bytes as a `0x`-prefixed hex string.
pub fn encode_signature(signature: &[u8]) -> String {
    format!("0x{}", hex::encode(signature))
}

/// Decodes a `0x`-prefixed (or bare) hex signature string.
pub fn decode_signature(signature: &str) -> Result<Vec<u8>, SignerError> {
    let bare = signature.strip_prefix("0x").unwrap_or(signature);
    hex::decode(bare).map_err(|e| SignerError::InvalidSignature(e.to_string()))
}

/// Recovers the account address that signed `message`.
///
/// # Arguments
/// * `message` - Raw message bytes (hashed with Keccak-256 before recovery)
/// * `signature` - 65-byte `r || s || v` signature, `v` in `{0, 1, 27, 28}`
///
/// # Errors
/// Returns `SignerError::InvalidSignature` if the signature has the wrong
/// length, an out-of-range recovery id, or does not recover to a valid key.
pub fn recover_address(message: &[u8], signature: &[u8]) -> Result<Address, SignerError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(SignerError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            signature.len()
        )));
    }

    let v = match signature[64] {
        v @ 0..=1 => v,
        v @ 27..=28 => v - 27,
        other => {
            return Err(SignerError::InvalidSignature(format!(
                "invalid recovery id {}",
                other
            )))
        }
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| SignerError::InvalidSignature("invalid recovery id".into()))?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

    let hash = hash_data(message);
    let key = VerifyingKey::recover_from_prehash(&hash, &sig, recovery_id)
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    Ok(address_of(&key))
}
