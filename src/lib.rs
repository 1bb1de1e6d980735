// src/lib.rs
//! # Soulbound Credentials
//!
//! Non-transferable credentials issued by registered authorities, revocable
//! only by their issuer and verifiable from a compact, signed presentation.
//!
//! ## Architecture Overview
//! 1. **Contracts**: issuer registry and credential ledger, the authoritative store
//! 2. **Codec**: compact presentation payloads and extended metadata
//! 3. **Services**: issuance, verification and the HTTP API
//! 4. **Storage**: content-addressed metadata store (in-memory or IPFS)
//! 5. **Wallet**: secp256k1 signing keys

pub mod blockchain;
pub mod codec;
pub mod config;
pub mod contracts;
pub mod errors;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
pub mod wallet;
