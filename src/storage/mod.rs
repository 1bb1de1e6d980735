// src/storage/mod.rs
pub mod content_store;
pub mod ipfs_client;
