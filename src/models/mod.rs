// src/models/mod.rs
pub mod credential;
pub mod issuer;
pub mod presentation;
