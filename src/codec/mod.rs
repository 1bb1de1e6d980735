// src/codec/mod.rs
pub mod presentation;
