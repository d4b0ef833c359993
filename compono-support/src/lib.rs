//! # Compono Support
//!
//! Shared helpers for the Compono component container.
//!
//! This crate provides:
//! - Text rendering for resolution diagnostics
//! - Type-name shortening and "did you mean?" suggestions

pub mod rendering;
