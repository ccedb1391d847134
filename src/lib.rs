//! Sigil - web-of-trust verification for distributable packages
//!
//! This crate protects an installation pipeline from tampered or unsigned
//! package content. It validates signatures through an external OpenPGP
//! tool against a single designated trust root and cross-checks on-disk
//! file hashes against a signed manifest.
//!
//! Design principles:
//! - The external tool is the cryptographic primitive provider; this crate
//!   interprets its status protocol and never re-implements OpenPGP
//! - Mathematical validity, policy trust, and chain-of-custody are
//!   independent axes; full assurance requires all that apply
//! - A forged or missing signature is never silently accepted - every
//!   failure surfaces as a typed result
//! - All configuration is explicit per engine instance; no global state

pub mod config;
pub mod engine;
pub mod error;
pub mod gpg;
pub mod hasher;
pub mod keyring;
pub mod layout;
pub mod manifest;

pub use config::EngineConfig;
pub use engine::TrustEngine;
pub use error::VerifyError;
pub use gpg::status::{SignatureStatus, Verdict};
pub use keyring::KeyId;
pub use layout::{Destination, DirLayout, PackageLayout};
pub use manifest::Manifest;
