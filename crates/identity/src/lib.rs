//! # HostPin Identity Library
//!
//! Shared types for the HostPin endpoint-identity trust subsystem.
//!
//! ## Overview
//!
//! This crate is the foundation the trust layer is built on, providing:
//!
//! - **Identity Types**: observed and stored identities, record scope,
//!   trust policies, and verification verdicts
//! - **Fingerprint Formatting**: grouped display form and
//!   separator-insensitive comparison
//! - **Error Taxonomy**: every typed reason a connection attempt can be
//!   refused
//!
//! It deliberately contains no I/O and no cryptography: fingerprints arrive
//! here as already-computed strings produced by an external TLS/SSH
//! handshake layer.
//!
//! ## Example Usage
//!
//! ```rust
//! use identity::{fingerprint, IdentityType, ObservedIdentity, TrustPolicy};
//!
//! let observed = ObservedIdentity::new("example.com", 443, IdentityType::Tls, "aabbcc");
//! assert_eq!(fingerprint::format(&observed.fingerprint), "AA:BB:CC");
//! assert_eq!(TrustPolicy::default(), TrustPolicy::Tofu);
//! ```
//!
//! ## Modules
//!
//! - [`types`]: identity, scope, policy, and verdict definitions
//! - [`fingerprint`]: display formatting and comparison
//! - [`error`]: error types

pub mod error;
pub mod fingerprint;
pub mod types;

pub use error::{Result, TrustError};
pub use types::{
    IdentityType, ObservedIdentity, PromptReason, RejectReason, Scope, StoredIdentity,
    TrustPolicy, Verdict,
};
