//! # HostPin Trust Library
//!
//! Endpoint-identity trust decisions for a remote-connection client, in the
//! spirit of SSH's `known_hosts` and browser certificate pinning: remember
//! a fingerprint the first time an endpoint is seen, detect when a later
//! connection presents a different one, and gate the connection on a
//! configurable policy.
//!
//! ## Architecture
//!
//! ```text
//! handshake layer ──observed identity──▶ ┌───────────────────────────┐
//!                                        │       TrustService        │
//! connection config ──policy, scope────▶ │  (per-endpoint critical   │
//!                                        │         section)          │
//!                                        └─────┬──────────┬──────────┘
//!                                              │          │
//!                                   ┌──────────▼───┐  ┌───▼────────────┐
//!                                   │   verifier   │  │  TrustPrompt   │
//!                                   │ (pure table) │  │ + TrustPrompter│
//!                                   └──────────────┘  └───┬────────────┘
//!                                              │          │
//!                                        ┌─────▼──────────▼──────────┐
//!                                        │        TrustStore         │
//!                                        │  (JSON, write-through)    │
//!                                        └───────────────────────────┘
//! ```
//!
//! The verifier never mutates the store; all writes happen in the service,
//! and only on an accept path. Management UIs use the store surface
//! (`records`, `remove`, `clear`, `set_nickname`) and never accept an
//! identity behind the verifier's back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use identity::{IdentityType, ObservedIdentity, TrustPolicy};
//! use trust::{AutoPrompter, TrustService, TrustStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(TrustStore::with_default_path());
//!     store.load()?;
//!
//!     let service = TrustService::new(store, AutoPrompter::accepting());
//!
//!     // Produced by the TLS/SSH handshake layer.
//!     let observed = ObservedIdentity::new("example.com", 443, IdentityType::Tls, "aabbcc");
//!
//!     match service.verify(&observed, TrustPolicy::Tofu, None).await {
//!         Ok(()) => { /* proceed with the connection */ }
//!         Err(reason) => eprintln!("connection aborted: {reason}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration loading and defaults
//! - [`store`]: persistent keyed storage of trust records
//! - [`verifier`]: pure policy decision table
//! - [`prompt`]: human-confirmation state machine and decision port
//! - [`service`]: connection gating with per-endpoint serialization

pub mod config;
pub mod prompt;
pub mod service;
pub mod store;
pub mod verifier;

// Re-export identity for convenience
pub use identity;

// Re-export config types for convenience
pub use config::Config;

// Re-export store types for convenience
pub use store::{default_store_path, RecordKey, TrustRecord, TrustStore};

// Re-export prompt types for convenience
pub use prompt::{
    AutoPrompter, PromptOutcome, PromptRequest, PromptResponse, PromptState, PromptStateError,
    TrustPrompt, TrustPrompter,
};

// Re-export service types for convenience
pub use service::TrustService;
