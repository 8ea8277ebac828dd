//! Error types for trust decisions.

use thiserror::Error;

/// Trust error type covering every way a connection attempt can be refused,
/// plus store persistence failures.
///
/// Every variant that aborts a connection carries a message suitable for
/// user-facing display verbatim; callers must not collapse these into a
/// generic "connection failed".
#[derive(Debug, Error)]
pub enum TrustError {
    /// Strict policy and no record has been provisioned for the endpoint.
    #[error("no pre-approved identity for {host}:{port}")]
    NoPreApprovedIdentity {
        /// Endpoint hostname.
        host: String,
        /// Endpoint port.
        port: u16,
    },

    /// The observed fingerprint differs from the stored one.
    #[error("identity mismatch for {host}:{port}")]
    IdentityMismatch {
        /// Endpoint hostname.
        host: String,
        /// Endpoint port.
        port: u16,
    },

    /// A first-use or reconfirmation prompt was explicitly rejected.
    #[error("identity for {host}:{port} declined by user")]
    TrustDeclined {
        /// Endpoint hostname.
        host: String,
        /// Endpoint port.
        port: u16,
    },

    /// The prompt was dismissed or the connection attempt torn down while
    /// a decision was pending. Treated identically to an explicit reject.
    #[error("trust prompt abandoned for {host}:{port}")]
    PromptAbandoned {
        /// Endpoint hostname.
        host: String,
        /// Endpoint port.
        port: u16,
    },

    /// The trust store file could not be read, written, or parsed.
    #[error("trust store persistence failed: {0}")]
    Persistence(String),
}

impl TrustError {
    /// Short reason code for log correlation.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NoPreApprovedIdentity { .. } => "no_pre_approved_identity",
            Self::IdentityMismatch { .. } => "identity_mismatch",
            Self::TrustDeclined { .. } => "trust_declined",
            Self::PromptAbandoned { .. } => "prompt_abandoned",
            Self::Persistence(_) => "persistence",
        }
    }
}

/// Result type alias for trust operations.
pub type Result<T> = std::result::Result<T, TrustError>;
