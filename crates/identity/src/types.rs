//! Core identity and trust types.
//!
//! These types are shared between the trust store, the verifier, and any
//! front-end presenting trust decisions. They carry no behavior beyond
//! construction and formatting; all decision logic lives in the trust crate.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// The kind of cryptographic identity an endpoint presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    /// A TLS certificate fingerprint.
    Tls,
    /// An SSH host key fingerprint.
    Ssh,
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tls => write!(f, "tls"),
            Self::Ssh => write!(f, "ssh"),
        }
    }
}

impl FromStr for IdentityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tls" => Ok(Self::Tls),
            "ssh" => Ok(Self::Ssh),
            other => Err(format!("unknown identity type: {other} (expected tls or ssh)")),
        }
    }
}

/// Whether a trust record is shared across all connections to an endpoint
/// or bound to one specific connection configuration.
///
/// A connection-scoped record, when present, takes precedence over a global
/// record for the same endpoint. This enables per-connection overrides of a
/// shared host, e.g. multiplexed services behind one address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Scope {
    /// Shared across all connections to the endpoint.
    Global,
    /// Bound to one connection configuration.
    Connection(String),
}

impl Scope {
    /// Returns the connection id for a connection-scoped record.
    pub fn connection_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Connection(id) => Some(id),
        }
    }

    /// Returns true for the global scope.
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Connection(id) => write!(f, "connection:{id}"),
        }
    }
}

/// The policy applied when verifying an observed endpoint identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicy {
    /// Trust on first use: silent once a fingerprint is known, prompt on
    /// anything novel or changed. Matches conventional SSH behavior.
    #[default]
    Tofu,
    /// Every connection requires fresh human confirmation, even against an
    /// already-trusted fingerprint.
    AlwaysAsk,
    /// Skip verification entirely; never blocks a connection, but history
    /// is still recorded for inspection.
    AlwaysTrust,
    /// Only pre-provisioned fingerprints are accepted; never auto-trusts
    /// and never prompts.
    Strict,
}

impl fmt::Display for TrustPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tofu => write!(f, "tofu"),
            Self::AlwaysAsk => write!(f, "always_ask"),
            Self::AlwaysTrust => write!(f, "always_trust"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for TrustPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tofu" => Ok(Self::Tofu),
            "always_ask" => Ok(Self::AlwaysAsk),
            "always_trust" => Ok(Self::AlwaysTrust),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown trust policy: {other} (expected tofu, always_ask, always_trust, or strict)"
            )),
        }
    }
}

/// An identity observed during a connection handshake.
///
/// Produced by the external TLS/SSH handshake layer once a raw
/// cryptographic identity has been reduced to a fingerprint string. This
/// subsystem never parses certificates or key blobs itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedIdentity {
    /// Endpoint hostname or address.
    pub host: String,
    /// Endpoint port.
    pub port: u16,
    /// Which kind of identity was presented.
    pub identity_type: IdentityType,
    /// The already-computed fingerprint, as supplied by the handshake layer.
    pub fingerprint: String,
}

impl ObservedIdentity {
    /// Creates an observed identity.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        identity_type: IdentityType,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            identity_type,
            fingerprint: fingerprint.into(),
        }
    }
}

/// The currently accepted fingerprint for an endpoint and when it was
/// first and most recently confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredIdentity {
    /// The accepted fingerprint.
    pub fingerprint: String,
    /// When this fingerprint was first accepted.
    pub first_seen: SystemTime,
    /// When this fingerprint was most recently confirmed.
    pub last_seen: SystemTime,
}

impl StoredIdentity {
    /// Creates a stored identity with both timestamps set to now.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            fingerprint: fingerprint.into(),
            first_seen: now,
            last_seen: now,
        }
    }

    /// Returns true if the timestamps satisfy `first_seen <= last_seen`.
    pub fn is_consistent(&self) -> bool {
        self.first_seen <= self.last_seen
    }
}

/// Why a prompt verdict was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptReason {
    /// No fingerprint is known for the endpoint yet (or the policy demands
    /// reconfirmation of a known one).
    FirstUse,
    /// The observed fingerprint differs from the stored one.
    Mismatch,
}

impl fmt::Display for PromptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstUse => write!(f, "first use"),
            Self::Mismatch => write!(f, "mismatch"),
        }
    }
}

/// Why a reject verdict was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Strict policy and no record has been provisioned for the endpoint.
    NoPreApprovedIdentity,
    /// The observed fingerprint differs from the stored one.
    IdentityMismatch,
}

/// The outcome of evaluating an observed identity against the applicable
/// policy and record.
///
/// `Prompt` carries the previously stored identity when one exists so a
/// front-end can show a side-by-side comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Proceed; the caller records or refreshes the identity.
    Accept,
    /// Abort the connection with the given reason.
    Reject(RejectReason),
    /// Human confirmation is required before proceeding.
    Prompt {
        /// First-use or mismatch framing for the prompt.
        reason: PromptReason,
        /// The previously stored identity, if any.
        stored: Option<StoredIdentity>,
    },
}
