//! Pure identity verification.
//!
//! `evaluate` maps an observed identity, the applicable policy, and the
//! applicable stored record to a verdict. It never mutates the store; all
//! storage writes happen in the service after a verdict (or a resolved
//! prompt) says so.

use identity::{fingerprint, ObservedIdentity, PromptReason, RejectReason, TrustPolicy, Verdict};

use crate::store::TrustRecord;

/// Evaluates an observed identity against the applicable policy and record.
///
/// The policy match is exhaustive: adding a policy variant is a compile
/// error until its row of the decision table is written here.
pub fn evaluate(
    observed: &ObservedIdentity,
    policy: TrustPolicy,
    record: Option<&TrustRecord>,
) -> Verdict {
    let known = record.map(|r| {
        (
            fingerprint::matches(&r.identity.fingerprint, &observed.fingerprint),
            r.identity.clone(),
        )
    });

    match policy {
        // Strict never auto-trusts an unseen key; the record must have been
        // provisioned out of band.
        TrustPolicy::Strict => match known {
            None => Verdict::Reject(RejectReason::NoPreApprovedIdentity),
            Some((true, _)) => Verdict::Accept,
            Some((false, _)) => Verdict::Reject(RejectReason::IdentityMismatch),
        },

        // AlwaysTrust must never block a connection; the caller still
        // records the identity for later inspection.
        TrustPolicy::AlwaysTrust => Verdict::Accept,

        TrustPolicy::Tofu => match known {
            None => Verdict::Prompt {
                reason: PromptReason::FirstUse,
                stored: None,
            },
            Some((true, _)) => Verdict::Accept,
            Some((false, stored)) => Verdict::Prompt {
                reason: PromptReason::Mismatch,
                stored: Some(stored),
            },
        },

        // AlwaysAsk reconfirms even a matching fingerprint, but keeps
        // first-use framing distinct from mismatch framing.
        TrustPolicy::AlwaysAsk => match known {
            None => Verdict::Prompt {
                reason: PromptReason::FirstUse,
                stored: None,
            },
            Some((true, stored)) => Verdict::Prompt {
                reason: PromptReason::FirstUse,
                stored: Some(stored),
            },
            Some((false, stored)) => Verdict::Prompt {
                reason: PromptReason::Mismatch,
                stored: Some(stored),
            },
        },
    }
}
