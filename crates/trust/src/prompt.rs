//! Human confirmation of ambiguous trust decisions.
//!
//! When the verifier returns a prompt verdict, a short-lived `TrustPrompt`
//! state machine presents the first-use or mismatch details to a human and
//! maps their choice back into a go/no-go signal. The human-facing surface
//! (dialog, CLI prompt, auto-policy for tests) is behind the
//! [`TrustPrompter`] trait so it can be swapped without touching trust
//! logic.

use identity::{ObservedIdentity, PromptReason, StoredIdentity};
use thiserror::Error;

/// Everything a front-end needs to render a trust prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    /// First-use or mismatch framing.
    pub reason: PromptReason,
    /// The newly observed identity.
    pub received: ObservedIdentity,
    /// The previously stored identity, for side-by-side comparison on a
    /// mismatch (or reconfirmation).
    pub stored: Option<StoredIdentity>,
}

/// The human's answer, as reported by a prompter implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    /// Explicitly accepted: record the identity and proceed.
    Accepted,
    /// Explicitly rejected: abort, store untouched.
    Rejected,
    /// Dismissed without choosing (window closed, attempt torn down).
    /// Absence of explicit trust is never interpreted as trust.
    Dismissed,
}

/// Terminal outcome of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The identity was explicitly accepted.
    Accepted,
    /// The identity was rejected (explicitly or by dismissal).
    Rejected,
}

/// Invalid state machine transitions.
#[derive(Debug, Error, PartialEq)]
pub enum PromptStateError {
    #[error("prompt already showing, cannot show again")]
    AlreadyShowing,

    #[error("prompt already resolved")]
    AlreadyResolved,

    #[error("prompt is not showing, nothing to resolve")]
    NotShowing,
}

/// State of a [`TrustPrompt`].
#[derive(Debug, Clone, PartialEq)]
pub enum PromptState {
    /// Created, nothing presented yet.
    Idle,
    /// Presented to the human, awaiting a decision.
    Showing,
    /// Terminal: decided.
    Resolved(PromptOutcome),
}

/// One prompt gating one connection attempt.
///
/// The machine moves `Idle → Showing → Resolved` and never backwards.
/// Exactly two terminal transitions exist, both driven by an explicit
/// human action; there is no timeout and no default. Concurrent unrelated
/// connection attempts use independent instances.
#[derive(Debug)]
pub struct TrustPrompt {
    state: PromptState,
    request: Option<PromptRequest>,
}

impl TrustPrompt {
    /// Creates an idle prompt.
    pub fn new() -> Self {
        Self {
            state: PromptState::Idle,
            request: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &PromptState {
        &self.state
    }

    /// The request being shown, if any.
    pub fn request(&self) -> Option<&PromptRequest> {
        self.request.as_ref()
    }

    /// Moves `Idle → Showing` with the details to present.
    pub fn show(&mut self, request: PromptRequest) -> Result<(), PromptStateError> {
        match self.state {
            PromptState::Idle => {
                self.request = Some(request);
                self.state = PromptState::Showing;
                Ok(())
            }
            PromptState::Showing => Err(PromptStateError::AlreadyShowing),
            PromptState::Resolved(_) => Err(PromptStateError::AlreadyResolved),
        }
    }

    /// Resolves a showing prompt with the human's response.
    ///
    /// Dismissal resolves as rejected.
    pub fn resolve(&mut self, response: PromptResponse) -> Result<PromptOutcome, PromptStateError> {
        match self.state {
            PromptState::Showing => {
                let outcome = match response {
                    PromptResponse::Accepted => PromptOutcome::Accepted,
                    PromptResponse::Rejected | PromptResponse::Dismissed => {
                        PromptOutcome::Rejected
                    }
                };
                self.state = PromptState::Resolved(outcome);
                Ok(outcome)
            }
            PromptState::Idle => Err(PromptStateError::NotShowing),
            PromptState::Resolved(_) => Err(PromptStateError::AlreadyResolved),
        }
    }

    /// Abandons the prompt because the owning connection attempt went away.
    /// Resolves as rejected; abandoning an already-resolved prompt is a
    /// no-op.
    pub fn abandon(&mut self) -> PromptOutcome {
        match self.state {
            PromptState::Resolved(outcome) => outcome,
            _ => {
                self.state = PromptState::Resolved(PromptOutcome::Rejected);
                PromptOutcome::Rejected
            }
        }
    }
}

impl Default for TrustPrompt {
    fn default() -> Self {
        Self::new()
    }
}

/// Decision port for presenting a trust prompt to a human.
///
/// Implementations must be thread-safe; each call gates exactly one
/// connection attempt and blocks only that attempt.
#[allow(async_fn_in_trait)]
pub trait TrustPrompter: Send + Sync {
    /// Presents the prompt and returns the human's response.
    async fn present(&self, request: &PromptRequest) -> PromptResponse;
}

/// Prompter that always returns a fixed response.
///
/// Useful in tests and for headless deployments where a policy decision
/// stands in for a human.
#[derive(Debug, Clone, Copy)]
pub struct AutoPrompter {
    response: PromptResponse,
}

impl AutoPrompter {
    /// Creates a prompter with a fixed response.
    pub fn new(response: PromptResponse) -> Self {
        Self { response }
    }

    /// Prompter that accepts everything.
    pub fn accepting() -> Self {
        Self::new(PromptResponse::Accepted)
    }

    /// Prompter that rejects everything.
    pub fn rejecting() -> Self {
        Self::new(PromptResponse::Rejected)
    }
}

impl TrustPrompter for AutoPrompter {
    async fn present(&self, _request: &PromptRequest) -> PromptResponse {
        self.response
    }
}
