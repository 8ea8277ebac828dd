//! Connection-gating trust service.
//!
//! `TrustService` owns the read → evaluate → prompt → write sequence for a
//! connection attempt and serializes it per endpoint key, so two
//! simultaneous first-use connections to the same unseen host cannot both
//! decide "first use" and race to create divergent records. The verifier
//! itself is pure; only this sequence needs the critical section.

use std::sync::Arc;

use dashmap::DashMap;
use identity::{
    IdentityType, ObservedIdentity, PromptReason, RejectReason, Scope, TrustError, TrustPolicy,
    Verdict,
};
use tokio::sync::Mutex;

use crate::prompt::{PromptOutcome, PromptRequest, PromptResponse, TrustPrompt, TrustPrompter};
use crate::store::{TrustRecord, TrustStore};
use crate::verifier;

/// Per-endpoint lock key. Coarser than the record key on purpose: locking
/// per `(host, port, identity type)` also covers a connection-scoped
/// attempt reading a global record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EndpointKey {
    host: String,
    port: u16,
    identity_type: IdentityType,
}

/// Gates connection attempts on the trust store and policy.
///
/// One service instance is shared by all connection attempts; prompts for
/// unrelated endpoints proceed independently, while attempts against the
/// same endpoint wait for the pending decision.
pub struct TrustService<P: TrustPrompter> {
    store: Arc<TrustStore>,
    prompter: P,
    locks: DashMap<EndpointKey, Arc<Mutex<()>>>,
}

impl<P: TrustPrompter> TrustService<P> {
    /// Creates a service over the given store and prompter.
    pub fn new(store: Arc<TrustStore>, prompter: P) -> Self {
        Self {
            store,
            prompter,
            locks: DashMap::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<TrustStore> {
        &self.store
    }

    /// Verifies an observed identity against the applicable policy and
    /// record, prompting the human when the verdict demands it.
    ///
    /// `Ok(())` means the connection may proceed; the store has been
    /// updated (or refreshed) with the accepted identity. Any `Err` means
    /// the attempt must be aborted, with a typed reason suitable for
    /// user-facing display. The store is never mutated on a reject path.
    pub async fn verify(
        &self,
        observed: &ObservedIdentity,
        policy: TrustPolicy,
        connection_id: Option<&str>,
    ) -> identity::Result<()> {
        let lock = self.endpoint_lock(observed);
        let _guard = lock.lock().await;

        let record = self.store.applicable_record(
            &observed.host,
            observed.port,
            observed.identity_type,
            connection_id,
        );
        let verdict = verifier::evaluate(observed, policy, record.as_ref());

        match verdict {
            Verdict::Accept => {
                self.record_identity(observed, record.as_ref(), connection_id)?;
                tracing::debug!(
                    host = %observed.host,
                    port = observed.port,
                    policy = %policy,
                    "Identity accepted"
                );
                Ok(())
            }

            Verdict::Reject(reason) => {
                let err = match reason {
                    RejectReason::NoPreApprovedIdentity => TrustError::NoPreApprovedIdentity {
                        host: observed.host.clone(),
                        port: observed.port,
                    },
                    RejectReason::IdentityMismatch => TrustError::IdentityMismatch {
                        host: observed.host.clone(),
                        port: observed.port,
                    },
                };
                tracing::warn!(
                    host = %observed.host,
                    port = observed.port,
                    policy = %policy,
                    reason = err.reason_code(),
                    "Identity rejected"
                );
                Err(err)
            }

            Verdict::Prompt { reason, stored } => {
                let request = PromptRequest {
                    reason,
                    received: observed.clone(),
                    stored,
                };

                let mut gate = TrustPrompt::new();
                // A fresh prompt is always idle; a refused transition can
                // only resolve as reject, never as trust.
                let response = match gate.show(request.clone()) {
                    Ok(()) => self.prompter.present(&request).await,
                    Err(_) => PromptResponse::Dismissed,
                };
                let outcome = gate.resolve(response).unwrap_or(PromptOutcome::Rejected);

                match outcome {
                    PromptOutcome::Accepted => {
                        self.record_identity(observed, record.as_ref(), connection_id)?;
                        tracing::info!(
                            host = %observed.host,
                            port = observed.port,
                            reason = %reason,
                            "Identity accepted by user"
                        );
                        Ok(())
                    }
                    PromptOutcome::Rejected => {
                        let err = match (response, reason) {
                            (PromptResponse::Dismissed, _) => TrustError::PromptAbandoned {
                                host: observed.host.clone(),
                                port: observed.port,
                            },
                            (_, PromptReason::Mismatch) => TrustError::IdentityMismatch {
                                host: observed.host.clone(),
                                port: observed.port,
                            },
                            (_, PromptReason::FirstUse) => TrustError::TrustDeclined {
                                host: observed.host.clone(),
                                port: observed.port,
                            },
                        };
                        tracing::warn!(
                            host = %observed.host,
                            port = observed.port,
                            reason = err.reason_code(),
                            "Identity rejected by user"
                        );
                        Err(err)
                    }
                }
            }
        }
    }

    /// Lists the records visible to a connection (management surface).
    pub fn records(&self, connection_id: Option<&str>) -> identity::Result<Vec<TrustRecord>> {
        self.store
            .all_records(connection_id)
            .map_err(persistence_error)
    }

    /// Removes one record (management surface). Removing an absent key is
    /// a no-op.
    pub fn remove(
        &self,
        host: &str,
        port: u16,
        identity_type: IdentityType,
        connection_id: Option<&str>,
    ) -> identity::Result<bool> {
        self.store
            .remove(host, port, identity_type, connection_id)
            .map_err(persistence_error)
    }

    /// Clears all records in a scope (management surface).
    pub fn clear(&self, connection_id: Option<&str>) -> identity::Result<usize> {
        self.store.clear(connection_id).map_err(persistence_error)
    }

    /// Updates a record's display label (management surface).
    pub fn set_nickname(
        &self,
        host: &str,
        port: u16,
        identity_type: IdentityType,
        nickname: Option<&str>,
        connection_id: Option<&str>,
    ) -> identity::Result<bool> {
        self.store
            .set_nickname(host, port, identity_type, nickname, connection_id)
            .map_err(persistence_error)
    }

    /// Writes the accepted identity into the scope it was resolved
    /// against: the applicable record's own scope when one existed, else
    /// the connection scope when a connection id was supplied, else
    /// global.
    fn record_identity(
        &self,
        observed: &ObservedIdentity,
        applicable: Option<&TrustRecord>,
        connection_id: Option<&str>,
    ) -> identity::Result<()> {
        let scope = match applicable {
            Some(record) => record.scope.clone(),
            None => match connection_id {
                Some(id) => Scope::Connection(id.to_string()),
                None => Scope::Global,
            },
        };

        self.store
            .upsert(
                &observed.host,
                observed.port,
                observed.identity_type,
                &observed.fingerprint,
                scope,
            )
            .map(|_| ())
            .map_err(persistence_error)
    }

    fn endpoint_lock(&self, observed: &ObservedIdentity) -> Arc<Mutex<()>> {
        let key = EndpointKey {
            host: observed.host.clone(),
            port: observed.port,
            identity_type: observed.identity_type,
        };
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn persistence_error(err: anyhow::Error) -> TrustError {
    TrustError::Persistence(format!("{err:#}"))
}
