//! End-to-end verification flow tests.
//!
//! These tests exercise complete flows through the service, store, prompt,
//! and verifier together:
//! - First-use acceptance under TOFU and silent repeat connections
//! - Strict policy with and without provisioned records
//! - Mismatch handling with side-by-side identities
//! - Scope precedence and scoped clearing
//! - Concurrent first-use serialization per endpoint

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use identity::{IdentityType, ObservedIdentity, PromptReason, Scope, TrustError, TrustPolicy};
use tempfile::TempDir;
use trust::prompt::{PromptRequest, PromptResponse, TrustPrompter};
use trust::{AutoPrompter, TrustService, TrustStore};

/// Prompter that collects every request it is shown, optionally pausing to
/// widen race windows.
#[derive(Clone)]
struct CollectingPrompter {
    response: PromptResponse,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<PromptRequest>>>,
}

impl CollectingPrompter {
    fn new(response: PromptResponse) -> Self {
        Self {
            response,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_delay(response: PromptResponse, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(response)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl TrustPrompter for CollectingPrompter {
    async fn present(&self, request: &PromptRequest) -> PromptResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response
    }
}

fn create_service<P: TrustPrompter>(temp_dir: &TempDir, prompter: P) -> TrustService<P> {
    let store = Arc::new(TrustStore::new(temp_dir.path().join("known_identities.json")));
    TrustService::new(store, prompter)
}

fn tls(host: &str, port: u16, fingerprint: &str) -> ObservedIdentity {
    ObservedIdentity::new(host, port, IdentityType::Tls, fingerprint)
}

// =============================================================================
// TOFU Flow Tests
// =============================================================================

#[tokio::test]
async fn test_tofu_first_use_then_silent_repeat() {
    let temp_dir = TempDir::new().unwrap();
    let prompter = CollectingPrompter::new(PromptResponse::Accepted);
    let service = create_service(&temp_dir, prompter.clone());

    // First connection: no record, human accepts "AA:BB:CC".
    let observed = tls("example.com", 443, "AA:BB:CC");
    service.verify(&observed, TrustPolicy::Tofu, None).await.unwrap();

    assert_eq!(prompter.calls(), 1);
    assert_eq!(prompter.requests()[0].reason, PromptReason::FirstUse);

    // The store now holds exactly one TLS record for the endpoint.
    let records = service.records(None).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity.fingerprint, "AA:BB:CC");
    assert_eq!(records[0].identity_type, IdentityType::Tls);

    // Second connection with the same fingerprint: accepted, no prompt.
    service.verify(&observed, TrustPolicy::Tofu, None).await.unwrap();
    assert_eq!(prompter.calls(), 1);
}

#[tokio::test]
async fn test_tofu_record_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("known_identities.json");

    {
        let store = Arc::new(TrustStore::new(&path));
        let service = TrustService::new(store, AutoPrompter::accepting());
        service
            .verify(&tls("example.com", 443, "AA"), TrustPolicy::Tofu, None)
            .await
            .unwrap();
    }

    // A fresh service over the same file needs no prompt.
    let store = Arc::new(TrustStore::new(&path));
    store.load().unwrap();
    let service = TrustService::new(store, AutoPrompter::rejecting());
    service
        .verify(&tls("example.com", 443, "AA"), TrustPolicy::Tofu, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mismatch_prompt_carries_old_and_new() {
    let temp_dir = TempDir::new().unwrap();
    let prompter = CollectingPrompter::new(PromptResponse::Rejected);
    let service = create_service(&temp_dir, prompter.clone());

    service
        .store()
        .upsert("ssh.internal", 22, IdentityType::Ssh, "OLD", Scope::Global)
        .unwrap();

    let observed = ObservedIdentity::new("ssh.internal", 22, IdentityType::Ssh, "NEW");
    let err = service
        .verify(&observed, TrustPolicy::Tofu, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TrustError::IdentityMismatch { .. }));

    let requests = prompter.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].reason, PromptReason::Mismatch);
    assert_eq!(requests[0].received.fingerprint, "NEW");
    assert_eq!(requests[0].stored.as_ref().unwrap().fingerprint, "OLD");

    // On reject the stored record remains "OLD".
    let record = service
        .store()
        .applicable_record("ssh.internal", 22, IdentityType::Ssh, None)
        .unwrap();
    assert_eq!(record.identity.fingerprint, "OLD");
}

// =============================================================================
// Strict Policy Tests
// =============================================================================

#[tokio::test]
async fn test_strict_unseen_endpoint_creates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let prompter = CollectingPrompter::new(PromptResponse::Accepted);
    let service = create_service(&temp_dir, prompter.clone());

    let err = service
        .verify(&tls("example.com", 443, "AA"), TrustPolicy::Strict, None)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "no pre-approved identity for example.com:443");
    assert_eq!(prompter.calls(), 0);
    assert!(service.store().is_empty().unwrap());
}

#[tokio::test]
async fn test_strict_provisioned_endpoint_connects() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(&temp_dir, AutoPrompter::rejecting());

    // Provision out of band, then verify under strict.
    service
        .store()
        .upsert("example.com", 443, IdentityType::Tls, "AA:BB", Scope::Global)
        .unwrap();
    service
        .verify(&tls("example.com", 443, "AABB"), TrustPolicy::Strict, None)
        .await
        .unwrap();

    // A changed key is rejected outright, no prompt offered.
    let err = service
        .verify(&tls("example.com", 443, "CCDD"), TrustPolicy::Strict, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TrustError::IdentityMismatch { .. }));
}

// =============================================================================
// AlwaysAsk / AlwaysTrust Tests
// =============================================================================

#[tokio::test]
async fn test_always_ask_reconfirms_known_identity() {
    let temp_dir = TempDir::new().unwrap();
    let prompter = CollectingPrompter::new(PromptResponse::Accepted);
    let service = create_service(&temp_dir, prompter.clone());

    let observed = tls("vault.internal", 8200, "AA");
    service.verify(&observed, TrustPolicy::AlwaysAsk, None).await.unwrap();
    service.verify(&observed, TrustPolicy::AlwaysAsk, None).await.unwrap();

    // Both connections prompted, even the one against a matching record.
    assert_eq!(prompter.calls(), 2);
    let requests = prompter.requests();
    assert_eq!(requests[1].reason, PromptReason::FirstUse);
    assert!(requests[1].stored.is_some());
}

#[tokio::test]
async fn test_always_trust_records_history_silently() {
    let temp_dir = TempDir::new().unwrap();
    let prompter = CollectingPrompter::new(PromptResponse::Rejected);
    let service = create_service(&temp_dir, prompter.clone());

    service
        .verify(&tls("dev.local", 443, "FIRST"), TrustPolicy::AlwaysTrust, None)
        .await
        .unwrap();
    service
        .verify(&tls("dev.local", 443, "SECOND"), TrustPolicy::AlwaysTrust, None)
        .await
        .unwrap();

    assert_eq!(prompter.calls(), 0);
    let record = service
        .store()
        .applicable_record("dev.local", 443, IdentityType::Tls, None)
        .unwrap();
    assert_eq!(record.identity.fingerprint, "SECOND");
}

// =============================================================================
// Scope Tests
// =============================================================================

#[tokio::test]
async fn test_connection_override_beats_global() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(&temp_dir, AutoPrompter::rejecting());

    service
        .store()
        .upsert("multiplex.example.com", 443, IdentityType::Tls, "SHARED", Scope::Global)
        .unwrap();
    service
        .store()
        .upsert(
            "multiplex.example.com",
            443,
            IdentityType::Tls,
            "SERVICE-A",
            Scope::Connection("conn-a".to_string()),
        )
        .unwrap();

    // conn-a verifies against its own override.
    service
        .verify(
            &tls("multiplex.example.com", 443, "SERVICE-A"),
            TrustPolicy::Tofu,
            Some("conn-a"),
        )
        .await
        .unwrap();

    // Everyone else verifies against the shared record.
    service
        .verify(
            &tls("multiplex.example.com", 443, "SHARED"),
            TrustPolicy::Tofu,
            Some("conn-b"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_clear_connection_leaves_other_scopes() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(&temp_dir, AutoPrompter::accepting());

    service
        .store()
        .upsert("a", 1, IdentityType::Tls, "FP", Scope::Global)
        .unwrap();
    service
        .store()
        .upsert("b", 2, IdentityType::Tls, "FP", Scope::Connection("conn-1".to_string()))
        .unwrap();
    service
        .store()
        .upsert("c", 3, IdentityType::Tls, "FP", Scope::Connection("conn-2".to_string()))
        .unwrap();

    assert_eq!(service.clear(Some("conn-1")).unwrap(), 1);

    assert_eq!(service.records(None).unwrap().len(), 1);
    assert_eq!(service.records(Some("conn-2")).unwrap().len(), 2);
    assert!(service.records(Some("conn-1")).unwrap().iter().all(|r| r.scope.is_global()));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test]
async fn test_concurrent_first_use_first_writer_wins() {
    let temp_dir = TempDir::new().unwrap();
    let prompter =
        CollectingPrompter::with_delay(PromptResponse::Accepted, Duration::from_millis(50));
    let service = Arc::new(create_service(&temp_dir, prompter.clone()));

    // Two simultaneous first-use connections to the same unseen endpoint,
    // presenting different fingerprints.
    let first = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .verify(&tls("racy.example.com", 443, "FP-A"), TrustPolicy::Tofu, None)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .verify(&tls("racy.example.com", 443, "FP-B"), TrustPolicy::Tofu, None)
                .await
        })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    // The first writer saw first-use; the second was serialized behind it
    // and saw a mismatch against the winner's fingerprint.
    let requests = prompter.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].reason, PromptReason::FirstUse);
    assert_eq!(requests[1].reason, PromptReason::Mismatch);
    assert_eq!(requests[1].stored.as_ref().unwrap().fingerprint, "FP-A");

    // No divergent records: one key, last accepted fingerprint.
    assert_eq!(service.store().len().unwrap(), 1);
}

#[tokio::test]
async fn test_unrelated_endpoints_do_not_block_each_other() {
    let temp_dir = TempDir::new().unwrap();
    let prompter =
        CollectingPrompter::with_delay(PromptResponse::Accepted, Duration::from_millis(50));
    let service = Arc::new(create_service(&temp_dir, prompter.clone()));

    let started = std::time::Instant::now();
    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .verify(&tls(&format!("host-{i}"), 443, "FP"), TrustPolicy::Tofu, None)
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Four prompts ran concurrently rather than one after another.
    assert_eq!(prompter.calls(), 4);
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(service.store().len().unwrap(), 4);
}
