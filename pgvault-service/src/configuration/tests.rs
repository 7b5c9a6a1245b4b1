use super::*;
use crate::connection::{
    ConnectionTestDispatcher, ConnectionTestResult, ConnectionTester, ProviderCredentials,
};
use crate::error::{ConflictKind, ServiceError};
use async_trait::async_trait;
use pgvault_core::config::ApprovalSettings;
use pgvault_core::repository::{InMemoryPgConfigurationStore, PgConfigurationStore};
use pgvault_core::types::{
    ApprovalStatus, ChangeType, ConnectionTestOutcome, PgConfiguration, PgConfigurationStatus,
    PgProvider, TenantId,
};
use pgvault_security::access::{Role, RoleSet};
use pgvault_security::keys::{CredentialCipher, KEY_SIZE, KeyRing};
use pgvault_security::tenant::{Principal, RequestContext, TenantContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// Accepts Toss credentials whose secret starts with `good`.
struct FakeToss;

#[async_trait]
impl ConnectionTester for FakeToss {
    fn name(&self) -> &'static str {
        "fake-toss"
    }

    fn supports(&self, provider: PgProvider) -> bool {
        provider == PgProvider::Toss
    }

    async fn test(&self, credentials: &ProviderCredentials) -> ConnectionTestResult {
        if credentials.secret_key.expose().starts_with("good") {
            ConnectionTestResult::success("ok")
        } else {
            ConnectionTestResult::failed("secret key rejected")
        }
    }
}

struct Harness {
    store: Arc<InMemoryPgConfigurationStore>,
    service: PgConfigurationService,
}

/// Succeeds once two tests are in flight at the same time.
struct PairedToss(Barrier);

#[async_trait]
impl ConnectionTester for PairedToss {
    fn name(&self) -> &'static str {
        "paired-toss"
    }

    fn supports(&self, provider: PgProvider) -> bool {
        provider == PgProvider::Toss
    }

    async fn test(&self, _credentials: &ProviderCredentials) -> ConnectionTestResult {
        self.0.wait().await;
        ConnectionTestResult::success("ok")
    }
}

fn harness_with(approval: ApprovalSettings) -> Harness {
    harness_with_tester(approval, Arc::new(FakeToss))
}

fn harness_with_tester(approval: ApprovalSettings, tester: Arc<dyn ConnectionTester>) -> Harness {
    let store = Arc::new(InMemoryPgConfigurationStore::new());
    let ring = KeyRing::new(1, [(1, [1u8; KEY_SIZE])]).unwrap();
    let dispatcher = ConnectionTestDispatcher::new(Duration::from_secs(2)).with_tester(tester);
    let service = PgConfigurationService::new(
        store.clone(),
        CredentialCipher::new(Arc::new(ring)),
        Arc::new(dispatcher),
        approval,
    );
    Harness { store, service }
}

fn harness() -> Harness {
    harness_with(ApprovalSettings::default())
}

fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

fn member(tenant_id: &str) -> RequestContext {
    RequestContext::new(
        TenantContext::for_tenant(tenant(tenant_id)),
        Some(Principal::new("alice", RoleSet::new().with(Role::TenantAdmin))),
    )
}

fn ops() -> RequestContext {
    RequestContext::new(
        TenantContext::for_tenant(tenant("internal")),
        Some(Principal::new("olivia", RoleSet::new().with(Role::Ops))),
    )
}

async fn create(
    h: &Harness,
    tenant_id: &str,
    provider: PgProvider,
    secret: &str,
) -> PgConfiguration {
    h.service
        .create(
            &member(tenant_id),
            &tenant(tenant_id),
            CreateConfigurationRequest::new(provider, "ck_test_1", secret),
        )
        .await
        .unwrap()
}

async fn change_types(h: &Harness, config: &PgConfiguration) -> Vec<ChangeType> {
    h.store
        .history(&config.config_id)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.change_type)
        .collect()
}

#[tokio::test]
async fn test_full_lifecycle_and_single_active() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good_sk").await;
    assert_eq!(config.status, PgConfigurationStatus::Pending);
    assert_eq!(config.approval_status, ApprovalStatus::Pending);
    assert!(config.api_key_encrypted.starts_with("v1::"));
    assert!(!config.secret_key_encrypted.contains("good_sk"));
    assert_eq!(config.display_name.as_deref(), Some("Toss Payments"));

    let approved = h
        .service
        .approve(&ops(), &config.config_id, ApproveRequest::default())
        .await
        .unwrap();
    assert_eq!(approved.approval_status, ApprovalStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("olivia"));
    assert_eq!(
        approved.last_connection_test.as_ref().map(|t| t.outcome),
        Some(ConnectionTestOutcome::Success)
    );

    let active = h.service.activate(&ops(), &config.config_id).await.unwrap();
    assert_eq!(active.status, PgConfigurationStatus::Active);

    let err = h
        .service
        .create(
            &member("t1"),
            &tenant("t1"),
            CreateConfigurationRequest::new(PgProvider::Toss, "ck", "sk"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict {
            kind: ConflictKind::AlreadyActive,
            ..
        }
    ));

    assert_eq!(
        change_types(&h, &config).await,
        vec![ChangeType::Activated, ChangeType::Approved, ChangeType::Created]
    );
}

#[tokio::test]
async fn test_second_activation_hits_constraint() {
    let h = harness();
    let first = create(&h, "t1", PgProvider::Toss, "good_1").await;
    let second = create(&h, "t1", PgProvider::Toss, "good_2").await;
    for config in [&first, &second] {
        h.service
            .approve(&ops(), &config.config_id, ApproveRequest::default())
            .await
            .unwrap();
    }
    h.service.activate(&ops(), &first.config_id).await.unwrap();
    let err = h.service.activate(&ops(), &second.config_id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict {
            kind: ConflictKind::AlreadyActive,
            ..
        }
    ));
    assert_eq!(change_types(&h, &second).await.len(), 2);
}

#[tokio::test]
async fn test_tenant_isolation() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good").await;

    let err = h
        .service
        .get_detail(&member("t2"), &tenant("t1"), &config.config_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied { .. }));

    // Foreign id under the caller's own tenant path.
    let err = h
        .service
        .delete(&member("t2"), &tenant("t2"), &config.config_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied { .. }));

    let detail = h
        .service
        .get_detail(&ops(), &tenant("t1"), &config.config_id)
        .await
        .unwrap();
    assert_eq!(detail.history.len(), 1);
}

#[tokio::test]
async fn test_missing_tenant_context_is_illegal_state() {
    let h = harness();
    let anonymous = RequestContext::default();
    let err = h
        .service
        .list(&anonymous, &tenant("t1"), ListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::IllegalState { .. }));
}

#[tokio::test]
async fn test_approval_and_rejection_are_ops_only() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good").await;
    let err = h
        .service
        .approve(&member("t1"), &config.config_id, ApproveRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied { .. }));
    let err = h
        .service
        .reject(&member("t1"), &config.config_id, RejectRequest::new("not allowed here"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied { .. }));
    assert_eq!(h.store.history_len(), 1);
}

#[tokio::test]
async fn test_reject_then_reapprove_conflicts() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good").await;

    let err = h
        .service
        .reject(&ops(), &config.config_id, RejectRequest::new("short"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation { .. }));

    let rejected = h
        .service
        .reject(&ops(), &config.config_id, RejectRequest::new("  merchant id does not match  "))
        .await
        .unwrap();
    assert_eq!(rejected.status, PgConfigurationStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("merchant id does not match"));

    for err in [
        h.service
            .approve(&ops(), &config.config_id, ApproveRequest::default())
            .await
            .unwrap_err(),
        h.service
            .reject(&ops(), &config.config_id, RejectRequest::new("rejecting twice now"))
            .await
            .unwrap_err(),
    ] {
        assert!(matches!(
            err,
            ServiceError::Conflict {
                kind: ConflictKind::InvalidTransition,
                ..
            }
        ));
    }
}

#[tokio::test]
async fn test_concurrent_approvals_have_one_winner() {
    let h = harness_with_tester(
        ApprovalSettings::default(),
        Arc::new(PairedToss(Barrier::new(2))),
    );
    let config = create(&h, "t1", PgProvider::Toss, "good").await;
    let ctx = ops();
    let tested = || ApproveRequest {
        test_connection: Some(true),
        note: None,
    };

    let (first, second) = tokio::join!(
        h.service.approve(&ctx, &config.config_id, tested()),
        h.service.approve(&ctx, &config.config_id, tested()),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let err = outcomes.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(
        err,
        ServiceError::Conflict {
            kind: ConflictKind::StaleVersion,
            ..
        }
    ));

    let stored = h.store.find_by_id(&config.config_id).await.unwrap().unwrap();
    assert_eq!(stored.approval_status, ApprovalStatus::Approved);
    assert_eq!(stored.version, config.version + 1);
    let approvals = change_types(&h, &config)
        .await
        .into_iter()
        .filter(|c| *c == ChangeType::Approved)
        .count();
    assert_eq!(approvals, 1);
}

#[tokio::test]
async fn test_activation_requires_approval() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good").await;
    let err = h.service.activate(&ops(), &config.config_id).await.unwrap_err();
    assert!(err.to_string().contains("only APPROVED"));

    let err = h.service.deactivate(&ops(), &config.config_id).await.unwrap_err();
    assert!(err.to_string().contains("only ACTIVE"));
}

#[tokio::test]
async fn test_failed_test_does_not_block_by_default() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "bad_sk").await;
    let approved = h
        .service
        .approve(&ops(), &config.config_id, ApproveRequest::default())
        .await
        .unwrap();
    assert_eq!(approved.approval_status, ApprovalStatus::Approved);
    assert_eq!(
        approved.last_connection_test.map(|t| t.outcome),
        Some(ConnectionTestOutcome::Failed)
    );
    // One write, one history row for the approval.
    assert_eq!(change_types(&h, &config).await, vec![ChangeType::Approved, ChangeType::Created]);
}

#[tokio::test]
async fn test_required_test_blocks_and_records_result() {
    let h = harness_with(ApprovalSettings {
        require_successful_test: true,
        ..ApprovalSettings::default()
    });
    let config = create(&h, "t1", PgProvider::Toss, "bad_sk").await;
    let err = h
        .service
        .approve(&ops(), &config.config_id, ApproveRequest::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("secret key rejected"));

    let stored = h.store.find_by_id(&config.config_id).await.unwrap().unwrap();
    assert_eq!(stored.approval_status, ApprovalStatus::Pending);
    assert_eq!(
        stored.last_connection_test.map(|t| t.outcome),
        Some(ConnectionTestOutcome::Failed)
    );
    assert_eq!(
        change_types(&h, &config).await,
        vec![ChangeType::ConnectionTested, ChangeType::Created]
    );
}

#[tokio::test]
async fn test_provider_without_tester() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Kakao, "good").await;
    let err = h
        .service
        .test_connection(&member("t1"), &tenant("t1"), &config.config_id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::UnsupportedProvider {
            provider: PgProvider::Kakao
        }
    );

    // Skipping the test lets operators approve providers without a tester.
    let approved = h
        .service
        .approve(
            &ops(),
            &config.config_id,
            ApproveRequest {
                test_connection: Some(false),
                note: Some("manually verified".to_string()),
            },
        )
        .await
        .unwrap();
    assert!(approved.last_connection_test.is_none());
}

#[tokio::test]
async fn test_connection_test_is_persisted() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good").await;
    let result = h
        .service
        .test_connection(&member("t1"), &tenant("t1"), &config.config_id)
        .await
        .unwrap();
    assert!(result.success);

    let stored = h.store.find_by_id(&config.config_id).await.unwrap().unwrap();
    assert_eq!(stored.version, config.version + 1);
    assert!(stored.last_connection_test.is_some());
    assert_eq!(change_types(&h, &config).await[0], ChangeType::ConnectionTested);
}

#[tokio::test]
async fn test_update_resets_approval_and_is_blocked_while_active() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good").await;
    h.service
        .approve(&ops(), &config.config_id, ApproveRequest::default())
        .await
        .unwrap();

    let updated = h
        .service
        .update(
            &member("t1"),
            &tenant("t1"),
            &config.config_id,
            UpdateConfigurationRequest {
                secret_key: Some("good_rotated".to_string()),
                ..UpdateConfigurationRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.approval_status, ApprovalStatus::Pending);
    assert!(updated.approved_by.is_none());
    let history = h.store.history(&config.config_id).await.unwrap();
    assert_eq!(history[0].change_type, ChangeType::Updated);
    let notes = history[0].notes.clone().unwrap_or_default();
    assert!(notes.contains("secret key changed"));
    assert!(!notes.contains("API key changed"));

    h.service
        .approve(&ops(), &config.config_id, ApproveRequest::default())
        .await
        .unwrap();
    h.service.activate(&ops(), &config.config_id).await.unwrap();
    let err = h
        .service
        .update(
            &member("t1"),
            &tenant("t1"),
            &config.config_id,
            UpdateConfigurationRequest::default(),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("deactivate it before editing"));
}

#[tokio::test]
async fn test_delete_hides_row_and_releases_active_slot() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good").await;
    h.service
        .approve(&ops(), &config.config_id, ApproveRequest::default())
        .await
        .unwrap();
    h.service.activate(&ops(), &config.config_id).await.unwrap();

    h.service
        .delete(&member("t1"), &tenant("t1"), &config.config_id)
        .await
        .unwrap();

    let err = h
        .service
        .get_detail(&member("t1"), &tenant("t1"), &config.config_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert!(
        h.service
            .list(&member("t1"), &tenant("t1"), ListQuery::default())
            .await
            .unwrap()
            .is_empty()
    );

    let stored = h.store.find_by_id(&config.config_id).await.unwrap().unwrap();
    assert!(stored.deleted);
    assert_eq!(stored.status, PgConfigurationStatus::Inactive);

    create(&h, "t1", PgProvider::Toss, "good_again").await;
}

#[tokio::test]
async fn test_active_lookup_and_payment_credentials() {
    let h = harness();
    let config = create(&h, "t1", PgProvider::Toss, "good_secret").await;
    assert!(
        h.service
            .active_configuration(&member("t1"), &tenant("t1"), PgProvider::Toss)
            .await
            .unwrap()
            .is_none()
    );

    h.service
        .approve(&ops(), &config.config_id, ApproveRequest::default())
        .await
        .unwrap();
    h.service.activate(&ops(), &config.config_id).await.unwrap();

    let active = h
        .service
        .active_configurations(&member("t1"), &tenant("t1"))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    let credentials = h
        .service
        .payment_credentials(&member("t1"), &tenant("t1"), PgProvider::Toss)
        .await
        .unwrap();
    assert_eq!(credentials.secret_key.expose(), "good_secret");
    assert_eq!(credentials.api_key.expose(), "ck_test_1");

    let err = h
        .service
        .payment_credentials(&member("t2"), &tenant("t1"), PgProvider::Toss)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied { .. }));
}

#[tokio::test]
async fn test_pending_queue_filters() {
    let h = harness();
    create(&h, "t1", PgProvider::Toss, "good").await;
    create(&h, "t1", PgProvider::Stripe, "good").await;
    let other = create(&h, "t2", PgProvider::Toss, "good").await;
    h.service
        .reject(&ops(), &other.config_id, RejectRequest::new("duplicate registration"))
        .await
        .unwrap();

    let all = h.service.list_pending_approvals(&ops(), None, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let toss = h
        .service
        .list_pending_approvals(&ops(), Some(&tenant("t1")), Some(PgProvider::Toss))
        .await
        .unwrap();
    assert_eq!(toss.len(), 1);

    let err = h
        .service
        .list_pending_approvals(&member("t1"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied { .. }));
}
