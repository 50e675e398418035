//! End-to-end tenancy flows over the in-memory identity store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, Utc};
use serde_json::{Value, json};

use tenantgate_auth::{BcryptComparator, CredentialIssuer, Hs256TokenCodec, SecretComparator};
use tenantgate_core::{
    ApplicationId, ErrorKind, Pairing, Settings, Status, SubApplication, Tenant, TenantId, User,
    UserId,
};
use tenantgate_infra::{InMemoryIdentityStore, SeedConfig, SeedReport, seed_in_memory};
use tenantgate_tenancy::{AuthService, ConfigMode, ConfigResolver, IdentityStore, TenantResolver};

const SECRET: &str = "flow-test-secret";

struct Fixture {
    store: Arc<InMemoryIdentityStore>,
    report: SeedReport,
    auth: AuthService,
    resolver: TenantResolver,
    config: ConfigResolver,
}

fn obj(value: Value) -> Settings {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

async fn fixture() -> Fixture {
    let hasher = BcryptComparator::new(4);
    let seed = SeedConfig {
        admin_email: "admin@example.com".to_string(),
        admin_password: "correct horse".to_string(),
        ..SeedConfig::default()
    };
    let (store, report) = seed_in_memory(&hasher, &seed).await.unwrap();
    let store = Arc::new(store);
    let dyn_store: Arc<dyn IdentityStore> = store.clone();

    let issuer = CredentialIssuer::new(Arc::new(Hs256TokenCodec::new(SECRET)));
    let comparator: Arc<dyn SecretComparator> = Arc::new(hasher);

    Fixture {
        auth: AuthService::new(dyn_store.clone(), issuer, comparator),
        resolver: TenantResolver::new(dyn_store.clone()),
        config: ConfigResolver::new(dyn_store),
        store,
        report,
    }
}

/// A second tenant with defaults {x:0, y:2} paired to a fresh app "books"
/// with pairing settings {x:1}.
fn add_books_tenant(store: &InMemoryIdentityStore, pairing_status: Status) -> (TenantId, ApplicationId) {
    add_books_tenant_with(store, Status::Active, Status::Active, pairing_status)
}

fn add_books_tenant_with(
    store: &InMemoryIdentityStore,
    tenant_status: Status,
    app_status: Status,
    pairing_status: Status,
) -> (TenantId, ApplicationId) {
    let tenant = Tenant {
        id: TenantId::new(),
        name: "Books Ltd".to_string(),
        status: tenant_status,
        plan: "basic".to_string(),
        settings: obj(json!({"x": 0, "y": 2})),
    };
    let app = SubApplication {
        id: ApplicationId::new(),
        code: "books".to_string(),
        name: "Books".to_string(),
        status: app_status,
        path: None,
        url: Some("https://books.example.com".to_string()),
    };
    store.insert_tenant(tenant.clone()).unwrap();
    store.insert_application(app.clone()).unwrap();
    store
        .insert_pairing(Pairing {
            tenant_id: tenant.id,
            application_id: app.id,
            status: pairing_status,
            settings: obj(json!({"x": 1})),
        })
        .unwrap();
    (tenant.id, app.id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Login / verify
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_returns_token_and_summary() {
    let f = fixture().await;
    let response = f.auth.login("  Admin@Example.com ", "correct horse").await.unwrap();

    assert!(!response.token.is_empty());
    assert_eq!(response.user.email, "admin@example.com");
    assert_eq!(response.user.tenant_id, Some(f.report.tenant_id));
    assert_eq!(response.user.roles[0].name, "super_admin");
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let f = fixture().await;
    let unknown = f.auth.login("nobody@example.com", "correct horse").await.unwrap_err();
    let wrong = f.auth.login("admin@example.com", "wrong").await.unwrap_err();

    assert_eq!(unknown.kind(), ErrorKind::Unauthenticated);
    assert_eq!(wrong.kind(), ErrorKind::Unauthenticated);
    assert_eq!(unknown.message(), wrong.message());
}

#[tokio::test]
async fn inactive_user_cannot_log_in() {
    let f = fixture().await;
    let hash = BcryptComparator::new(4).hash("pw").unwrap();
    f.store
        .insert_user(User {
            id: UserId::new(),
            email: "gone@example.com".to_string(),
            name: "Gone".to_string(),
            tenant_id: Some(f.report.tenant_id),
            role_ids: vec![f.report.member_role],
            status: Status::Suspended,
            password_hash: hash,
        })
        .unwrap();

    let err = f.auth.login("gone@example.com", "pw").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

/// Counts comparisons; delegates to bcrypt.
struct CountingComparator {
    inner: BcryptComparator,
    calls: Arc<AtomicUsize>,
}

impl SecretComparator for CountingComparator {
    fn compare(&self, plaintext: &str, hash: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compare(plaintext, hash)
    }

    fn decoy_hash(&self) -> String {
        self.inner.decoy_hash()
    }
}

#[tokio::test]
async fn unknown_email_still_runs_a_comparison() {
    let f = fixture().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let comparator = CountingComparator {
        inner: BcryptComparator::new(4),
        calls: calls.clone(),
    };
    let auth = AuthService::new(
        f.store.clone(),
        CredentialIssuer::new(Arc::new(Hs256TokenCodec::new(SECRET))),
        Arc::new(comparator),
    );

    let err = auth.login("nobody@example.com", "correct horse").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    auth.login("admin@example.com", "wrong").await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn token_for_suspended_user_is_rejected() {
    let f = fixture().await;
    let suspended = User {
        id: UserId::new(),
        email: "paused@example.com".to_string(),
        name: "Paused".to_string(),
        tenant_id: Some(f.report.tenant_id),
        role_ids: vec![f.report.member_role],
        status: Status::Suspended,
        password_hash: String::new(),
    };
    f.store.insert_user(suspended.clone()).unwrap();
    let token = f.auth.issuer().issue(&suspended, &[], Utc::now()).unwrap().token;

    let err = f.auth.verify_auth(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert!(err.message().contains("not active"));
}

#[tokio::test]
async fn verify_auth_reports_live_permissions() {
    let f = fixture().await;
    let token = f.auth.login("admin@example.com", "correct horse").await.unwrap().token;

    let verified = f.auth.verify_auth(&token).await.unwrap();
    assert!(verified.permissions.contains(&"system:user:read".to_string()));
    assert!(verified.permissions.contains(&"app:crm:access".to_string()));
    let mut sorted = verified.permissions.clone();
    sorted.sort();
    assert_eq!(verified.permissions, sorted);
    assert_eq!(verified.tenant.unwrap().id, f.report.tenant_id);
}

#[tokio::test]
async fn expired_and_invalid_tokens_are_distinguishable() {
    let f = fixture().await;
    let token = f.auth.login("admin@example.com", "correct horse").await.unwrap().token;

    let expired = f
        .auth
        .verify_auth_at(&token, Utc::now() + Duration::days(8))
        .await
        .unwrap_err();
    let invalid = f.auth.verify_auth("not.a.token").await.unwrap_err();
    let missing = f.auth.verify_auth("  ").await.unwrap_err();

    for err in [&expired, &invalid, &missing] {
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }
    assert!(expired.message().contains("expired"));
    assert!(invalid.message().contains("invalid"));
    assert_ne!(expired.message(), invalid.message());
}

#[tokio::test]
async fn token_for_deleted_subject_is_rejected() {
    let f = fixture().await;
    let ghost = User {
        id: UserId::new(),
        email: "ghost@example.com".to_string(),
        name: "Ghost".to_string(),
        tenant_id: None,
        role_ids: vec![],
        status: Status::Active,
        password_hash: String::new(),
    };
    let token = f.auth.issuer().issue(&ghost, &[], Utc::now()).unwrap().token;

    let err = f.auth.verify_auth(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenant resolver
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_reaches_every_seeded_application() {
    let f = fixture().await;
    let apps = f.resolver.accessible_applications(f.report.admin_id).await.unwrap();
    let codes: Vec<_> = apps.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(codes, vec!["crm", "einvoice", "hr"]);
}

#[tokio::test]
async fn unknown_user_and_tenantless_user_reach_nothing() {
    let f = fixture().await;
    assert!(f.resolver.accessible_applications(UserId::new()).await.unwrap().is_empty());

    let loner = User {
        id: UserId::new(),
        email: "loner@example.com".to_string(),
        name: "Loner".to_string(),
        tenant_id: None,
        role_ids: vec![f.report.super_admin_role],
        status: Status::Active,
        password_hash: String::new(),
    };
    f.store.insert_user(loner.clone()).unwrap();
    assert!(f.resolver.accessible_applications(loner.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_active_tenants_skips_inactive_ones() {
    let f = fixture().await;
    f.store
        .insert_tenant(Tenant {
            id: TenantId::new(),
            name: "Closed".to_string(),
            status: Status::Inactive,
            plan: "free".to_string(),
            settings: Settings::new(),
        })
        .unwrap();

    let tenants = f.resolver.list_active_tenants().await.unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0].id, f.report.tenant_id);
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration resolver
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_and_standalone_modes() {
    let f = fixture().await;
    let (tenant_id, _) = add_books_tenant(&f.store, Status::Active);

    let merged = f.config.get_config("books", tenant_id, ConfigMode::Merge).await.unwrap();
    assert_eq!(merged.settings, obj(json!({"x": 1, "y": 2})));

    let standalone = f
        .config
        .get_config("books", tenant_id, ConfigMode::Standalone)
        .await
        .unwrap();
    assert_eq!(standalone.settings, obj(json!({"x": 1})));
    assert_eq!(standalone.application.code, "books");
}

#[tokio::test]
async fn update_merges_and_is_idempotent() {
    let f = fixture().await;
    let (tenant_id, _) = add_books_tenant(&f.store, Status::Active);

    let first = f
        .config
        .update_config("books", tenant_id, json!({"y": 9}))
        .await
        .unwrap();
    assert_eq!(first.settings, obj(json!({"x": 1, "y": 9})));

    let second = f
        .config
        .update_config("books", tenant_id, json!({"y": 9}))
        .await
        .unwrap();
    assert_eq!(first.settings, second.settings);

    let standalone = f
        .config
        .get_config("books", tenant_id, ConfigMode::Standalone)
        .await
        .unwrap();
    assert_eq!(standalone.settings, obj(json!({"x": 1, "y": 9})));
}

#[tokio::test]
async fn inactive_pairing_is_not_found() {
    let f = fixture().await;
    let (tenant_id, _) = add_books_tenant(&f.store, Status::Inactive);

    let err = f
        .config
        .get_config("books", tenant_id, ConfigMode::Merge)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = f
        .config
        .update_config("books", tenant_id, json!({"a": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn inactive_tenant_is_not_found() {
    let f = fixture().await;
    let (tenant_id, _) = add_books_tenant_with(&f.store, Status::Inactive, Status::Active, Status::Active);

    let err = f
        .config
        .get_config("books", tenant_id, ConfigMode::Merge)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), format!("tenant {tenant_id} is not active"));

    let err = f
        .config
        .update_config("books", tenant_id, json!({"a": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn inactive_application_is_not_found() {
    let f = fixture().await;
    let (tenant_id, _) = add_books_tenant_with(&f.store, Status::Active, Status::Inactive, Status::Active);

    let err = f
        .config
        .get_config("books", tenant_id, ConfigMode::Standalone)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "application books is not active");

    let err = f
        .config
        .update_config("books", tenant_id, json!({"a": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn unknown_tenant_and_unpaired_app_are_not_found() {
    let f = fixture().await;
    let err = f
        .config
        .get_config("crm", TenantId::new(), ConfigMode::Merge)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = f
        .config
        .get_config("books", f.report.tenant_id, ConfigMode::Merge)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn non_object_patch_and_blank_code_are_bad_requests() {
    let f = fixture().await;
    let err = f
        .config
        .update_config("crm", f.report.tenant_id, json!([1, 2]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = f
        .config
        .get_config("  ", f.report.tenant_id, ConfigMode::Merge)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}
