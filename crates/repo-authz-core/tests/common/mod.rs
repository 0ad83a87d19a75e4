// crates/repo-authz-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Shared fixtures for decision engine and listing tests.
// Purpose: Reduce duplication across integration tests for repo-authz-core.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use repo_authz_core::AccessDecisionEngine;
use repo_authz_core::AuthzProvider;
use repo_authz_core::AuthzState;
use repo_authz_core::DecisionAuditEvent;
use repo_authz_core::DecisionAuditSink;
use repo_authz_core::ExternalServiceId;
use repo_authz_core::InMemoryAuthzStore;
use repo_authz_core::ObjectType;
use repo_authz_core::OrgId;
use repo_authz_core::Permission;
use repo_authz_core::PermissionRecord;
use repo_authz_core::PermissionStore;
use repo_authz_core::PermissionsUserMapping;
use repo_authz_core::Repo;
use repo_authz_core::RepoCondition;
use repo_authz_core::RepoId;
use repo_authz_core::RepoSource;
use repo_authz_core::ServiceId;
use repo_authz_core::ServiceType;
use repo_authz_core::SourceNamespace;
use repo_authz_core::StaticProvider;
use repo_authz_core::StoreError;
use repo_authz_core::Timestamp;
use repo_authz_core::UserDirectory;
use repo_authz_core::UserId;
use repo_authz_core::UserRecord;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CINDY: u64 = 3;
pub const ADMIN: u64 = 4;

pub const PUBLIC_REPO: u64 = 1;
pub const ALICE_PRIVATE: u64 = 2;
pub const BOB_PRIVATE: u64 = 3;
pub const UNRESTRICTED_PRIVATE: u64 = 4;
pub const CINDY_ADDED: u64 = 5;

pub const SITE_SERVICE: u64 = 1;
pub const UNRESTRICTED_SERVICE: u64 = 2;
pub const CINDY_SERVICE: u64 = 3;
pub const ORG: u64 = 9;

pub fn user_id(raw: u64) -> UserId {
    UserId::from_raw(raw).expect("nonzero user id")
}

pub fn repo_id(raw: u64) -> RepoId {
    RepoId::from_raw(raw).expect("nonzero repo id")
}

pub fn service_id(raw: u64) -> ExternalServiceId {
    ExternalServiceId::from_raw(raw).expect("nonzero service id")
}

pub fn org_id(raw: u64) -> OrgId {
    OrgId::from_raw(raw).expect("nonzero org id")
}

pub fn ids(raw: &[u64]) -> BTreeSet<RepoId> {
    raw.iter().copied().map(repo_id).collect()
}

// ============================================================================
// SECTION: Records
// ============================================================================

pub fn source(
    service: u64,
    repo: u64,
    unrestricted: bool,
    namespace: SourceNamespace,
) -> RepoSource {
    RepoSource {
        external_service_id: service_id(service),
        repo_id: repo_id(repo),
        unrestricted,
        namespace,
    }
}

pub fn repo(id: u64, name: &str, private: bool, sources: Vec<RepoSource>) -> Repo {
    Repo {
        id: repo_id(id),
        name: name.to_string(),
        private,
        sources,
    }
}

pub fn user(id: u64, username: &str, site_admin: bool) -> UserRecord {
    UserRecord {
        id: user_id(id),
        username: username.to_string(),
        site_admin,
    }
}

pub fn record(user: u64, repos: &[u64]) -> PermissionRecord {
    PermissionRecord::repo_read(user_id(user), ids(repos), Timestamp::from_unix_millis(1_000))
}

/// Repositories used by most engine tests.
pub fn fixture_repos() -> Vec<Repo> {
    vec![
        repo(
            PUBLIC_REPO,
            "github.com/acme/public",
            false,
            vec![source(SITE_SERVICE, PUBLIC_REPO, false, SourceNamespace::Site)],
        ),
        repo(
            ALICE_PRIVATE,
            "github.com/acme/alice-private",
            true,
            vec![source(SITE_SERVICE, ALICE_PRIVATE, false, SourceNamespace::Org(org_id(ORG)))],
        ),
        repo(
            BOB_PRIVATE,
            "github.com/acme/bob-private",
            true,
            vec![source(SITE_SERVICE, BOB_PRIVATE, false, SourceNamespace::Site)],
        ),
        repo(
            UNRESTRICTED_PRIVATE,
            "github.com/acme/unrestricted-private",
            true,
            vec![
                source(SITE_SERVICE, UNRESTRICTED_PRIVATE, false, SourceNamespace::Site),
                source(UNRESTRICTED_SERVICE, UNRESTRICTED_PRIVATE, true, SourceNamespace::Site),
            ],
        ),
        repo(
            CINDY_ADDED,
            "github.com/cindy/added",
            true,
            vec![source(
                CINDY_SERVICE,
                CINDY_ADDED,
                false,
                SourceNamespace::User(user_id(CINDY)),
            )],
        ),
    ]
}

/// Store seeded with users, repositories, and permission records.
///
/// Alice can read her private repo, Bob his, Cindy has no record, and the
/// admin is a site administrator without a record.
pub fn seeded_store() -> InMemoryAuthzStore {
    let store = InMemoryAuthzStore::new();
    store.upsert_user(user(ALICE, "alice", false)).expect("alice");
    store.upsert_user(user(BOB, "bob", false)).expect("bob");
    store.upsert_user(user(CINDY, "cindy", false)).expect("cindy");
    store.upsert_user(user(ADMIN, "admin", true)).expect("admin");
    for repo in fixture_repos() {
        store.upsert_repo(repo).expect("repo");
    }
    store.upsert_user_permissions(&record(ALICE, &[ALICE_PRIVATE])).expect("alice perms");
    store.upsert_user_permissions(&record(BOB, &[BOB_PRIVATE])).expect("bob perms");
    store
}

// ============================================================================
// SECTION: Policy
// ============================================================================

pub fn github_provider() -> Arc<dyn AuthzProvider> {
    Arc::new(StaticProvider::new(
        ServiceType::new("github"),
        ServiceId::new("https://github.com/"),
    ))
}

pub fn gitlab_provider() -> Arc<dyn AuthzProvider> {
    Arc::new(StaticProvider::new(
        ServiceType::new("gitlab"),
        ServiceId::new("https://gitlab.com/"),
    ))
}

pub fn mapping(enabled: bool) -> PermissionsUserMapping {
    PermissionsUserMapping {
        enabled,
        ..PermissionsUserMapping::default()
    }
}

/// State with one code host provider registered.
pub fn provider_state() -> Arc<AuthzState> {
    let state = Arc::new(AuthzState::default());
    state.set_providers(false, vec![github_provider()]);
    state
}

/// State with the permissions user mapping enabled.
pub fn mapping_state() -> Arc<AuthzState> {
    let state = Arc::new(AuthzState::default());
    state.set_permissions_user_mapping(mapping(true));
    state
}

pub fn engine(
    state: &Arc<AuthzState>,
    store: &InMemoryAuthzStore,
) -> AccessDecisionEngine<InMemoryAuthzStore, InMemoryAuthzStore> {
    AccessDecisionEngine::new(Arc::clone(state), store.clone(), store.clone())
}

/// Repository ids of `repos` that satisfy `condition`.
pub fn visible(condition: &RepoCondition, repos: &[Repo]) -> BTreeSet<RepoId> {
    repos.iter().filter(|repo| condition.eval(repo)).map(|repo| repo.id).collect()
}

// ============================================================================
// SECTION: Collaborator Doubles
// ============================================================================

/// Store whose every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl PermissionStore for FailingStore {
    fn load_user_permissions(
        &self,
        _user_id: UserId,
        _object_type: ObjectType,
        _permission: Permission,
    ) -> Result<Option<PermissionRecord>, StoreError> {
        Err(StoreError::Store("database is locked".to_string()))
    }

    fn upsert_user_permissions(&self, _record: &PermissionRecord) -> Result<(), StoreError> {
        Err(StoreError::Store("database is locked".to_string()))
    }
}

impl UserDirectory for FailingStore {
    fn get_user(&self, _user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Err(StoreError::Io("connection reset".to_string()))
    }
}

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    pub events: Mutex<Vec<DecisionAuditEvent>>,
}

impl RecordingAuditSink {
    pub fn take(&self) -> Vec<DecisionAuditEvent> {
        std::mem::take(&mut *self.events.lock().expect("audit lock"))
    }
}

impl DecisionAuditSink for RecordingAuditSink {
    fn record(&self, event: &DecisionAuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }
}
