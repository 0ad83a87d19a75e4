// crates/repo-authz-store-sqlite/tests/common/mod.rs
// =============================================================================
// Module: SQLite Store Test Helpers
// Description: Shared fixtures for SQLite store integration tests.
// Purpose: Open temporary stores seeded with a small code host catalog.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use repo_authz_core::DecisionAuditEvent;
use repo_authz_core::DecisionAuditSink;
use repo_authz_core::ExternalServiceId;
use repo_authz_core::OrgId;
use repo_authz_core::PermissionRecord;
use repo_authz_core::PermissionStore;
use repo_authz_core::Repo;
use repo_authz_core::RepoId;
use repo_authz_core::RepoSource;
use repo_authz_core::SourceNamespace;
use repo_authz_core::Timestamp;
use repo_authz_core::UserId;
use repo_authz_core::UserRecord;
use repo_authz_store_sqlite::ExternalService;
use repo_authz_store_sqlite::SqliteAuthzStore;
use repo_authz_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const ADMIN: u64 = 3;

pub const PUBLIC_REPO: u64 = 10;
pub const ALICE_PRIVATE: u64 = 11;
pub const BOB_PRIVATE: u64 = 12;
pub const MIRRORED_PRIVATE: u64 = 13;

pub const SITE_SERVICE: u64 = 1;
pub const MIRROR_SERVICE: u64 = 2;
pub const ORG: u64 = 7;

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

pub fn service(id: u64, kind: &str, unrestricted: bool) -> ExternalService {
    ExternalService {
        id: service_id(id),
        kind: kind.to_string(),
        display_name: format!("{kind} #{id}"),
        unrestricted,
    }
}

pub fn source(service: u64, repo: u64, namespace: SourceNamespace) -> RepoSource {
    RepoSource {
        external_service_id: service_id(service),
        repo_id: repo_id(repo),
        unrestricted: false,
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
    PermissionRecord::repo_read(user_id(user), ids(repos), Timestamp::from_unix_millis(5_000))
}

// ============================================================================
// SECTION: Stores
// ============================================================================

/// Opens an empty store at `dir/authz.db`.
pub fn open_store(dir: &Path) -> SqliteAuthzStore {
    SqliteAuthzStore::new(&SqliteStoreConfig::new(dir.join("authz.db"))).expect("open store")
}

/// Repositories seeded by [`seeded_store`].
///
/// The mirror service is unrestricted, so the mirrored repository is visible
/// to everyone once enforcement is active.
pub fn fixture_repos() -> Vec<Repo> {
    vec![
        repo(
            PUBLIC_REPO,
            "github.com/acme/public",
            false,
            vec![source(SITE_SERVICE, PUBLIC_REPO, SourceNamespace::Site)],
        ),
        repo(
            ALICE_PRIVATE,
            "github.com/acme/alice-private",
            true,
            vec![source(SITE_SERVICE, ALICE_PRIVATE, SourceNamespace::Org(org_id(ORG)))],
        ),
        repo(
            BOB_PRIVATE,
            "github.com/bob/private",
            true,
            vec![source(SITE_SERVICE, BOB_PRIVATE, SourceNamespace::User(user_id(BOB)))],
        ),
        repo(
            MIRRORED_PRIVATE,
            "github.com/acme/mirrored",
            true,
            vec![
                source(SITE_SERVICE, MIRRORED_PRIVATE, SourceNamespace::Site),
                RepoSource {
                    unrestricted: true,
                    ..source(MIRROR_SERVICE, MIRRORED_PRIVATE, SourceNamespace::Site)
                },
            ],
        ),
    ]
}

/// Temporary store seeded with users, services, repositories, and records.
pub fn seeded_store() -> (TempDir, SqliteAuthzStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());
    store.upsert_user(&user(ALICE, "alice", false)).expect("alice");
    store.upsert_user(&user(BOB, "bob", false)).expect("bob");
    store.upsert_user(&user(ADMIN, "admin", true)).expect("admin");
    store.upsert_external_service(&service(SITE_SERVICE, "github", false)).expect("site");
    store.upsert_external_service(&service(MIRROR_SERVICE, "gitolite", true)).expect("mirror");
    for repo in fixture_repos() {
        store.upsert_repo(&repo).expect("repo");
    }
    store.upsert_user_permissions(&record(ALICE, &[ALICE_PRIVATE])).expect("alice perms");
    store.upsert_user_permissions(&record(BOB, &[BOB_PRIVATE])).expect("bob perms");
    (dir, store)
}

/// Repository ids of a listed page.
pub fn page_ids(repos: &[Repo]) -> Vec<RepoId> {
    repos.iter().map(|repo| repo.id).collect()
}

// ============================================================================
// SECTION: Audit
// ============================================================================

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
