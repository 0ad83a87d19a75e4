// crates/repo-authz-cli/src/seed.rs
// ============================================================================
// Module: Store Seed Documents
// Description: JSON seed format for populating the SQLite store.
// Purpose: Load users, services, repositories, and permission sets in one pass.
// Dependencies: repo-authz-core, repo-authz-store-sqlite, serde
// ============================================================================

//! ## Overview
//! A seed document lists the rows the decision engine consumes. Import is
//! ordered so that services exist before the repositories that reference
//! them; every row is an upsert, so re-importing a document is idempotent.
//! The whole document is written in one transaction, so a rejected row
//! leaves the store untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use repo_authz_core::PermissionRecord;
use repo_authz_core::Repo;
use repo_authz_core::RepoId;
use repo_authz_core::Timestamp;
use repo_authz_core::UserId;
use repo_authz_core::UserRecord;
use repo_authz_store_sqlite::ExternalService;
use repo_authz_store_sqlite::SqliteAuthzStore;
use repo_authz_store_sqlite::SqliteStoreError;
use serde::Deserialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Rows to import into the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SeedDocument {
    /// Users.
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Code host connections.
    #[serde(default)]
    pub external_services: Vec<ExternalService>,
    /// Repositories with their sources.
    #[serde(default)]
    pub repos: Vec<Repo>,
    /// Explicit repository read permissions.
    #[serde(default)]
    pub permissions: Vec<SeedPermissions>,
}

/// Repository read permissions for one user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SeedPermissions {
    /// User the permissions belong to.
    pub user_id: UserId,
    /// Readable repositories.
    pub repo_ids: BTreeSet<RepoId>,
}

/// Counts of imported rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    /// Users written.
    pub users: usize,
    /// Services written.
    pub external_services: usize,
    /// Repositories written.
    pub repos: usize,
    /// Permission sets written.
    pub permissions: usize,
}

// ============================================================================
// SECTION: Import
// ============================================================================

impl SeedDocument {
    /// Writes every row of the document into `store` in one transaction.
    pub(crate) fn import(
        &self,
        store: &SqliteAuthzStore,
        now: Timestamp,
    ) -> Result<SeedSummary, SqliteStoreError> {
        store.write_batch(|writer| {
            for user in &self.users {
                writer.upsert_user(user)?;
            }
            for service in &self.external_services {
                writer.upsert_external_service(service)?;
            }
            for repo in &self.repos {
                writer.upsert_repo(repo)?;
            }
            for entry in &self.permissions {
                let record =
                    PermissionRecord::repo_read(entry.user_id, entry.repo_ids.clone(), now);
                writer.upsert_user_permissions(&record)?;
            }
            Ok(SeedSummary {
                users: self.users.len(),
                external_services: self.external_services.len(),
                repos: self.repos.len(),
                permissions: self.permissions.len(),
            })
        })
    }
}
