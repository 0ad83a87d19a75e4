// crates/repo-authz-core/src/runtime/store.rs
// ============================================================================
// Module: Repo Authz In-Memory Store
// Description: In-memory users, repositories, and permission records.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryAuthzStore`] implements every storage collaborator trait over
//! mutex-guarded maps. Clones share state, so one store can back the engine
//! and the lister at once. It is meant for tests and local demos.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::ObjectType;
use crate::core::Permission;
use crate::core::PermissionRecord;
use crate::core::Repo;
use crate::core::RepoCondition;
use crate::core::RepoId;
use crate::core::RepoPage;
use crate::core::ReposListOptions;
use crate::core::UserId;
use crate::interfaces::PermissionStore;
use crate::interfaces::RepoStore;
use crate::interfaces::StoreError;
use crate::interfaces::UserDirectory;
use crate::interfaces::UserRecord;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Key of a permission record.
type PermissionKey = (UserId, ObjectType, Permission);

/// Shared maps behind the store.
#[derive(Debug, Default)]
struct Tables {
    /// Users keyed by id.
    users: BTreeMap<UserId, UserRecord>,
    /// Repositories keyed by id.
    repos: BTreeMap<RepoId, Repo>,
    /// Permission records keyed by (user, object type, permission).
    permissions: BTreeMap<PermissionKey, PermissionRecord>,
}

/// In-memory authorization store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuthzStore {
    /// Tables protected by a mutex.
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryAuthzStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the store mutex is poisoned.
    pub fn upsert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.with_tables(|tables| {
            tables.users.insert(user.id, user);
        })
    }

    /// Inserts or replaces a repository.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when a source names another repository.
    pub fn upsert_repo(&self, repo: Repo) -> Result<(), StoreError> {
        if let Some(source) = repo.sources.iter().find(|source| source.repo_id != repo.id) {
            return Err(StoreError::Invalid(format!(
                "source for repo {} attached to repo {}",
                source.repo_id, repo.id
            )));
        }
        self.with_tables(|tables| {
            tables.repos.insert(repo.id, repo);
        })
    }

    /// Runs `f` with the tables locked.
    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| StoreError::Store("authz store mutex poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

impl PermissionStore for InMemoryAuthzStore {
    fn load_user_permissions(
        &self,
        user_id: UserId,
        object_type: ObjectType,
        permission: Permission,
    ) -> Result<Option<PermissionRecord>, StoreError> {
        let key = (user_id, object_type, permission);
        self.with_tables(|tables| tables.permissions.get(&key).cloned())
    }

    fn upsert_user_permissions(&self, record: &PermissionRecord) -> Result<(), StoreError> {
        let key = (record.user_id, record.object_type, record.permission);
        self.with_tables(|tables| {
            tables.permissions.insert(key, record.clone());
        })
    }
}

impl UserDirectory for InMemoryAuthzStore {
    fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.with_tables(|tables| tables.users.get(&user_id).cloned())
    }
}

impl RepoStore for InMemoryAuthzStore {
    fn list_repos(
        &self,
        condition: &RepoCondition,
        options: &ReposListOptions,
    ) -> Result<RepoPage, StoreError> {
        self.with_tables(|tables| {
            let matching: Vec<&Repo> = tables
                .repos
                .values()
                .filter(|repo| condition.eval(repo) && repo.matches_filters(options))
                .collect();
            let total_count = matching.len();
            let limit = options.limit.unwrap_or(usize::MAX);
            let repos =
                matching.into_iter().skip(options.offset).take(limit).cloned().collect();
            RepoPage {
                repos,
                total_count,
            }
        })
    }
}
