// crates/repo-authz-core/src/interfaces/mod.rs
// ============================================================================
// Module: Repo Authz Interfaces
// Description: Contracts for storage, user lookup, and code host providers.
// Purpose: Define the collaborator seams the decision engine depends on.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The engine consumes permission records and user flags through these
//! traits and never reaches storage directly. Implementations must fail
//! closed: an error is reported, never replaced with a permissive answer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ObjectType;
use crate::core::Permission;
use crate::core::PermissionRecord;
use crate::core::ProviderUrn;
use crate::core::RepoCondition;
use crate::core::RepoPage;
use crate::core::ReposListOptions;
use crate::core::ServiceId;
use crate::core::ServiceType;
use crate::core::UserId;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Storage collaborator errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure while reaching the store.
    #[error("store io error: {0}")]
    Io(String),
    /// Store backend reported an error (including lock timeouts).
    #[error("store error: {0}")]
    Store(String),
    /// Persisted data failed integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Persisted schema version is not supported.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Request or persisted data is invalid.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Permission Store
// ============================================================================

/// Read/write access to per-user permission records.
pub trait PermissionStore {
    /// Loads the record for the given key.
    ///
    /// `Ok(None)` means the user was never synced.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the record cannot be read.
    fn load_user_permissions(
        &self,
        user_id: UserId,
        object_type: ObjectType,
        permission: Permission,
    ) -> Result<Option<PermissionRecord>, StoreError>;

    /// Replaces the record for the record's key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the record cannot be written.
    fn upsert_user_permissions(&self, record: &PermissionRecord) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: User Directory
// ============================================================================

/// User attributes the engine needs for bypass decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    /// User identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Whether the user is a site administrator.
    pub site_admin: bool,
}

/// Lookup of platform users.
pub trait UserDirectory {
    /// Loads a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory cannot be read.
    fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError>;
}

// ============================================================================
// SECTION: Repo Store
// ============================================================================

/// Repository collection that can apply a visibility condition.
pub trait RepoStore {
    /// Lists repositories satisfying `condition` and the caller filters.
    ///
    /// Implementations must apply `condition` before pagination and order
    /// results by repository id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the collection cannot be read.
    fn list_repos(
        &self,
        condition: &RepoCondition,
        options: &ReposListOptions,
    ) -> Result<RepoPage, StoreError>;
}

// ============================================================================
// SECTION: Authorization Providers
// ============================================================================

/// Code host account linked to a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccount {
    /// Platform user owning the account.
    pub user_id: UserId,
    /// Code host kind.
    pub service_type: ServiceType,
    /// Code host instance.
    pub service_id: ServiceId,
    /// Account identifier on the code host.
    pub account_id: String,
}

/// Repository as identified on its code host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRepoSpec {
    /// Repository identifier on the code host.
    pub id: String,
    /// Code host kind.
    pub service_type: ServiceType,
    /// Code host instance.
    pub service_id: ServiceId,
}

/// Repositories a code host reports as accessible to one account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalUserPermissions {
    /// Code host repository identifiers.
    pub exact: Vec<String>,
}

/// Provider fetch errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider does not implement this fetch.
    #[error("provider operation unsupported: {0}")]
    Unsupported(String),
    /// The code host request failed.
    #[error("provider fetch failed: {0}")]
    Fetch(String),
}

/// Capability interface of one code host authorization integration.
///
/// The registry only uses the identity methods. The fetch methods belong to
/// the sync collaborator that writes [`PermissionRecord`]s.
pub trait AuthzProvider: Send + Sync {
    /// Code host kind served by this provider.
    fn service_type(&self) -> &ServiceType;

    /// Code host instance served by this provider.
    fn service_id(&self) -> &ServiceId;

    /// Registry key.
    fn urn(&self) -> &ProviderUrn;

    /// Fetches repositories accessible to a code host account.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the code host cannot be queried.
    fn fetch_user_perms(
        &self,
        account: &ExternalAccount,
    ) -> Result<ExternalUserPermissions, ProviderError>;

    /// Fetches code host accounts with access to a repository.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the code host cannot be queried.
    fn fetch_repo_perms(&self, repo: &ExternalRepoSpec) -> Result<Vec<String>, ProviderError>;
}

/// Identity-only provider declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticProvider {
    /// Code host kind.
    service_type: ServiceType,
    /// Code host instance.
    service_id: ServiceId,
    /// Registry key.
    urn: ProviderUrn,
}

impl StaticProvider {
    /// Creates a provider with the default URN for the service pair.
    #[must_use]
    pub fn new(service_type: ServiceType, service_id: ServiceId) -> Self {
        let urn = ProviderUrn::for_service(&service_type, &service_id);
        Self {
            service_type,
            service_id,
            urn,
        }
    }

    /// Returns a copy with an explicit URN.
    #[must_use]
    pub fn with_urn(mut self, urn: ProviderUrn) -> Self {
        self.urn = urn;
        self
    }
}

impl AuthzProvider for StaticProvider {
    fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    fn urn(&self) -> &ProviderUrn {
        &self.urn
    }

    fn fetch_user_perms(
        &self,
        _account: &ExternalAccount,
    ) -> Result<ExternalUserPermissions, ProviderError> {
        Err(ProviderError::Unsupported(format!("{} has no user permission sync", self.urn)))
    }

    fn fetch_repo_perms(&self, _repo: &ExternalRepoSpec) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Unsupported(format!("{} has no repo permission sync", self.urn)))
    }
}
