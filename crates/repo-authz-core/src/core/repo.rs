// crates/repo-authz-core/src/core/repo.rs
// ============================================================================
// Module: Repository Model
// Description: Repository records, their sources, and listing options.
// Purpose: Define the rows that visibility conditions are evaluated against.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`Repo`] never stores its own visibility. Visibility is always computed
//! fresh from a [`crate::RepoCondition`] so that stale flags cannot leak.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ExternalServiceId;
use crate::core::identifiers::OrgId;
use crate::core::identifiers::RepoId;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Owner of the external service through which a source was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SourceNamespace {
    /// Site-level external service.
    #[default]
    Site,
    /// External service owned by a user.
    User(UserId),
    /// External service owned by an organization.
    Org(OrgId),
}

/// One origin of a repository (an external service that syncs it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoSource {
    /// External service that added the repository.
    pub external_service_id: ExternalServiceId,
    /// Repository the source belongs to.
    pub repo_id: RepoId,
    /// Whether repositories from this service bypass permission checks.
    pub unrestricted: bool,
    /// Owner of the external service. Used by listing filters only.
    #[serde(default)]
    pub namespace: SourceNamespace,
}

// ============================================================================
// SECTION: Repositories
// ============================================================================

/// Repository record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Repo {
    /// Repository identifier.
    pub id: RepoId,
    /// Repository name (e.g. `github.com/acme/api`).
    pub name: String,
    /// Whether the repository is private on its code host.
    pub private: bool,
    /// Sources that added this repository.
    #[serde(default)]
    pub sources: Vec<RepoSource>,
}

impl Repo {
    /// Returns true when at least one source is unrestricted.
    #[must_use]
    pub fn has_unrestricted_source(&self) -> bool {
        self.sources.iter().any(|source| source.unrestricted)
    }

    /// Returns true when the record satisfies the caller-supplied filters.
    ///
    /// Authorization is not part of this check.
    #[must_use]
    pub fn matches_filters(&self, options: &ReposListOptions) -> bool {
        if let Some(needle) = &options.name_contains
            && !self.name.contains(needle.as_str())
        {
            return false;
        }
        if let Some(org_id) = options.org_id
            && !self.sources.iter().any(|source| source.namespace == SourceNamespace::Org(org_id))
        {
            return false;
        }
        if let Some(user_id) = options.user_id
            && !self.sources.iter().any(|source| source.namespace == SourceNamespace::User(user_id))
        {
            return false;
        }
        if let Some(service_id) = options.external_service_id
            && !self.sources.iter().any(|source| source.external_service_id == service_id)
        {
            return false;
        }
        true
    }
}

// ============================================================================
// SECTION: Listing
// ============================================================================

/// Caller-supplied listing filters and pagination.
///
/// Filters narrow the authorized set; none of them can widen it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReposListOptions {
    /// Substring the repository name must contain.
    #[serde(default)]
    pub name_contains: Option<String>,
    /// Only repositories added through an external service owned by this org.
    #[serde(default)]
    pub org_id: Option<OrgId>,
    /// Only repositories added through an external service owned by this user.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Only repositories added through this external service.
    #[serde(default)]
    pub external_service_id: Option<ExternalServiceId>,
    /// Maximum rows to return (all when unset).
    #[serde(default)]
    pub limit: Option<usize>,
    /// Rows to skip before the page starts.
    #[serde(default)]
    pub offset: usize,
}

/// One page of authorized repositories.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoPage {
    /// Repositories on this page, ordered by id.
    pub repos: Vec<Repo>,
    /// Number of authorized repositories matching the filters, ignoring pagination.
    pub total_count: usize,
}
