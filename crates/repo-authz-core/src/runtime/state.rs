// crates/repo-authz-core/src/runtime/state.rs
// ============================================================================
// Module: Authorization Policy State
// Description: Process-wide policy flags and provider registry.
// Purpose: Publish policy changes atomically to concurrent decision readers.
// Dependencies: crate::{core, interfaces}, serde
// ============================================================================

//! ## Overview
//! Policy flags and the provider set live together in one immutable
//! [`AuthzSnapshot`]. [`AuthzState`] holds the current snapshot behind a
//! read-write lock; readers clone the `Arc` and release the lock, writers
//! build a complete replacement and swap it in. A reader therefore never
//! observes a provider set from one update paired with flags from another.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;

use crate::core::ProviderUrn;
use crate::interfaces::AuthzProvider;

// ============================================================================
// SECTION: Policy Flags
// ============================================================================

/// Account attribute the permissions user mapping binds records to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindId {
    /// Bind by verified email address.
    #[default]
    Email,
    /// Bind by username.
    Username,
}

/// Permissions user mapping setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionsUserMapping {
    /// Whether platform-local permission records are authoritative.
    #[serde(default)]
    pub enabled: bool,
    /// Account attribute used by the sync collaborator.
    #[serde(default)]
    pub bind_id: BindId,
}

/// Global policy flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Visibility when no authorization source is configured.
    pub default_allow: bool,
    /// Whether site administrators are subject to permission checks.
    pub enforce_for_site_admins: bool,
    /// Alternate policy mode.
    pub permissions_user_mapping: PermissionsUserMapping,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_allow: true,
            enforce_for_site_admins: false,
            permissions_user_mapping: PermissionsUserMapping::default(),
        }
    }
}

// ============================================================================
// SECTION: Provider Set
// ============================================================================

/// Registered authorization providers keyed by URN.
#[derive(Clone, Default)]
pub struct ProviderSet {
    /// Providers keyed by URN.
    providers: BTreeMap<ProviderUrn, Arc<dyn AuthzProvider>>,
}

impl ProviderSet {
    /// Builds a set from providers. A later provider replaces an earlier one
    /// with the same URN.
    #[must_use]
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn AuthzProvider>>) -> Self {
        let providers =
            providers.into_iter().map(|provider| (provider.urn().clone(), provider)).collect();
        Self {
            providers,
        }
    }

    /// Returns true when no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Looks up a provider by URN.
    #[must_use]
    pub fn get(&self, urn: &ProviderUrn) -> Option<&Arc<dyn AuthzProvider>> {
        self.providers.get(urn)
    }

    /// Iterates providers in URN order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AuthzProvider>> {
        self.providers.values()
    }

    /// Iterates registered URNs in order.
    pub fn urns(&self) -> impl Iterator<Item = &ProviderUrn> {
        self.providers.keys()
    }
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable view of policy flags and providers.
#[derive(Debug, Clone, Default)]
pub struct AuthzSnapshot {
    /// Policy flags.
    pub policy: PolicyConfig,
    /// Registered providers.
    pub providers: ProviderSet,
}

impl AuthzSnapshot {
    /// Returns true when the mapping mode and providers are both active.
    #[must_use]
    pub fn has_mapping_conflict(&self) -> bool {
        self.policy.permissions_user_mapping.enabled && !self.providers.is_empty()
    }

    /// Returns true when some authorization source is configured.
    #[must_use]
    pub fn enforcement_active(&self) -> bool {
        self.policy.permissions_user_mapping.enabled || !self.providers.is_empty()
    }
}

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Hot-swappable authorization state shared by all decision engines.
#[derive(Debug, Default)]
pub struct AuthzState {
    /// Current snapshot.
    current: RwLock<Arc<AuthzSnapshot>>,
}

impl AuthzState {
    /// Creates state seeded with the given snapshot.
    #[must_use]
    pub fn new(snapshot: AuthzSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AuthzSnapshot> {
        // A poisoned lock still holds a complete snapshot: writers only assign.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Publishes a complete replacement snapshot.
    pub fn replace(&self, snapshot: AuthzSnapshot) {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    /// Replaces the provider set and the default-allow flag together.
    pub fn set_providers(
        &self,
        allow_access_by_default: bool,
        providers: impl IntoIterator<Item = Arc<dyn AuthzProvider>>,
    ) {
        let providers = ProviderSet::new(providers);
        self.update(|snapshot| {
            snapshot.policy.default_allow = allow_access_by_default;
            snapshot.providers = providers;
        });
    }

    /// Returns the current permissions user mapping setting.
    #[must_use]
    pub fn get_permissions_user_mapping(&self) -> PermissionsUserMapping {
        self.snapshot().policy.permissions_user_mapping
    }

    /// Replaces the permissions user mapping setting.
    pub fn set_permissions_user_mapping(&self, mapping: PermissionsUserMapping) {
        self.update(|snapshot| snapshot.policy.permissions_user_mapping = mapping);
    }

    /// Sets whether site administrators are subject to permission checks.
    pub fn set_enforce_for_site_admins(&self, enforce: bool) {
        self.update(|snapshot| snapshot.policy.enforce_for_site_admins = enforce);
    }

    /// Copies the current snapshot, applies `change`, and publishes the result
    /// while holding the write lock so concurrent writers do not lose updates.
    fn update(&self, change: impl FnOnce(&mut AuthzSnapshot)) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = AuthzSnapshot::clone(&**guard);
        change(&mut next);
        *guard = Arc::new(next);
    }
}
