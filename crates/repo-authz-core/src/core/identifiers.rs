// crates/repo-authz-core/src/core/identifiers.rs
// ============================================================================
// Module: Repo Authz Identifiers
// Description: Strongly typed identifiers for users, repos, and code hosts.
// Purpose: Keep numeric and string identities from being mixed up at call sites.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Numeric identifiers wrap [`NonZeroU64`] so that the "no user" and "no repo"
//! states are expressed with `Option` rather than a sentinel zero. String
//! identifiers are opaque and perform no normalization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Numeric Identifiers
// ============================================================================

/// Declares a non-zero numeric identifier newtype.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            #[doc = concat!("Creates a new ", $label, " identifier from a non-zero value.")]
            #[must_use]
            pub const fn new(id: NonZeroU64) -> Self {
                Self(id)
            }

            #[doc = concat!("Creates a ", $label, " identifier from a raw value.")]
            ///
            /// Returns `None` when `raw` is zero.
            #[must_use]
            pub const fn from_raw(raw: u64) -> Option<Self> {
                match NonZeroU64::new(raw) {
                    Some(value) => Some(Self(value)),
                    None => None,
                }
            }

            /// Returns the raw identifier value (always >= 1).
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.get().fmt(f)
            }
        }
    };
}

numeric_id!(
    /// Platform user identifier.
    UserId,
    "user"
);

numeric_id!(
    /// Repository identifier.
    RepoId,
    "repository"
);

numeric_id!(
    /// External service (code host connection) identifier.
    ExternalServiceId,
    "external service"
);

numeric_id!(
    /// Organization identifier.
    OrgId,
    "organization"
);

// ============================================================================
// SECTION: Provider Identity
// ============================================================================

/// Code host kind served by an authorization provider (e.g. `github`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceType(String);

impl ServiceType {
    /// Creates a new service type.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the service type as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Code host instance identifier, usually its base URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Creates a new service identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the service identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique resource name of a registered authorization provider.
///
/// # Invariants
/// - Registry key; two providers with the same URN are the same provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderUrn(String);

impl ProviderUrn {
    /// Creates a new provider URN.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derives the default URN for a service type/ID pair.
    #[must_use]
    pub fn for_service(service_type: &ServiceType, service_id: &ServiceId) -> Self {
        Self(format!("{}:{}", service_type.as_str(), service_id.as_str()))
    }

    /// Returns the URN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProviderUrn {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
