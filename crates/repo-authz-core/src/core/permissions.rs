// crates/repo-authz-core/src/core/permissions.rs
// ============================================================================
// Module: Permission Records
// Description: Per-user allow-sets synced from external code hosts.
// Purpose: Model the permission bitmap the engine consumes.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A [`PermissionRecord`] is the authoritative allow-set for one
//! (user, object type, permission) key. Records are written by a sync
//! collaborator and only read by the decision engine. A missing record and a
//! record with an empty set mean the same thing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RepoId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Kind of object a permission record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// Repositories.
    Repos,
}

impl ObjectType {
    /// Returns the persisted label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repos => "repos",
        }
    }

    /// Parses a persisted label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "repos" => Some(Self::Repos),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission level carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read access.
    Read,
}

impl Permission {
    /// Returns the persisted label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
        }
    }

    /// Parses a persisted label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Authoritative allow-set for a (user, object type, permission) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// User the record belongs to.
    pub user_id: UserId,
    /// Object type covered by the record.
    pub object_type: ObjectType,
    /// Permission granted on each listed object.
    pub permission: Permission,
    /// Accessible object identifiers.
    pub object_ids: BTreeSet<RepoId>,
    /// When the sync collaborator last wrote this record.
    pub updated_at: Timestamp,
}

impl PermissionRecord {
    /// Creates a repository read record.
    #[must_use]
    pub fn repo_read(
        user_id: UserId,
        object_ids: impl IntoIterator<Item = RepoId>,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            object_type: ObjectType::Repos,
            permission: Permission::Read,
            object_ids: object_ids.into_iter().collect(),
            updated_at,
        }
    }
}
