// crates/repo-authz-core/src/core/actor.rs
// ============================================================================
// Module: Actor
// Description: The identity on whose behalf a visibility decision is made.
// Purpose: Carry caller identity explicitly instead of through ambient state.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! An [`Actor`] is built once per request by the transport layer and passed
//! by reference into every call of the decision engine. It is never mutated.
//! Inconsistent states (authenticated without a user id) are representable on
//! purpose so the engine can degrade them to anonymous.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Actor
// ============================================================================

/// Request-scoped caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
    /// Trusted system-to-system caller (background jobs, migrations).
    pub internal: bool,
    /// Platform user id when known.
    pub user_id: Option<UserId>,
    /// Whether the transport authenticated the caller.
    pub authenticated: bool,
}

impl Actor {
    /// Returns the internal (system) actor.
    #[must_use]
    pub const fn internal() -> Self {
        Self {
            internal: true,
            user_id: None,
            authenticated: false,
        }
    }

    /// Returns an anonymous actor.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            internal: false,
            user_id: None,
            authenticated: false,
        }
    }

    /// Returns an authenticated user actor.
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            internal: false,
            user_id: Some(user_id),
            authenticated: true,
        }
    }

    /// Returns the user id only when the actor is authenticated and carries one.
    ///
    /// Authenticated actors without a user id yield `None` and are treated as
    /// anonymous by the engine.
    #[must_use]
    pub const fn authenticated_user(&self) -> Option<UserId> {
        if self.authenticated { self.user_id } else { None }
    }

    /// Returns the audit label for this actor.
    #[must_use]
    pub const fn kind(&self) -> ActorKind {
        if self.internal {
            ActorKind::Internal
        } else if self.authenticated_user().is_some() {
            ActorKind::User
        } else {
            ActorKind::Anonymous
        }
    }
}

/// Coarse actor classification used in audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Internal system caller.
    Internal,
    /// Authenticated user.
    User,
    /// Anonymous or degraded caller.
    Anonymous,
}
