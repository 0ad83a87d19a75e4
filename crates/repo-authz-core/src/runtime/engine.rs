// crates/repo-authz-core/src/runtime/engine.rs
// ============================================================================
// Module: Access Decision Engine
// Description: Builds repository visibility conditions for an actor.
// Purpose: Compose bypass rules, global policy, and permission sets into one
//          fail-closed condition.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`AccessDecisionEngine`] is the single authority on repository visibility.
//! It reads one [`AuthzSnapshot`] per call, walks a fixed ordered decision
//! tree, and returns a [`RepoCondition`]. Collaborator failures never surface
//! as errors on this path; they shrink the result to what is visible without
//! the failed lookup and are reported through the audit sink.
//!
//! Branch order:
//! 1. permissions user mapping together with providers is a hard error
//! 2. internal actors see everything
//! 3. with no authorization source, the default policy applies
//! 4. site administrators see everything unless enforcement covers them
//! 5. authenticated users see what their permission record grants
//! 6. anonymous callers see only what needs no record

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::Actor;
use crate::core::ObjectType;
use crate::core::Permission;
use crate::core::RepoCondition;
use crate::core::RepoId;
use crate::core::UserId;
use crate::interfaces::PermissionStore;
use crate::interfaces::UserDirectory;
use crate::runtime::audit::DecisionAuditEvent;
use crate::runtime::audit::DecisionAuditSink;
use crate::runtime::audit::DecisionOutcome;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::state::AuthzSnapshot;
use crate::runtime::state::AuthzState;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Decision errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Permissions user mapping and code host providers are both enabled.
    #[error("permissions user mapping is enabled while an authorization provider is also enabled")]
    PermissionsUserMappingConflict,
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Branch of the decision tree that produced a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBranch {
    /// Trusted system caller.
    InternalBypass,
    /// No authorization source configured; default policy applies.
    DefaultPolicy,
    /// Site administrator exempt from enforcement.
    SiteAdminBypass,
    /// Authenticated user with code host permissions.
    UserPermissions,
    /// Authenticated user under the permissions user mapping.
    UserMapping,
    /// Anonymous caller with code host permissions enforced.
    Anonymous,
    /// Anonymous caller under the permissions user mapping.
    AnonymousMapping,
}

impl DecisionBranch {
    /// Returns the stable label for this branch.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InternalBypass => "internal_bypass",
            Self::DefaultPolicy => "default_policy",
            Self::SiteAdminBypass => "site_admin_bypass",
            Self::UserPermissions => "user_permissions",
            Self::UserMapping => "user_mapping",
            Self::Anonymous => "anonymous",
            Self::AnonymousMapping => "anonymous_mapping",
        }
    }
}

/// Condition together with the branch that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Branch taken.
    pub branch: DecisionBranch,
    /// Visibility condition.
    pub condition: RepoCondition,
}

/// Result of walking the tree before auditing.
struct Evaluation {
    /// Decision produced.
    decision: Decision,
    /// Collaborator failure absorbed along the way.
    degraded: Option<String>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Repository visibility decision engine.
///
/// # Invariants
/// - At most one user lookup and one permission lookup per decision.
/// - Decisions are never cached; each call reads the current snapshot.
pub struct AccessDecisionEngine<P, U> {
    /// Shared policy state.
    state: Arc<AuthzState>,
    /// Permission record source.
    permissions: P,
    /// User attribute source.
    users: U,
    /// Decision audit sink.
    audit: Arc<dyn DecisionAuditSink>,
}

impl<P, U> AccessDecisionEngine<P, U>
where
    P: PermissionStore,
    U: UserDirectory,
{
    /// Creates an engine that discards audit events.
    #[must_use]
    pub fn new(state: Arc<AuthzState>, permissions: P, users: U) -> Self {
        Self {
            state,
            permissions,
            users,
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Returns a copy of this engine that records decisions to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn DecisionAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the shared policy state.
    #[must_use]
    pub const fn state(&self) -> &Arc<AuthzState> {
        &self.state
    }

    /// Returns the permission record source.
    #[must_use]
    pub const fn permissions(&self) -> &P {
        &self.permissions
    }

    /// Builds the visibility condition for `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::PermissionsUserMappingConflict`] when the policy
    /// is inconsistent.
    pub fn decide(&self, actor: &Actor) -> Result<RepoCondition, AuthzError> {
        self.explain(actor).map(|decision| decision.condition)
    }

    /// Builds the visibility condition for `actor` and reports the branch.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::PermissionsUserMappingConflict`] when the policy
    /// is inconsistent.
    pub fn explain(&self, actor: &Actor) -> Result<Decision, AuthzError> {
        let snapshot = self.state.snapshot();
        match self.evaluate(&snapshot, actor) {
            Ok(evaluation) => {
                let outcome = DecisionOutcome::of(&evaluation.decision.condition);
                self.audit.record(&DecisionAuditEvent::new(
                    actor,
                    Some(evaluation.decision.branch),
                    outcome,
                    evaluation.degraded,
                ));
                Ok(evaluation.decision)
            }
            Err(err) => {
                self.audit.record(&DecisionAuditEvent::new(
                    actor,
                    None,
                    DecisionOutcome::Error,
                    Some(err.to_string()),
                ));
                Err(err)
            }
        }
    }

    /// Walks the decision tree against one snapshot.
    fn evaluate(&self, snapshot: &AuthzSnapshot, actor: &Actor) -> Result<Evaluation, AuthzError> {
        if snapshot.has_mapping_conflict() {
            return Err(AuthzError::PermissionsUserMappingConflict);
        }
        if actor.internal {
            let condition = RepoCondition::allow_all();
            return Ok(Evaluation::clean(DecisionBranch::InternalBypass, condition));
        }
        if !snapshot.enforcement_active() {
            let condition = if snapshot.policy.default_allow {
                RepoCondition::allow_all()
            } else {
                no_record_condition()
            };
            return Ok(Evaluation::clean(DecisionBranch::DefaultPolicy, condition));
        }

        let mapping = snapshot.policy.permissions_user_mapping.enabled;
        let Some(user_id) = actor.authenticated_user() else {
            return Ok(Evaluation::clean(anonymous_branch(mapping), anonymous_condition(mapping)));
        };

        let mut degraded = None;
        match self.users.get_user(user_id) {
            Ok(Some(user)) => {
                if user.site_admin && !snapshot.policy.enforce_for_site_admins {
                    return Ok(Evaluation::clean(
                        DecisionBranch::SiteAdminBypass,
                        RepoCondition::allow_all(),
                    ));
                }
            }
            Ok(None) => {
                return Ok(Evaluation {
                    decision: Decision {
                        branch: anonymous_branch(mapping),
                        condition: anonymous_condition(mapping),
                    },
                    degraded: Some(format!("user {user_id} not found")),
                });
            }
            Err(err) => degraded = Some(format!("user lookup failed: {err}")),
        }

        let ids = match self.load_repo_ids(user_id) {
            Ok(ids) => ids,
            Err(reason) => {
                degraded = Some(match degraded {
                    Some(previous) => format!("{previous}; {reason}"),
                    None => reason,
                });
                BTreeSet::new()
            }
        };
        let decision = if mapping {
            Decision {
                branch: DecisionBranch::UserMapping,
                condition: RepoCondition::id_in(ids),
            }
        } else {
            Decision {
                branch: DecisionBranch::UserPermissions,
                condition: RepoCondition::or(vec![
                    RepoCondition::public(),
                    RepoCondition::unrestricted_source(),
                    RepoCondition::id_in(ids),
                ]),
            }
        };
        Ok(Evaluation {
            decision,
            degraded,
        })
    }

    /// Loads the repository read set for a user. Absence yields an empty set.
    fn load_repo_ids(&self, user_id: UserId) -> Result<BTreeSet<RepoId>, String> {
        self.permissions
            .load_user_permissions(user_id, ObjectType::Repos, Permission::Read)
            .map(|record| record.map(|record| record.object_ids).unwrap_or_default())
            .map_err(|err| format!("permission lookup failed: {err}"))
    }
}

impl Evaluation {
    /// Wraps a decision that needed no collaborator.
    fn clean(branch: DecisionBranch, condition: RepoCondition) -> Self {
        Self {
            decision: Decision {
                branch,
                condition,
            },
            degraded: None,
        }
    }
}

// ============================================================================
// SECTION: Condition Builders
// ============================================================================

/// Visibility that needs no permission record.
fn no_record_condition() -> RepoCondition {
    RepoCondition::or(vec![RepoCondition::public(), RepoCondition::unrestricted_source()])
}

/// Branch label for a caller without a usable user id.
const fn anonymous_branch(mapping: bool) -> DecisionBranch {
    if mapping { DecisionBranch::AnonymousMapping } else { DecisionBranch::Anonymous }
}

/// Condition for a caller without a usable user id.
fn anonymous_condition(mapping: bool) -> RepoCondition {
    if mapping { RepoCondition::deny_all() } else { no_record_condition() }
}
