// crates/repo-authz-core/src/lib.rs
// ============================================================================
// Module: Repo Authz Core Library
// Description: Public API surface for the repository visibility engine.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Repo Authz decides which repositories an actor may read. The answer is a
//! [`RepoCondition`]: a small Boolean tree that can be evaluated against a
//! single record in-process or lowered into a storage query. Policy and the
//! provider registry are hot-swappable through [`AuthzState`]; permission
//! records and user attributes arrive through the [`PermissionStore`] and
//! [`UserDirectory`] interfaces.
//!
//! Every error path biases toward showing fewer repositories.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuthzProvider;
pub use interfaces::ExternalAccount;
pub use interfaces::ExternalRepoSpec;
pub use interfaces::ExternalUserPermissions;
pub use interfaces::PermissionStore;
pub use interfaces::ProviderError;
pub use interfaces::RepoStore;
pub use interfaces::StaticProvider;
pub use interfaces::StoreError;
pub use interfaces::UserDirectory;
pub use interfaces::UserRecord;
pub use runtime::AccessDecisionEngine;
pub use runtime::AuditActor;
pub use runtime::AuthzError;
pub use runtime::AuthzSnapshot;
pub use runtime::AuthzState;
pub use runtime::BindId;
pub use runtime::Decision;
pub use runtime::DecisionAuditEvent;
pub use runtime::DecisionAuditSink;
pub use runtime::DecisionBranch;
pub use runtime::DecisionOutcome;
pub use runtime::FileAuditSink;
pub use runtime::InMemoryAuthzStore;
pub use runtime::ListError;
pub use runtime::NoopAuditSink;
pub use runtime::PermissionsUserMapping;
pub use runtime::PolicyConfig;
pub use runtime::ProviderSet;
pub use runtime::RepoLister;
pub use runtime::StderrAuditSink;
