// crates/repo-authz-core/src/runtime/mod.rs
// ============================================================================
// Module: Repo Authz Runtime
// Description: Policy state, decision engine, listing, and audit.
// Purpose: Turn policy and permission records into visibility decisions.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime components that operate on the core data model. The engine is
//! synchronous and runs on the caller's thread.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod engine;
pub mod lister;
pub mod state;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditActor;
pub use audit::DecisionAuditEvent;
pub use audit::DecisionAuditSink;
pub use audit::DecisionOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use engine::AccessDecisionEngine;
pub use engine::AuthzError;
pub use engine::Decision;
pub use engine::DecisionBranch;
pub use lister::ListError;
pub use lister::RepoLister;
pub use state::AuthzSnapshot;
pub use state::AuthzState;
pub use state::BindId;
pub use state::PermissionsUserMapping;
pub use state::PolicyConfig;
pub use state::ProviderSet;
pub use store::InMemoryAuthzStore;
