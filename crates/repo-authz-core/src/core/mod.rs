// crates/repo-authz-core/src/core/mod.rs
// ============================================================================
// Module: Repo Authz Core Types
// Description: Data model shared by the engine and its collaborators.
// Purpose: Group identifiers, actors, repositories, permissions, and conditions.
// Dependencies: serde, smallvec
// ============================================================================

//! ## Overview
//! Plain data types. Nothing in this module performs I/O or reads global
//! state; the runtime module composes them into decisions.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod actor;
pub mod condition;
pub mod identifiers;
pub mod permissions;
pub mod repo;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actor::Actor;
pub use actor::ActorKind;
pub use condition::RepoCondition;
pub use condition::RepoPredicate;
pub use identifiers::ExternalServiceId;
pub use identifiers::OrgId;
pub use identifiers::ProviderUrn;
pub use identifiers::RepoId;
pub use identifiers::ServiceId;
pub use identifiers::ServiceType;
pub use identifiers::UserId;
pub use permissions::ObjectType;
pub use permissions::Permission;
pub use permissions::PermissionRecord;
pub use repo::Repo;
pub use repo::RepoPage;
pub use repo::RepoSource;
pub use repo::ReposListOptions;
pub use repo::SourceNamespace;
pub use time::Timestamp;
