// crates/repo-authz-store-sqlite/src/lib.rs
// ============================================================================
// Module: Repo Authz SQLite Store Library
// Description: Public API surface for the SQLite-backed authz store.
// Purpose: Expose the store, its configuration, and condition lowering.
// Dependencies: crate::{query, store}
// ============================================================================

//! ## Overview
//! `SQLite` persistence for users, repositories, and permission records, plus
//! the lowering of visibility conditions into `WHERE` fragments.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod query;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use query::SqlCondition;
pub use query::SqlParam;
pub use query::lower_condition;
pub use store::ExternalService;
pub use store::MAX_OBJECT_IDS_BYTES;
pub use store::SqliteAuthzStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteWriter;
pub use store::default_busy_timeout_ms;
