// crates/repo-authz-config/src/lib.rs
// ============================================================================
// Module: Repo Authz Config Library
// Description: Configuration model, validation, and state reload.
// Purpose: Single source of truth for repo-authz.toml semantics.
// Dependencies: repo-authz-core, repo-authz-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `repo-authz-config` defines the configuration model for the repository
//! visibility engine. Loading is strict and fails closed; a validated config
//! can be published into a shared [`repo_authz_core::AuthzState`] at any time
//! to reload policy without restarting.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
