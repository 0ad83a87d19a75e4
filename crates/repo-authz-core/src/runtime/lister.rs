// crates/repo-authz-core/src/runtime/lister.rs
// ============================================================================
// Module: Repo Lister
// Description: Authorized repository listing.
// Purpose: Join the decision engine with a repository store.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! [`RepoLister`] never lets a caller list repositories without a condition:
//! it asks the engine first and hands the condition to the store, which
//! applies it before any pagination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Actor;
use crate::core::RepoPage;
use crate::core::ReposListOptions;
use crate::interfaces::PermissionStore;
use crate::interfaces::RepoStore;
use crate::interfaces::StoreError;
use crate::interfaces::UserDirectory;
use crate::runtime::engine::AccessDecisionEngine;
use crate::runtime::engine::AuthzError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Listing errors.
#[derive(Debug, Error)]
pub enum ListError {
    /// The visibility decision failed.
    #[error(transparent)]
    Authz(#[from] AuthzError),
    /// The repository store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Lister
// ============================================================================

/// Lists repositories visible to an actor.
pub struct RepoLister<P, U, R> {
    /// Decision engine.
    engine: AccessDecisionEngine<P, U>,
    /// Repository collection.
    repos: R,
}

impl<P, U, R> RepoLister<P, U, R>
where
    P: PermissionStore,
    U: UserDirectory,
    R: RepoStore,
{
    /// Creates a lister.
    #[must_use]
    pub const fn new(engine: AccessDecisionEngine<P, U>, repos: R) -> Self {
        Self {
            engine,
            repos,
        }
    }

    /// Returns the decision engine.
    #[must_use]
    pub const fn engine(&self) -> &AccessDecisionEngine<P, U> {
        &self.engine
    }

    /// Lists repositories visible to `actor` that match `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError`] when the decision or the store fails.
    pub fn list(&self, actor: &Actor, options: &ReposListOptions) -> Result<RepoPage, ListError> {
        let condition = self.engine.decide(actor)?;
        Ok(self.repos.list_repos(&condition, options)?)
    }
}
