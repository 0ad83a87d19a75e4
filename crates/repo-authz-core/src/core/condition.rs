// crates/repo-authz-core/src/core/condition.rs
// ============================================================================
// Module: Repo Visibility Conditions
// Description: Boolean algebra over repository visibility predicates.
// Purpose: Represent a visibility decision as data evaluable in-process or in SQL.
// Dependencies: crate::core::{identifiers, repo}, serde, smallvec
// ============================================================================

//! ## Overview
//! [`RepoCondition`] is the single output of the decision engine. The logical
//! operators are domain-agnostic; the [`RepoPredicate`] leaves are the only
//! place where repository semantics enter. Storage backends lower the same
//! tree into query fragments, so one definition drives both consumers.
//!
//! Empty `And` is satisfied and empty `Or` is unsatisfiable, matching the
//! usual identities.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::core::identifiers::RepoId;
use crate::core::repo::Repo;

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Atomic repository visibility predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ids", rename_all = "snake_case")]
pub enum RepoPredicate {
    /// `private = false`.
    Public,
    /// At least one source of the repository is unrestricted.
    UnrestrictedSource,
    /// Repository id is a member of the given set.
    IdIn(BTreeSet<RepoId>),
}

impl RepoPredicate {
    /// Evaluates the predicate against a single repository.
    #[must_use]
    pub fn eval(&self, repo: &Repo) -> bool {
        match self {
            Self::Public => !repo.private,
            Self::UnrestrictedSource => repo.has_unrestricted_source(),
            Self::IdIn(ids) => ids.contains(&repo.id),
        }
    }
}

impl fmt::Display for RepoPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("private = false"),
            Self::UnrestrictedSource => f.write_str("source.unrestricted = true"),
            Self::IdIn(ids) => {
                f.write_str("repo.id IN {")?;
                for (idx, id) in ids.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{id}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// ============================================================================
// SECTION: Condition Tree
// ============================================================================

/// Visibility condition tree produced by the decision engine.
///
/// # Invariants
/// - Structural equality is meaningful: the engine builds identical trees for
///   identical inputs, so callers may compare or cache them within a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoCondition {
    /// Constant outcome regardless of the repository.
    Const(bool),
    /// All children must hold. Short-circuits on the first failure.
    And(SmallVec<[Box<Self>; 4]>),
    /// At least one child must hold. Short-circuits on the first success.
    Or(SmallVec<[Box<Self>; 4]>),
    /// Inverts the child.
    Not(Box<Self>),
    /// Repository-specific leaf.
    Predicate(RepoPredicate),
}

impl RepoCondition {
    /// Evaluates the condition against a single repository.
    #[must_use]
    pub fn eval(&self, repo: &Repo) -> bool {
        match self {
            Self::Const(value) => *value,
            Self::Predicate(predicate) => predicate.eval(repo),
            Self::Not(condition) => !condition.eval(repo),
            Self::And(conditions) => conditions.iter().all(|condition| condition.eval(repo)),
            Self::Or(conditions) => conditions.iter().any(|condition| condition.eval(repo)),
        }
    }

    /// Returns true when the condition holds for every repository.
    ///
    /// Leaves are treated as unknown, so `false` does not imply the condition
    /// can ever fail.
    #[must_use]
    pub fn is_trivially_true(&self) -> bool {
        match self {
            Self::Const(value) => *value,
            Self::And(conditions) => conditions.iter().all(|c| c.is_trivially_true()),
            Self::Or(conditions) => conditions.iter().any(|c| c.is_trivially_true()),
            Self::Not(condition) => condition.is_trivially_false(),
            Self::Predicate(_) => false,
        }
    }

    /// Returns true when the condition fails for every repository.
    #[must_use]
    pub fn is_trivially_false(&self) -> bool {
        match self {
            Self::Const(value) => !*value,
            Self::And(conditions) => conditions.iter().any(|c| c.is_trivially_false()),
            Self::Or(conditions) => conditions.iter().all(|c| c.is_trivially_false()),
            Self::Not(condition) => condition.is_trivially_true(),
            Self::Predicate(_) => false,
        }
    }

    /// Returns the number of nodes in the tree.
    #[must_use]
    pub fn complexity(&self) -> usize {
        match self {
            Self::Const(_) | Self::Predicate(_) => 1,
            Self::Not(condition) => 1 + condition.complexity(),
            Self::And(conditions) | Self::Or(conditions) => {
                1 + conditions.iter().map(|c| c.complexity()).sum::<usize>()
            }
        }
    }
}

// ============================================================================
// SECTION: Constructor Helpers
// ============================================================================

impl RepoCondition {
    /// Condition that admits every repository.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self::Const(true)
    }

    /// Condition that admits no repository.
    #[must_use]
    pub const fn deny_all() -> Self {
        Self::Const(false)
    }

    /// Creates a logical AND of the given conditions.
    #[must_use]
    pub fn and(conditions: Vec<Self>) -> Self {
        Self::And(conditions.into_iter().map(Box::new).collect())
    }

    /// Creates a logical OR of the given conditions.
    #[must_use]
    pub fn or(conditions: Vec<Self>) -> Self {
        Self::Or(conditions.into_iter().map(Box::new).collect())
    }

    /// Creates a logical NOT of the given condition.
    #[must_use]
    pub fn negate(condition: Self) -> Self {
        Self::Not(Box::new(condition))
    }

    /// `private = false`.
    #[must_use]
    pub const fn public() -> Self {
        Self::Predicate(RepoPredicate::Public)
    }

    /// Some source of the repository is unrestricted.
    #[must_use]
    pub const fn unrestricted_source() -> Self {
        Self::Predicate(RepoPredicate::UnrestrictedSource)
    }

    /// Repository id is in `ids`.
    #[must_use]
    pub fn id_in(ids: impl IntoIterator<Item = RepoId>) -> Self {
        Self::Predicate(RepoPredicate::IdIn(ids.into_iter().collect()))
    }
}

impl std::ops::Not for RepoCondition {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::negate(self)
    }
}

impl fmt::Display for RepoCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(true) => f.write_str("TRUE"),
            Self::Const(false) => f.write_str("FALSE"),
            Self::Predicate(predicate) => predicate.fmt(f),
            Self::Not(condition) => write!(f, "NOT ({condition})"),
            Self::And(conditions) => write_joined(f, conditions, " AND ", "TRUE"),
            Self::Or(conditions) => write_joined(f, conditions, " OR ", "FALSE"),
        }
    }
}

/// Writes `(a SEP b SEP c)`, or `empty` when there are no children.
fn write_joined(
    f: &mut fmt::Formatter<'_>,
    conditions: &[Box<RepoCondition>],
    separator: &str,
    empty: &str,
) -> fmt::Result {
    if conditions.is_empty() {
        return f.write_str(empty);
    }
    f.write_str("(")?;
    for (idx, condition) in conditions.iter().enumerate() {
        if idx > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{condition}")?;
    }
    f.write_str(")")
}
