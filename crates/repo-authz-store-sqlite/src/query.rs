// crates/repo-authz-store-sqlite/src/query.rs
// ============================================================================
// Module: SQL Condition Lowering
// Description: Compiles visibility conditions into SQLite WHERE fragments.
// Purpose: Apply the same condition in the database that the engine evaluates
//          in-process.
// Dependencies: repo-authz-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! [`lower_condition`] turns a [`RepoCondition`] into a parameterized
//! fragment over the `repo` table. Fragments use anonymous `?` placeholders;
//! parameters are returned in placeholder order, so fragments compose by
//! concatenating SQL and appending parameters.
//!
//! Every fragment is parenthesized or atomic, so callers may combine it with
//! further predicates without re-associating operators.

// ============================================================================
// SECTION: Imports
// ============================================================================

use repo_authz_core::RepoCondition;
use repo_authz_core::RepoPredicate;
use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

// ============================================================================
// SECTION: Fragments
// ============================================================================

/// Source join shared by the unrestricted predicate.
const UNRESTRICTED_SOURCE_SQL: &str = "EXISTS (SELECT 1 FROM external_service_repos esr JOIN \
                                       external_services es ON es.id = esr.external_service_id \
                                       WHERE esr.repo_id = repo.id AND es.unrestricted = 1)";

/// Bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    /// Integer parameter.
    Int(i64),
    /// Text parameter.
    Text(String),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Int(value) => Ok(ToSqlOutput::from(*value)),
            Self::Text(value) => Ok(ToSqlOutput::from(value.as_str())),
        }
    }
}

/// Parameterized SQL boolean expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCondition {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<SqlParam>,
}

impl SqlCondition {
    /// Creates a fragment without parameters.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Joins fragments with `AND`.
    #[must_use]
    pub fn all(parts: Vec<Self>) -> Self {
        join(parts, " AND ", "TRUE")
    }
}

// ============================================================================
// SECTION: Lowering
// ============================================================================

/// Lowers a visibility condition into a `WHERE` fragment over `repo`.
#[must_use]
pub fn lower_condition(condition: &RepoCondition) -> SqlCondition {
    match condition {
        RepoCondition::Const(true) => SqlCondition::raw("TRUE"),
        RepoCondition::Const(false) => SqlCondition::raw("FALSE"),
        RepoCondition::Predicate(predicate) => lower_predicate(predicate),
        RepoCondition::Not(inner) => {
            let inner = lower_condition(inner);
            SqlCondition {
                sql: format!("(NOT {})", inner.sql),
                params: inner.params,
            }
        }
        RepoCondition::And(children) => {
            join(children.iter().map(|child| lower_condition(child)).collect(), " AND ", "TRUE")
        }
        RepoCondition::Or(children) => {
            join(children.iter().map(|child| lower_condition(child)).collect(), " OR ", "FALSE")
        }
    }
}

/// Lowers one leaf predicate.
fn lower_predicate(predicate: &RepoPredicate) -> SqlCondition {
    match predicate {
        RepoPredicate::Public => SqlCondition::raw("repo.private = 0"),
        RepoPredicate::UnrestrictedSource => SqlCondition::raw(UNRESTRICTED_SOURCE_SQL),
        RepoPredicate::IdIn(ids) => {
            let raw: Vec<u64> = ids.iter().map(|id| id.get()).collect();
            // Serializing a list of integers cannot fail; fall back to an empty set.
            let json = serde_json::to_string(&raw).unwrap_or_else(|_| "[]".to_string());
            SqlCondition {
                sql: "repo.id IN (SELECT value FROM json_each(?))".to_string(),
                params: vec![SqlParam::Text(json)],
            }
        }
    }
}

/// Joins fragments with `separator`, producing `empty` for no fragments.
fn join(parts: Vec<SqlCondition>, separator: &str, empty: &str) -> SqlCondition {
    if parts.is_empty() {
        return SqlCondition::raw(empty);
    }
    let mut sql = String::from("(");
    let mut params = Vec::new();
    for (idx, part) in parts.into_iter().enumerate() {
        if idx > 0 {
            sql.push_str(separator);
        }
        sql.push_str(&part.sql);
        params.extend(part.params);
    }
    sql.push(')');
    SqlCondition {
        sql,
        params,
    }
}
