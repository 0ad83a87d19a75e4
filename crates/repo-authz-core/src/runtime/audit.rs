// crates/repo-authz-core/src/runtime/audit.rs
// ============================================================================
// Module: Decision Audit Logging
// Description: Structured audit events for visibility decisions.
// Purpose: Emit JSON-lines decision records without a logging framework.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every call to the decision engine produces one [`DecisionAuditEvent`].
//! Events never carry permission sets or repository names, only the branch
//! taken and the shape of the outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::Actor;
use crate::core::ActorKind;
use crate::core::RepoCondition;
use crate::core::UserId;
use crate::runtime::engine::DecisionBranch;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Coarse classification of a decision result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Every repository is visible.
    AllowAll,
    /// Visibility depends on the repository.
    Conditional,
    /// No repository is visible.
    DenyAll,
    /// The decision failed.
    Error,
}

impl DecisionOutcome {
    /// Classifies a condition.
    #[must_use]
    pub fn of(condition: &RepoCondition) -> Self {
        if condition.is_trivially_true() {
            Self::AllowAll
        } else if condition.is_trivially_false() {
            Self::DenyAll
        } else {
            Self::Conditional
        }
    }
}

/// Actor summary recorded on audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditActor {
    /// Actor classification.
    pub kind: ActorKind,
    /// User identifier for authenticated actors.
    pub user_id: Option<UserId>,
}

impl From<&Actor> for AuditActor {
    fn from(actor: &Actor) -> Self {
        Self {
            kind: actor.kind(),
            user_id: actor.authenticated_user(),
        }
    }
}

/// Decision audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Decision branch taken, absent on error.
    pub branch: Option<DecisionBranch>,
    /// Actor the decision was made for.
    pub actor: AuditActor,
    /// Outcome classification.
    pub outcome: DecisionOutcome,
    /// Collaborator failure the engine absorbed by failing closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl DecisionAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(
        actor: &Actor,
        branch: Option<DecisionBranch>,
        outcome: DecisionOutcome,
        degraded: Option<String>,
    ) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "repo_visibility_decision",
            timestamp_ms,
            branch,
            actor: AuditActor::from(actor),
            outcome,
            degraded,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for decision events.
pub trait DecisionAuditSink: Send + Sync {
    /// Records a decision event.
    fn record(&self, event: &DecisionAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl DecisionAuditSink for StderrAuditSink {
    fn record(&self, event: &DecisionAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DecisionAuditSink for FileAuditSink {
    fn record(&self, event: &DecisionAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl DecisionAuditSink for NoopAuditSink {
    fn record(&self, _event: &DecisionAuditEvent) {}
}
