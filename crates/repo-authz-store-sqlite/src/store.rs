// crates/repo-authz-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Authz Store
// Description: Durable users, repositories, sources, and permission records.
// Purpose: Back the decision engine and repo listing with SQLite.
// Dependencies: repo-authz-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteAuthzStore`] persists the tables the decision engine consumes and
//! implements [`PermissionStore`], [`UserDirectory`], and [`RepoStore`].
//! Listing lowers the visibility condition into the `WHERE` clause, so rows
//! the actor may not read never leave the database. Reads validate persisted
//! identifiers and labels and fail closed on anything malformed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use repo_authz_core::ExternalServiceId;
use repo_authz_core::ObjectType;
use repo_authz_core::OrgId;
use repo_authz_core::Permission;
use repo_authz_core::PermissionRecord;
use repo_authz_core::PermissionStore;
use repo_authz_core::Repo;
use repo_authz_core::RepoCondition;
use repo_authz_core::RepoId;
use repo_authz_core::RepoPage;
use repo_authz_core::RepoSource;
use repo_authz_core::RepoStore;
use repo_authz_core::ReposListOptions;
use repo_authz_core::SourceNamespace;
use repo_authz_core::StoreError;
use repo_authz_core::Timestamp;
use repo_authz_core::UserDirectory;
use repo_authz_core::UserId;
use repo_authz_core::UserRecord;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use rusqlite::params_from_iter;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::query::SqlCondition;
use crate::query::SqlParam;
use crate::query::lower_condition;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized permission set accepted on read.
pub const MAX_OBJECT_IDS_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` authz store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds. Lock waits beyond this fail the lookup.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
#[must_use]
pub const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Persisted data failed integrity checks.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Code host connection that syncs repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalService {
    /// Service identifier.
    pub id: ExternalServiceId,
    /// Code host kind (e.g. `github`).
    pub kind: String,
    /// Human-readable name.
    pub display_name: String,
    /// Whether repositories from this service bypass permission checks.
    pub unrestricted: bool,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed authorization store.
#[derive(Clone)]
pub struct SqliteAuthzStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteAuthzStore {
    /// Opens (and if needed creates) an `SQLite`-backed store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Inserts or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_user(&self, user: &UserRecord) -> Result<(), SqliteStoreError> {
        self.write_batch(|writer| writer.upsert_user(user))
    }

    /// Inserts or replaces an external service.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_external_service(
        &self,
        service: &ExternalService,
    ) -> Result<(), SqliteStoreError> {
        self.write_batch(|writer| writer.upsert_external_service(service))
    }

    /// Inserts or replaces a repository and its sources.
    ///
    /// # Errors
    ///
    /// See [`SqliteWriter::upsert_repo`].
    pub fn upsert_repo(&self, repo: &Repo) -> Result<(), SqliteStoreError> {
        self.write_batch(|writer| writer.upsert_repo(repo))
    }

    /// Runs several writes in one transaction.
    ///
    /// Nothing is committed unless `f` succeeds, so a failing row leaves the
    /// store exactly as it was before the batch started.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `f` or by the commit.
    pub fn write_batch<T>(
        &self,
        f: impl FnOnce(&SqliteWriter<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        self.with_tx(|tx| {
            f(&SqliteWriter {
                connection: tx,
            })
        })
    }

    /// Runs `f` inside a transaction on the shared connection.
    fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        drop(guard);
        Ok(value)
    }

    /// Loads a permission record.
    fn load_permissions(
        &self,
        user_id: UserId,
        object_type: ObjectType,
        permission: Permission,
    ) -> Result<Option<PermissionRecord>, SqliteStoreError> {
        let id = to_sql_id(user_id.get())?;
        let row = self.with_tx(|tx| {
            Ok(tx
                .query_row(
                    "SELECT length(object_ids), object_ids, updated_at FROM user_permissions \
                     WHERE user_id = ?1 AND object_type = ?2 AND permission = ?3",
                    params![id, object_type.as_str(), permission.as_str()],
                    |row| {
                        let length: i64 = row.get(0)?;
                        let ids: String = row.get(1)?;
                        let updated_at: i64 = row.get(2)?;
                        Ok((length, ids, updated_at))
                    },
                )
                .optional()?)
        })?;
        let Some((length, ids, updated_at)) = row else {
            return Ok(None);
        };
        let length = usize::try_from(length).map_err(|_| {
            SqliteStoreError::Corrupt(format!("negative object_ids length for user {user_id}"))
        })?;
        if length > MAX_OBJECT_IDS_BYTES {
            return Err(SqliteStoreError::Invalid(format!(
                "object_ids exceeds size limit: {length} bytes (max {MAX_OBJECT_IDS_BYTES})"
            )));
        }
        let raw: Vec<u64> = serde_json::from_str(&ids).map_err(|err| {
            SqliteStoreError::Corrupt(format!("object_ids for user {user_id}: {err}"))
        })?;
        let object_ids = raw
            .into_iter()
            .map(|raw| {
                RepoId::from_raw(raw).ok_or_else(|| {
                    SqliteStoreError::Corrupt(format!(
                        "zero repo id in object_ids for user {user_id}"
                    ))
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Some(PermissionRecord {
            user_id,
            object_type,
            permission,
            object_ids,
            updated_at: Timestamp::from_unix_millis(updated_at),
        }))
    }

    /// Writes a permission record, replacing the set for its key.
    fn save_permissions(&self, record: &PermissionRecord) -> Result<(), SqliteStoreError> {
        self.write_batch(|writer| writer.upsert_user_permissions(record))
    }

    /// Loads a user.
    fn load_user(&self, user_id: UserId) -> Result<Option<UserRecord>, SqliteStoreError> {
        let id = to_sql_id(user_id.get())?;
        let row = self.with_tx(|tx| {
            Ok(tx
                .query_row(
                    "SELECT username, site_admin FROM users WHERE id = ?1",
                    params![id],
                    |row| {
                        let username: String = row.get(0)?;
                        let site_admin: bool = row.get(1)?;
                        Ok((username, site_admin))
                    },
                )
                .optional()?)
        })?;
        Ok(row.map(|(username, site_admin)| UserRecord {
            id: user_id,
            username,
            site_admin,
        }))
    }

    /// Lists repositories matching `condition` and `options`.
    fn query_repos(
        &self,
        condition: &RepoCondition,
        options: &ReposListOptions,
    ) -> Result<RepoPage, SqliteStoreError> {
        let filter =
            SqlCondition::all(vec![lower_condition(condition), filter_condition(options)?]);
        let limit = match options.limit {
            Some(limit) => i64::try_from(limit).unwrap_or(i64::MAX),
            None => -1,
        };
        let offset = i64::try_from(options.offset).unwrap_or(i64::MAX);

        self.with_tx(|tx| {
            let total: i64 = tx.query_row(
                &format!("SELECT COUNT(*) FROM repo WHERE {}", filter.sql),
                params_from_iter(filter.params.iter()),
                |row| row.get(0),
            )?;
            let total_count = usize::try_from(total)
                .map_err(|_| SqliteStoreError::Corrupt("negative repository count".to_string()))?;

            let mut page_params = filter.params.clone();
            page_params.push(SqlParam::Int(limit));
            page_params.push(SqlParam::Int(offset));
            let mut statement = tx.prepare(&format!(
                "SELECT id, name, private FROM repo WHERE {} ORDER BY id LIMIT ? OFFSET ?",
                filter.sql
            ))?;
            let rows = statement.query_map(params_from_iter(page_params.iter()), |row| {
                let id: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                let private: bool = row.get(2)?;
                Ok((id, name, private))
            })?;
            let mut repos = Vec::new();
            for row in rows {
                let (id, name, private) = row?;
                repos.push(Repo {
                    id: from_sql_id(id, RepoId::from_raw, "repo id")?,
                    name,
                    private,
                    sources: Vec::new(),
                });
            }
            drop(statement);

            attach_sources(tx, &mut repos)?;
            Ok(RepoPage {
                repos,
                total_count,
            })
        })
    }
}

// ============================================================================
// SECTION: Batch Writer
// ============================================================================

/// Write access to the store inside one open transaction.
///
/// Obtained from [`SqliteAuthzStore::write_batch`].
pub struct SqliteWriter<'a> {
    /// Connection of the open transaction.
    connection: &'a Connection,
}

impl SqliteWriter<'_> {
    /// Inserts or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_user(&self, user: &UserRecord) -> Result<(), SqliteStoreError> {
        let id = to_sql_id(user.id.get())?;
        self.connection.execute(
            "INSERT INTO users (id, username, site_admin) VALUES (?1, ?2, ?3) ON CONFLICT(id) DO \
             UPDATE SET username = excluded.username, site_admin = excluded.site_admin",
            params![id, user.username, user.site_admin],
        )?;
        Ok(())
    }

    /// Inserts or replaces an external service.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_external_service(
        &self,
        service: &ExternalService,
    ) -> Result<(), SqliteStoreError> {
        let id = to_sql_id(service.id.get())?;
        self.connection.execute(
            "INSERT INTO external_services (id, kind, display_name, unrestricted) VALUES (?1, ?2, \
             ?3, ?4) ON CONFLICT(id) DO UPDATE SET kind = excluded.kind, display_name = \
             excluded.display_name, unrestricted = excluded.unrestricted",
            params![id, service.kind, service.display_name, service.unrestricted],
        )?;
        Ok(())
    }

    /// Inserts or replaces a repository and its sources.
    ///
    /// Source rows are replaced as a set. Each source must carry the
    /// `unrestricted` flag of its external service; the stored flag lives on
    /// the service row only.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when a source names another
    /// repository or disagrees with its service's `unrestricted` flag, and
    /// [`SqliteStoreError::Db`] when a referenced service is missing or the
    /// write fails.
    pub fn upsert_repo(&self, repo: &Repo) -> Result<(), SqliteStoreError> {
        let repo_id = to_sql_id(repo.id.get())?;
        let mut sources = Vec::with_capacity(repo.sources.len());
        for source in &repo.sources {
            if source.repo_id != repo.id {
                return Err(SqliteStoreError::Invalid(format!(
                    "source for repo {} attached to repo {}",
                    source.repo_id, repo.id
                )));
            }
            let service_id = to_sql_id(source.external_service_id.get())?;
            self.check_source_flag(source, service_id)?;
            let (user_id, org_id) = match source.namespace {
                SourceNamespace::Site => (None, None),
                SourceNamespace::User(user_id) => (Some(to_sql_id(user_id.get())?), None),
                SourceNamespace::Org(org_id) => (None, Some(to_sql_id(org_id.get())?)),
            };
            sources.push((service_id, user_id, org_id));
        }
        self.connection.execute(
            "INSERT INTO repo (id, name, private) VALUES (?1, ?2, ?3) ON CONFLICT(id) DO UPDATE \
             SET name = excluded.name, private = excluded.private",
            params![repo_id, repo.name, repo.private],
        )?;
        self.connection
            .execute("DELETE FROM external_service_repos WHERE repo_id = ?1", params![repo_id])?;
        for (service_id, user_id, org_id) in &sources {
            self.connection.execute(
                "INSERT INTO external_service_repos (external_service_id, repo_id, user_id, \
                 org_id) VALUES (?1, ?2, ?3, ?4)",
                params![service_id, repo_id, user_id, org_id],
            )?;
        }
        Ok(())
    }

    /// Writes a permission record, replacing the set for its key.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_user_permissions(
        &self,
        record: &PermissionRecord,
    ) -> Result<(), SqliteStoreError> {
        let id = to_sql_id(record.user_id.get())?;
        let raw: Vec<u64> = record.object_ids.iter().map(|id| id.get()).collect();
        let ids = serde_json::to_string(&raw)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        self.connection.execute(
            "INSERT INTO user_permissions (user_id, permission, object_type, object_ids, \
             updated_at) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(user_id, permission, \
             object_type) DO UPDATE SET object_ids = excluded.object_ids, updated_at = \
             excluded.updated_at",
            params![
                id,
                record.permission.as_str(),
                record.object_type.as_str(),
                ids,
                record.updated_at.as_unix_millis()
            ],
        )?;
        Ok(())
    }

    /// Rejects a source whose `unrestricted` flag differs from its service.
    fn check_source_flag(
        &self,
        source: &RepoSource,
        service_id: i64,
    ) -> Result<(), SqliteStoreError> {
        let stored: Option<bool> = self
            .connection
            .query_row(
                "SELECT unrestricted FROM external_services WHERE id = ?1",
                params![service_id],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            None => Err(SqliteStoreError::Db(format!(
                "unknown external service {}",
                source.external_service_id
            ))),
            Some(unrestricted) if unrestricted != source.unrestricted => {
                Err(SqliteStoreError::Invalid(format!(
                    "source of repo {} says unrestricted = {}, external service {} says {}",
                    source.repo_id, source.unrestricted, source.external_service_id, unrestricted
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

impl PermissionStore for SqliteAuthzStore {
    fn load_user_permissions(
        &self,
        user_id: UserId,
        object_type: ObjectType,
        permission: Permission,
    ) -> Result<Option<PermissionRecord>, StoreError> {
        self.load_permissions(user_id, object_type, permission).map_err(StoreError::from)
    }

    fn upsert_user_permissions(&self, record: &PermissionRecord) -> Result<(), StoreError> {
        self.save_permissions(record).map_err(StoreError::from)
    }
}

impl UserDirectory for SqliteAuthzStore {
    fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.load_user(user_id).map_err(StoreError::from)
    }
}

impl RepoStore for SqliteAuthzStore {
    fn list_repos(
        &self,
        condition: &RepoCondition,
        options: &ReposListOptions,
    ) -> Result<RepoPage, StoreError> {
        self.query_repos(condition, options).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Listing Helpers
// ============================================================================

/// Builds the caller filter fragment.
fn filter_condition(options: &ReposListOptions) -> Result<SqlCondition, SqliteStoreError> {
    let mut parts = Vec::new();
    if let Some(needle) = &options.name_contains {
        parts.push(SqlCondition {
            sql: "instr(repo.name, ?) > 0".to_string(),
            params: vec![SqlParam::Text(needle.clone())],
        });
    }
    if let Some(org_id) = options.org_id {
        parts.push(source_filter("esr.org_id = ?", to_sql_id(org_id.get())?));
    }
    if let Some(user_id) = options.user_id {
        parts.push(source_filter("esr.user_id = ?", to_sql_id(user_id.get())?));
    }
    if let Some(service_id) = options.external_service_id {
        parts.push(source_filter("esr.external_service_id = ?", to_sql_id(service_id.get())?));
    }
    Ok(SqlCondition::all(parts))
}

/// Builds an `EXISTS` filter over the repository's sources.
fn source_filter(predicate: &str, value: i64) -> SqlCondition {
    SqlCondition {
        sql: format!(
            "EXISTS (SELECT 1 FROM external_service_repos esr WHERE esr.repo_id = repo.id AND \
             {predicate})"
        ),
        params: vec![SqlParam::Int(value)],
    }
}

/// Loads sources for the listed repositories.
fn attach_sources(tx: &Transaction<'_>, repos: &mut [Repo]) -> Result<(), SqliteStoreError> {
    if repos.is_empty() {
        return Ok(());
    }
    let ids: Vec<u64> = repos.iter().map(|repo| repo.id.get()).collect();
    let ids =
        serde_json::to_string(&ids).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    let mut statement = tx.prepare(
        "SELECT esr.repo_id, esr.external_service_id, es.unrestricted, esr.user_id, esr.org_id \
         FROM external_service_repos esr JOIN external_services es ON es.id = \
         esr.external_service_id WHERE esr.repo_id IN (SELECT value FROM json_each(?1)) ORDER \
         BY esr.repo_id, esr.external_service_id",
    )?;
    let rows = statement.query_map(params![ids], |row| {
        let repo_id: i64 = row.get(0)?;
        let service_id: i64 = row.get(1)?;
        let unrestricted: bool = row.get(2)?;
        let user_id: Option<i64> = row.get(3)?;
        let org_id: Option<i64> = row.get(4)?;
        Ok((repo_id, service_id, unrestricted, user_id, org_id))
    })?;
    let mut by_repo: BTreeMap<RepoId, Vec<RepoSource>> = BTreeMap::new();
    for row in rows {
        let (repo_id, service_id, unrestricted, user_id, org_id) = row?;
        let repo_id = from_sql_id(repo_id, RepoId::from_raw, "repo id")?;
        let namespace = match (user_id, org_id) {
            (None, None) => SourceNamespace::Site,
            (Some(user_id), None) => {
                SourceNamespace::User(from_sql_id(user_id, UserId::from_raw, "user id")?)
            }
            (None, Some(org_id)) => {
                SourceNamespace::Org(from_sql_id(org_id, OrgId::from_raw, "org id")?)
            }
            (Some(_), Some(_)) => {
                return Err(SqliteStoreError::Corrupt(format!(
                    "source of repo {repo_id} owned by both a user and an org"
                )));
            }
        };
        by_repo.entry(repo_id).or_default().push(RepoSource {
            external_service_id: from_sql_id(
                service_id,
                ExternalServiceId::from_raw,
                "external service id",
            )?,
            repo_id,
            unrestricted,
            namespace,
        });
    }
    for repo in repos.iter_mut() {
        repo.sources = by_repo.remove(&repo.id).unwrap_or_default();
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts an identifier to an `SQLite` integer.
fn to_sql_id(raw: u64) -> Result<i64, SqliteStoreError> {
    i64::try_from(raw)
        .map_err(|_| SqliteStoreError::Invalid(format!("identifier {raw} exceeds sqlite range")))
}

/// Converts a persisted integer to a typed identifier.
fn from_sql_id<T>(
    raw: i64,
    build: fn(u64) -> Option<T>,
    label: &str,
) -> Result<T, SqliteStoreError> {
    u64::try_from(raw)
        .ok()
        .and_then(build)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("invalid {label}: {raw}")))
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    site_admin INTEGER NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS external_services (
                    id INTEGER PRIMARY KEY,
                    kind TEXT NOT NULL,
                    display_name TEXT NOT NULL,
                    unrestricted INTEGER NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS repo (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    private INTEGER NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS external_service_repos (
                    external_service_id INTEGER NOT NULL,
                    repo_id INTEGER NOT NULL,
                    user_id INTEGER,
                    org_id INTEGER,
                    PRIMARY KEY (external_service_id, repo_id),
                    FOREIGN KEY (external_service_id) REFERENCES external_services(id)
                        ON DELETE CASCADE,
                    FOREIGN KEY (repo_id) REFERENCES repo(id) ON DELETE CASCADE,
                    CHECK (user_id IS NULL OR org_id IS NULL)
                );
                CREATE INDEX IF NOT EXISTS idx_external_service_repos_repo_id
                    ON external_service_repos (repo_id);
                CREATE TABLE IF NOT EXISTS user_permissions (
                    user_id INTEGER NOT NULL,
                    permission TEXT NOT NULL,
                    object_type TEXT NOT NULL,
                    object_ids TEXT NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (user_id, permission, object_type)
                );",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}
