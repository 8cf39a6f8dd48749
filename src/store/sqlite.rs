//! SQLite-backed record store
//!
//! One table, `actions`, keyed by `identifier`. Rows are append-only.
//! Every operation opens its own connection with a bounded busy timeout;
//! writers are serialized by SQLite's locking.

use crate::cache::CacheRecord;
use crate::error::{ProvcacheError, ProvcacheResult};
use crate::fingerprint::Fingerprint;
use crate::store::{RecordStore, SchemaStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default time to wait on a locked database before giving up
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const TABLE: &str = "actions";

const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS actions (
        identifier   TEXT PRIMARY KEY NOT NULL,
        fingerprint  TEXT NOT NULL,
        name         TEXT NOT NULL,
        action       TEXT NOT NULL,
        action_type  TEXT NOT NULL,
        description  TEXT NOT NULL,
        inputs       TEXT NOT NULL,
        parameters   TEXT NOT NULL,
        working_dir  TEXT NOT NULL,
        environment  TEXT NOT NULL,
        execution_id TEXT NOT NULL,
        created_at   TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS actions_name ON actions (name);
";

const SELECT_COLUMNS: &str = "SELECT identifier, fingerprint, name, action, action_type, \
     description, inputs, parameters, working_dir, environment, execution_id, created_at \
     FROM actions";

/// Record store in a single SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Store at `path` with the default busy timeout
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> ProvcacheResult<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| self.unavailable("opening database", e))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| self.unavailable("setting busy timeout", e))?;
        Ok(conn)
    }

    fn unavailable(&self, context: &str, err: rusqlite::Error) -> ProvcacheError {
        ProvcacheError::store_unavailable(&self.path, format!("{context}: {err}"))
    }

    fn table_exists(&self, conn: &Connection) -> ProvcacheResult<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [TABLE],
            |row| row.get(0),
        )
        .map_err(|e| self.unavailable("reading schema", e))
    }
}

impl RecordStore for SqliteStore {
    fn ensure_schema(&self) -> ProvcacheResult<SchemaStatus> {
        let mut conn = self.connect()?;

        // IMMEDIATE takes the write lock up front so concurrent initializers
        // queue behind each other instead of both creating.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| self.unavailable("starting schema transaction", e))?;

        if self.table_exists(&tx)? {
            return Ok(SchemaStatus::Existing);
        }

        tx.execute_batch(CREATE_SCHEMA)
            .map_err(|e| self.unavailable("creating schema", e))?;
        tx.commit()
            .map_err(|e| self.unavailable("committing schema", e))?;

        debug!("Created record store schema at {}", self.path.display());
        Ok(SchemaStatus::Created)
    }

    fn lookup(&self, identifier: &str) -> ProvcacheResult<Option<CacheRecord>> {
        let conn = self.connect()?;
        if !self.table_exists(&conn)? {
            return Ok(None);
        }

        let raw = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE identifier = ?1"),
                [identifier],
                RawRecord::from_row,
            )
            .optional()
            .map_err(|e| self.unavailable("looking up record", e))?;

        raw.map(RawRecord::decode).transpose()
    }

    fn insert(&self, record: &CacheRecord) -> ProvcacheResult<()> {
        let raw = RawRecord::encode(record)?;
        let conn = self.connect()?;

        let result = conn.execute(
            "INSERT INTO actions (identifier, fingerprint, name, action, action_type, \
             description, inputs, parameters, working_dir, environment, execution_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                raw.identifier,
                raw.fingerprint,
                raw.name,
                raw.action,
                raw.action_type,
                raw.description,
                raw.inputs,
                raw.parameters,
                raw.working_dir,
                raw.environment,
                raw.execution_id,
                raw.created_at,
            ],
        );

        match result {
            Ok(_) => {
                debug!("Inserted record {}", record.identifier);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(ProvcacheError::DuplicateFingerprint(
                    record.identifier.clone(),
                ))
            }
            Err(e) => Err(self.unavailable("inserting record", e)),
        }
    }

    fn records(&self) -> ProvcacheResult<Vec<CacheRecord>> {
        let conn = self.connect()?;
        if !self.table_exists(&conn)? {
            return Ok(vec![]);
        }

        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY rowid"))
            .map_err(|e| self.unavailable("listing records", e))?;
        let rows = stmt
            .query_map([], RawRecord::from_row)
            .map_err(|e| self.unavailable("listing records", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.unavailable("reading records", e))?;

        rows.into_iter().map(RawRecord::decode).collect()
    }
}

/// Column values as stored
struct RawRecord {
    identifier: String,
    fingerprint: String,
    name: String,
    action: String,
    action_type: String,
    description: String,
    inputs: String,
    parameters: String,
    working_dir: String,
    environment: String,
    execution_id: String,
    created_at: String,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identifier: row.get(0)?,
            fingerprint: row.get(1)?,
            name: row.get(2)?,
            action: row.get(3)?,
            action_type: row.get(4)?,
            description: row.get(5)?,
            inputs: row.get(6)?,
            parameters: row.get(7)?,
            working_dir: row.get(8)?,
            environment: row.get(9)?,
            execution_id: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    fn encode(record: &CacheRecord) -> ProvcacheResult<Self> {
        use crate::fingerprint::canonical_json;

        let inputs = canonical_json(&serde_json::to_value(&record.inputs)?, "inputs")?;
        let parameters = canonical_json(&serde_json::to_value(&record.parameters)?, "parameters")?;

        Ok(Self {
            identifier: record.identifier.clone(),
            fingerprint: record.fingerprint.to_string(),
            name: record.name.clone(),
            action: record.action.clone(),
            action_type: record.action_type.as_str().to_string(),
            description: record.description.clone(),
            inputs,
            parameters,
            working_dir: record.working_dir.to_string_lossy().into_owned(),
            environment: serde_json::to_string(&record.environment)?,
            execution_id: record.execution_id.to_string(),
            created_at: record
                .created_at
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        })
    }

    fn decode(self) -> ProvcacheResult<CacheRecord> {
        let identifier = self.identifier;
        let corrupt = |column: &str, reason: String| ProvcacheError::CorruptRecord {
            identifier: identifier.clone(),
            reason: format!("{column}: {reason}"),
        };

        let fingerprint = Fingerprint::parse(&self.fingerprint)
            .map_err(|_| corrupt("fingerprint", format!("invalid digest '{}'", self.fingerprint)))?;
        let action_type = self
            .action_type
            .parse()
            .map_err(|e: ProvcacheError| corrupt("action_type", e.to_string()))?;
        let inputs = serde_json::from_str(&self.inputs)
            .map_err(|e| corrupt("inputs", e.to_string()))?;
        let parameters = serde_json::from_str(&self.parameters)
            .map_err(|e| corrupt("parameters", e.to_string()))?;
        let environment = serde_json::from_str(&self.environment)
            .map_err(|e| corrupt("environment", e.to_string()))?;
        let execution_id = self
            .execution_id
            .parse()
            .map_err(|e: uuid::Error| corrupt("execution_id", e.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt("created_at", e.to_string()))?
            .with_timezone(&Utc);

        Ok(CacheRecord {
            fingerprint,
            name: self.name,
            action: self.action,
            action_type,
            description: self.description,
            inputs,
            parameters,
            working_dir: PathBuf::from(self.working_dir),
            environment,
            execution_id,
            created_at,
            identifier,
        })
    }
}
