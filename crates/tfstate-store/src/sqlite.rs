use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::{FromSqlError, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tfstate_types::{StateId, StateRecord};

use crate::error::{StoreError, StoreResult};
use crate::schema::StateSchema;
use crate::traits::{StateStore, UpdateFn};

/// How long a statement waits on another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed state store.
///
/// One connection is shared behind a mutex. `update` additionally runs in an
/// `IMMEDIATE` transaction, so the read-decide-write is atomic against other
/// processes using the same database file, not only other threads.
#[derive(Clone)]
pub struct SqliteStateStore {
    schema: StateSchema,
    path: Option<PathBuf>,
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStateStore {
    /// Open (creating if necessary) the database file and its table.
    pub fn open(path: impl AsRef<Path>, schema: StateSchema) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(path)?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self::with_connection(connection, schema, Some(path.to_path_buf()))?;
        tracing::debug!(path = %path.display(), table = store.schema.table(), "opened state database");
        Ok(store)
    }

    /// Private in-memory database, for tests.
    pub fn open_in_memory(schema: StateSchema) -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, schema, None)
    }

    fn with_connection(
        connection: Connection,
        schema: StateSchema,
        path: Option<PathBuf>,
    ) -> StoreResult<Self> {
        connection.execute_batch(&schema.create_statement())?;
        Ok(Self {
            schema,
            path,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Database file, or `None` for an in-memory database.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| StoreError::Poisoned("sqlite connection"))
    }
}

impl StateStore for SqliteStateStore {
    fn lookup(&self, id: &StateId) -> StoreResult<StateRecord> {
        let conn = self.conn()?;
        select_record(&conn, &self.schema, id)
    }

    fn upsert(&self, id: &StateId, record: &StateRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        write_record(&conn, &self.schema, id, record)
    }

    fn scan(&self) -> StoreResult<Vec<StateRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&self.schema.scan_statement())?;
        let records = stmt
            .query_map([], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn update(&self, id: &StateId, apply: &mut UpdateFn<'_>) -> StoreResult<StateRecord> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = select_record(&tx, &self.schema, id)?;
        match apply(&current) {
            Some(next) => {
                write_record(&tx, &self.schema, id, &next)?;
                tx.commit()?;
            }
            None => tx.rollback()?,
        }
        Ok(current)
    }
}

impl std::fmt::Debug for SqliteStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStateStore")
            .field("path", &self.path)
            .field("schema", &self.schema)
            .finish()
    }
}

fn select_record(conn: &Connection, schema: &StateSchema, id: &StateId) -> StoreResult<StateRecord> {
    let record = conn
        .query_row(&schema.select_statement(), params![id.as_str()], map_record)
        .optional()?;
    Ok(record.unwrap_or_default())
}

fn write_record(
    conn: &Connection,
    schema: &StateSchema,
    id: &StateId,
    record: &StateRecord,
) -> StoreResult<()> {
    conn.execute(
        &schema.upsert_statement(),
        params![id.as_str(), record.data, record.lock],
    )?;
    Ok(())
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<StateRecord> {
    Ok(StateRecord {
        data: column_bytes(row, 0)?,
        lock: column_bytes(row, 1)?,
    })
}

/// Reads a column as bytes. Databases written by older deployments store
/// TEXT rather than BLOB, and NULL means empty.
fn column_bytes(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(Vec::new()),
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(bytes.to_vec()),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            other.data_type(),
            Box::new(FromSqlError::InvalidType),
        )),
    }
}
