use crate::error::{StoreError, StoreResult};

/// Table and column names for persisted state.
///
/// Names are validated once on construction and interpolated into SQL as
/// quoted identifiers afterwards, so every accessor returns a statement that
/// is safe to prepare, even when a name is an SQL keyword. Values (ids,
/// blobs) are always bound as parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateSchema {
    table: String,
    id_column: String,
    data_column: String,
    lock_column: String,
}

impl StateSchema {
    pub const DEFAULT_TABLE: &'static str = "state";
    pub const DEFAULT_ID_COLUMN: &'static str = "id";
    pub const DEFAULT_DATA_COLUMN: &'static str = "data";
    pub const DEFAULT_LOCK_COLUMN: &'static str = "lock";

    /// Build a schema with custom names.
    pub fn new(
        table: impl Into<String>,
        id_column: impl Into<String>,
        data_column: impl Into<String>,
        lock_column: impl Into<String>,
    ) -> StoreResult<Self> {
        let schema = Self {
            table: table.into(),
            id_column: id_column.into(),
            data_column: data_column.into(),
            lock_column: lock_column.into(),
        };
        for name in [
            &schema.table,
            &schema.id_column,
            &schema.data_column,
            &schema.lock_column,
        ] {
            validate_identifier(name)?;
        }
        let columns = [&schema.id_column, &schema.data_column, &schema.lock_column];
        if columns[0] == columns[1] || columns[0] == columns[2] || columns[1] == columns[2] {
            return Err(StoreError::InvalidSchema {
                name: schema.id_column.clone(),
                reason: "column names must be distinct",
            });
        }
        Ok(schema)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn data_column(&self) -> &str {
        &self.data_column
    }

    pub fn lock_column(&self) -> &str {
        &self.lock_column
    }

    /// `CREATE TABLE IF NOT EXISTS` for this schema.
    pub fn create_statement(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\"{}\" TEXT PRIMARY KEY, \"{}\" BLOB, \"{}\" BLOB)",
            self.table, self.id_column, self.data_column, self.lock_column
        )
    }

    /// Point lookup; binds `?1` = id, yields `(data, lock)`.
    pub fn select_statement(&self) -> String {
        format!(
            "SELECT \"{}\", \"{}\" FROM \"{}\" WHERE \"{}\" = ?1",
            self.data_column, self.lock_column, self.table, self.id_column
        )
    }

    /// Single-statement insert-or-replace; binds `?1` = id, `?2` = data,
    /// `?3` = lock.
    pub fn upsert_statement(&self) -> String {
        format!(
            "INSERT INTO \"{table}\" (\"{id}\", \"{data}\", \"{lock}\") VALUES (?1, ?2, ?3) \
             ON CONFLICT(\"{id}\") DO UPDATE SET \"{data}\" = excluded.\"{data}\", \"{lock}\" = excluded.\"{lock}\"",
            table = self.table,
            id = self.id_column,
            data = self.data_column,
            lock = self.lock_column,
        )
    }

    /// Full-table read in key order, yields `(data, lock)`.
    pub fn scan_statement(&self) -> String {
        format!(
            "SELECT \"{}\", \"{}\" FROM \"{}\" ORDER BY \"{}\"",
            self.data_column, self.lock_column, self.table, self.id_column
        )
    }
}

impl Default for StateSchema {
    fn default() -> Self {
        Self {
            table: Self::DEFAULT_TABLE.to_owned(),
            id_column: Self::DEFAULT_ID_COLUMN.to_owned(),
            data_column: Self::DEFAULT_DATA_COLUMN.to_owned(),
            lock_column: Self::DEFAULT_LOCK_COLUMN.to_owned(),
        }
    }
}

fn validate_identifier(name: &str) -> StoreResult<()> {
    let invalid = |reason| StoreError::InvalidSchema {
        name: name.to_owned(),
        reason,
    };
    let first = name.chars().next().ok_or_else(|| invalid("empty name"))?;
    if first.is_ascii_digit() {
        return Err(invalid("must not start with a digit"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("only ASCII letters, digits and '_' are allowed"));
    }
    Ok(())
}
