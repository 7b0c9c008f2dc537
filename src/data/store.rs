//! SQLite Store Module
//! Explicit store handle and full-table extraction into Polars DataFrames.

use crate::config;
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Store is not a readable SQLite database: {0}")]
    Unreadable(String),
    #[error("Unknown relation '{0}'")]
    UnknownRelation(String),
    #[error("Relation '{0}' not found in store")]
    MissingRelation(Relation),
    #[error("Column '{column}' missing from relation '{relation}'")]
    MissingColumn { relation: Relation, column: String },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// The only relations the dashboard is allowed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Consultations,
    Users,
}

impl Relation {
    /// Physical table name in the store.
    pub fn table_name(self) -> &'static str {
        match self {
            Relation::Consultations => config::CONSULTATIONS_TABLE,
            Relation::Users => config::USERS_TABLE,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Relation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consultations" | config::CONSULTATIONS_TABLE => Ok(Relation::Consultations),
            "users" | config::USERS_TABLE => Ok(Relation::Users),
            other => Err(StoreError::UnknownRelation(other.to_string())),
        }
    }
}

/// Storage class observed across a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Null,
    Int,
    Float,
    Text,
}

/// Read-only handle over an uploaded SQLite store.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open a store file read-only and check that it is a SQLite database.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // SQLite opens lazily; the header is only checked on first read.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| StoreError::Unreadable(e.to_string()))?;

        tracing::debug!(path = %path.display(), "Opened store");
        Ok(Self { conn })
    }

    /// Whether the relation exists as a table or view.
    pub fn has_relation(&self, relation: Relation) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
            [relation.table_name()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Full-table read of an allow-listed relation.
    ///
    /// No filtering or schema validation: the frame has exactly the stored
    /// columns, typed by the values they hold.
    pub fn extract(&self, relation: Relation) -> Result<DataFrame, StoreError> {
        if !self.has_relation(relation)? {
            return Err(StoreError::MissingRelation(relation));
        }

        // Identifier comes from the allow-list, never from caller input.
        let sql = format!("SELECT * FROM \"{}\"", relation.table_name());
        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut values: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, column) in values.iter_mut().enumerate() {
                column.push(row.get::<_, Value>(i)?);
            }
        }

        let columns: Vec<Column> = names
            .iter()
            .zip(values)
            .map(|(name, vals)| Self::build_column(name, vals))
            .collect();

        let df = DataFrame::new(columns)?;
        tracing::info!(
            relation = %relation,
            rows = df.height(),
            columns = df.width(),
            "Extracted relation"
        );
        Ok(df)
    }

    fn infer_kind(values: &[Value]) -> ColumnKind {
        values.iter().fold(ColumnKind::Null, |kind, v| match (kind, v) {
            (k, Value::Null) => k,
            (ColumnKind::Text, _) | (_, Value::Text(_)) | (_, Value::Blob(_)) => ColumnKind::Text,
            (ColumnKind::Float, _) | (_, Value::Real(_)) => ColumnKind::Float,
            (_, Value::Integer(_)) => ColumnKind::Int,
        })
    }

    fn build_column(name: &str, values: Vec<Value>) -> Column {
        match Self::infer_kind(&values) {
            ColumnKind::Null => {
                Series::full_null(name.into(), values.len(), &DataType::Null).into()
            }
            ColumnKind::Int => {
                let ints: Vec<Option<i64>> = values
                    .into_iter()
                    .map(|v| match v {
                        Value::Integer(i) => Some(i),
                        _ => None,
                    })
                    .collect();
                Column::new(name.into(), ints)
            }
            ColumnKind::Float => {
                let floats: Vec<Option<f64>> = values
                    .into_iter()
                    .map(|v| match v {
                        Value::Integer(i) => Some(i as f64),
                        Value::Real(f) => Some(f),
                        _ => None,
                    })
                    .collect();
                Column::new(name.into(), floats)
            }
            ColumnKind::Text => {
                let texts: Vec<Option<String>> = values
                    .into_iter()
                    .map(|v| match v {
                        Value::Null => None,
                        Value::Integer(i) => Some(i.to_string()),
                        Value::Real(f) => Some(f.to_string()),
                        Value::Text(s) => Some(s),
                        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
                    })
                    .collect();
                Column::new(name.into(), texts)
            }
        }
    }
}

/// Full-table read by relation name. Only allow-listed names are accepted.
pub fn extract(table_name: &str, store: &Store) -> Result<DataFrame, StoreError> {
    let relation: Relation = table_name.parse()?;
    store.extract(relation)
}

/// In-memory store seeded with the given SQL.
#[cfg(test)]
pub(crate) fn test_store(sql: &str) -> Store {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(sql).unwrap();
    Store { conn }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCHEMA: &str = "
        CREATE TABLE auth_user (
            id INTEGER PRIMARY KEY, password TEXT, username TEXT,
            email TEXT, date_joined TEXT
        );
        CREATE TABLE main_consulta (
            id INTEGER PRIMARY KEY, user_id INTEGER, patologia TEXT,
            intensidad TEXT, duracion TEXT, fecha TEXT, peso REAL
        );
        INSERT INTO auth_user VALUES (1, 'x', 'ana', 'ana@example.com', '2023-12-01 09:00:00');
        INSERT INTO main_consulta VALUES (1, 1, 'Migraine', 'Dolor Moderado', 'Media', '2024-01-05', 61.5);
        INSERT INTO main_consulta VALUES (2, NULL, 'Lumbago', 'Dolor Leve', 'Corta', '2024-01-06', 70);
    ";

    #[test]
    fn relation_names_are_allow_listed() {
        assert_eq!("consultations".parse::<Relation>().unwrap(), Relation::Consultations);
        assert_eq!("main_consulta".parse::<Relation>().unwrap(), Relation::Consultations);
        assert_eq!("users".parse::<Relation>().unwrap(), Relation::Users);
        assert_eq!("auth_user".parse::<Relation>().unwrap(), Relation::Users);

        for bad in ["django_session", "auth_user; DROP TABLE x", ""] {
            assert!(matches!(
                bad.parse::<Relation>(),
                Err(StoreError::UnknownRelation(_))
            ));
        }
    }

    #[test]
    fn extract_returns_exactly_the_stored_columns() {
        let store = test_store(SCHEMA);
        let df = extract("users", &store).unwrap();

        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["id", "password", "username", "email", "date_joined"]);
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn extract_types_columns_by_stored_values() {
        let store = test_store(SCHEMA);
        let df = store.extract(Relation::Consultations).unwrap();

        assert_eq!(df.column("user_id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("patologia").unwrap().dtype(), &DataType::String);
        // 61.5 and 70 mix real and integer storage.
        assert_eq!(df.column("peso").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("user_id").unwrap().null_count(), 1);
    }

    #[test]
    fn mixed_text_and_integer_column_becomes_text() {
        let store = test_store(
            "CREATE TABLE main_consulta (user_id);
             INSERT INTO main_consulta VALUES (1);
             INSERT INTO main_consulta VALUES ('u-2');",
        );
        let df = store.extract(Relation::Consultations).unwrap();
        let col = df.column("user_id").unwrap();
        assert_eq!(col.dtype(), &DataType::String);
        assert_eq!(col.str().unwrap().get(0), Some("1"));
        assert_eq!(col.str().unwrap().get(1), Some("u-2"));
    }

    #[test]
    fn missing_relation_is_a_store_error() {
        let store = test_store("CREATE TABLE auth_user (id INTEGER);");
        let err = store.extract(Relation::Consultations).unwrap_err();
        assert!(matches!(err, StoreError::MissingRelation(Relation::Consultations)));
    }

    #[test]
    fn empty_relation_yields_empty_frame_with_columns() {
        let store = test_store("CREATE TABLE auth_user (id INTEGER, username TEXT);");
        let df = store.extract(Relation::Users).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn open_rejects_non_sqlite_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for _ in 0..256 {
            file.write_all(b"id,username,email\n").unwrap();
        }
        file.flush().unwrap();

        let err = Store::open(file.path()).err().unwrap();
        assert!(matches!(err, StoreError::Unreadable(_)));
    }

    #[test]
    fn open_reads_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite3");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert!(store.has_relation(Relation::Users).unwrap());
        assert_eq!(store.extract(Relation::Consultations).unwrap().height(), 2);
    }
}
