//! The boundary between the application and its SQL store.
//!
//! Callers only ever hand a statement and its parameters to a [`Gateway`];
//! rows come back addressable by column name. [`SqliteGateway`] is the
//! rusqlite-backed implementation and owns its connection outright.

use std::{collections::HashMap, fs, path::Path};

use rusqlite::{
    params_from_iter,
    types::{ToSqlOutput, Value, ValueRef},
    Connection, ToSql,
};
use tracing::debug;

use crate::error::{PersistenceError, SqlResult};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(value as i64)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::from(*i),
            SqlValue::Real(f) => ToSqlOutput::from(*f),
            SqlValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, SqlValue>,
}

impl Row {
    pub fn new(values: HashMap<String, SqlValue>) -> Self {
        Row { values }
    }

    pub fn get(&self, column: &str) -> SqlResult<&SqlValue> {
        self.values
            .get(column)
            .ok_or_else(|| PersistenceError::Malformed(format!("missing column '{column}'")))
    }

    pub fn get_i64(&self, column: &str) -> SqlResult<i64> {
        match self.get(column)? {
            SqlValue::Integer(i) => Ok(*i),
            other => Err(unexpected(column, "integer", other)),
        }
    }

    pub fn get_bool(&self, column: &str) -> SqlResult<bool> {
        Ok(self.get_i64(column)? != 0)
    }

    pub fn get_text(&self, column: &str) -> SqlResult<&str> {
        match self.get(column)? {
            SqlValue::Text(s) => Ok(s),
            other => Err(unexpected(column, "text", other)),
        }
    }

    pub fn get_opt_text(&self, column: &str) -> SqlResult<Option<&str>> {
        match self.get(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s)),
            other => Err(unexpected(column, "text or null", other)),
        }
    }
}

fn unexpected(column: &str, wanted: &str, found: &SqlValue) -> PersistenceError {
    PersistenceError::Malformed(format!("column '{column}': expected {wanted}, found {found:?}"))
}

/// Read/write contract the rest of the crate relies on.
pub trait Gateway {
    /// Runs one mutating statement and returns the number of affected rows.
    fn execute(&self, statement: &str, params: &[SqlValue]) -> SqlResult<usize>;

    /// Runs one statement that yields rows.
    fn query(&self, statement: &str, params: &[SqlValue]) -> SqlResult<Vec<Row>>;
}

pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    pub fn open(path: &Path) -> SqlResult<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.is_dir() {
                fs::create_dir_all(dir)?;
            }
        }
        debug!(path = %path.display(), "opening sqlite database");
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> SqlResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqlResult<Self> {
        // Cascading deletes from lists to tasks depend on this.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(SqliteGateway { conn })
    }
}

impl Gateway for SqliteGateway {
    fn execute(&self, statement: &str, params: &[SqlValue]) -> SqlResult<usize> {
        debug!(statement, params = params.len(), "execute");
        Ok(self.conn.execute(statement, params_from_iter(params.iter()))?)
    }

    fn query(&self, statement: &str, params: &[SqlValue]) -> SqlResult<Vec<Row>> {
        debug!(statement, params = params.len(), "query");
        let mut stmt = self.conn.prepare(statement)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = HashMap::with_capacity(columns.len());
            for (index, name) in columns.iter().enumerate() {
                let value = match row.get_ref(index)? {
                    ValueRef::Null => SqlValue::Null,
                    ValueRef::Integer(i) => SqlValue::Integer(i),
                    ValueRef::Real(f) => SqlValue::Real(f),
                    ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(_) => {
                        return Err(PersistenceError::Malformed(format!(
                            "column '{name}' holds a blob"
                        )))
                    }
                };
                values.insert(name.clone(), value);
            }
            result.push(Row::new(values));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rows_are_addressable_by_column_name() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        gateway
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, label TEXT, note TEXT)", &[])
            .unwrap();
        let inserted = gateway
            .execute(
                "INSERT INTO t (label, note) VALUES (?1, ?2)",
                &["hello".into(), SqlValue::from(None::<String>)],
            )
            .unwrap();
        assert_eq!(inserted, 1);

        let rows = gateway.query("SELECT id, label, note FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64("id").unwrap(), 1);
        assert_eq!(rows[0].get_text("label").unwrap(), "hello");
        assert_eq!(rows[0].get_opt_text("note").unwrap(), None);
    }

    #[test]
    fn wrong_column_type_is_malformed() {
        let mut values = HashMap::new();
        values.insert("pinned".to_string(), SqlValue::Text("yes".into()));
        let row = Row::new(values);
        assert!(matches!(row.get_bool("pinned"), Err(PersistenceError::Malformed(_))));
        assert!(matches!(row.get_text("missing"), Err(PersistenceError::Malformed(_))));
    }

    #[test]
    fn unique_violation_maps_to_duplicate() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        gateway
            .execute("CREATE TABLE t (name TEXT NOT NULL UNIQUE)", &[])
            .unwrap();
        gateway.execute("INSERT INTO t (name) VALUES (?1)", &["a".into()]).unwrap();
        let err = gateway
            .execute("INSERT INTO t (name) VALUES (?1)", &["a".into()])
            .unwrap_err();
        assert!(err.is_duplicate(), "{err}");
    }

    #[test]
    fn bad_statement_is_a_sqlite_error() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let err = gateway.query("SELECT * FROM nowhere", &[]).unwrap_err();
        assert!(matches!(err, PersistenceError::Sqlite(_)));
        let source = std::error::Error::source(&err).expect("sqlite cause is kept");
        assert!(source.to_string().contains("nowhere"), "{source}");
    }
}
