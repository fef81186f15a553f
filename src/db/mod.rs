pub mod connection;

pub use crate::db::connection::{init_pool, DbPool};

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::errors::CoreError;
use crate::models::{CellValue, Row};

/// Run a closure against a pooled connection. Operations themselves take the
/// executor handle, so a caller holding a transaction passes that instead.
pub fn with_connection<T, F>(pool: &DbPool, f: F) -> Result<T, CoreError>
where
    F: FnOnce(&Connection) -> Result<T, CoreError>,
{
    let conn = pool.get()?;
    f(&conn)
}

/// Prepare (cached), execute, and scan a SELECT into raw column-name maps.
/// Statement and rows close on all paths when dropped.
pub fn fetch_rows(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, CoreError> {
    let mut stmt = conn.prepare_cached(sql).map_err(|e| {
        CoreError::DatabaseError(format!("failed to prepare statement [{}]: {}", sql, e))
    })?;
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = stmt
        .query(params_from_iter(params.iter()))
        .map_err(|e| CoreError::DatabaseError(format!("failed to execute [{}]: {}", sql, e)))?;

    let mut result = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|e| CoreError::DatabaseError(format!("failed to scan [{}]: {}", sql, e)))?
    {
        let mut map = Row::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            map.insert(name.clone(), CellValue::from(row.get_ref(i)?));
        }
        result.push(map);
    }
    Ok(result)
}

/// Execute an INSERT, UPDATE, or DELETE; returns the affected row count.
pub fn execute(conn: &Connection, sql: &str, params: &[Value]) -> Result<usize, CoreError> {
    let mut stmt = conn.prepare_cached(sql).map_err(|e| {
        CoreError::DatabaseError(format!("failed to prepare statement [{}]: {}", sql, e))
    })?;
    stmt.execute(params_from_iter(params.iter()))
        .map_err(|e| CoreError::DatabaseError(format!("failed to execute [{}]: {}", sql, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE item (id INTEGER PRIMARY KEY, name TEXT, weight REAL, data BLOB);
             INSERT INTO item (id, name, weight, data) VALUES (1, 'anvil', 41.5, x'0102');
             INSERT INTO item (id, name, weight, data) VALUES (2, NULL, NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_fetch_rows_maps_every_column() {
        let conn = seeded_connection();
        let rows = fetch_rows(
            &conn,
            "SELECT * FROM item WHERE id = ?",
            &[Value::Integer(1)],
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&CellValue::Integer(1)));
        assert_eq!(
            rows[0].get("name"),
            Some(&CellValue::Text("anvil".to_string()))
        );
        assert_eq!(rows[0].get("weight"), Some(&CellValue::Real(41.5)));
        assert_eq!(rows[0].get("data"), Some(&CellValue::Blob(vec![1, 2])));
    }

    #[test]
    fn test_fetch_rows_keeps_nulls() {
        let conn = seeded_connection();
        let rows = fetch_rows(
            &conn,
            "SELECT * FROM item WHERE id = ?",
            &[Value::Integer(2)],
        )
        .unwrap();
        assert_eq!(rows[0].get("name"), Some(&CellValue::Null));
    }

    #[test]
    fn test_execute_reports_affected_rows() {
        let conn = seeded_connection();
        let affected = execute(&conn, "DELETE FROM item", &[]).unwrap();
        assert_eq!(affected, 2);
    }

    #[test]
    fn test_prepare_error_is_a_database_error() {
        let conn = seeded_connection();
        let err = fetch_rows(&conn, "SELECT * FROM missing_table", &[]).unwrap_err();
        assert!(matches!(err, CoreError::DatabaseError(_)));
    }

    #[test]
    fn test_with_connection_runs_against_the_pool() {
        let pool = init_pool(":memory:", 1);
        let count = with_connection(&pool, |conn| {
            conn.execute_batch("CREATE TABLE t (id INTEGER)")?;
            execute(conn, "INSERT INTO t (id) VALUES (?)", &[Value::Integer(1)])
        })
        .unwrap();
        assert_eq!(count, 1);
    }
}
