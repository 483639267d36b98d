use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use super::{CatalogError, CatalogStore};

/// A column as declared in the live schema. `declared_type` is the engine's
/// own type name and is not normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl CatalogStore {
    /// Names of every table in the catalog, in the order the store reports them.
    /// Returns an empty list when there is no connection or the lookup fails.
    pub fn list_tables(&self) -> Vec<String> {
        info!(" - DB CALL: list_tables");
        let Some(conn) = self.connection() else {
            warn!("list_tables: {}", CatalogError::StoreUnavailable);
            return Vec::new();
        };
        match query_table_names(conn) {
            Ok(tables) => tables,
            Err(e) => {
                warn!("list_tables failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Columns of `table_name` in physical order.
    ///
    /// The name is spliced directly into `PRAGMA table_info(...)`, so callers
    /// must only pass names they trust. An unknown table yields an empty list.
    pub fn describe_table(&self, table_name: &str) -> Vec<ColumnDescriptor> {
        info!(" - DB CALL: describe_table({})", table_name);
        let Some(conn) = self.connection() else {
            warn!("describe_table: {}", CatalogError::StoreUnavailable);
            return Vec::new();
        };
        match query_table_info(conn, table_name) {
            Ok(columns) => columns,
            Err(e) => {
                warn!("describe_table({}) failed: {}", table_name, e);
                Vec::new()
            }
        }
    }

    pub fn table_descriptor(&self, table_name: &str) -> TableDescriptor {
        TableDescriptor {
            name: table_name.to_string(),
            columns: self.describe_table(table_name),
        }
    }
}

fn query_table_names(conn: &Connection) -> Result<Vec<String>, CatalogError> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table';")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut tables = Vec::new();
    for row in rows {
        tables.push(row?);
    }
    Ok(tables)
}

fn query_table_info(conn: &Connection, table_name: &str) -> Result<Vec<ColumnDescriptor>, CatalogError> {
    // Row layout: cid, name, type, notnull, dflt_value, pk
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table_name))?;
    let rows = stmt.query_map([], |row| {
        Ok(ColumnDescriptor {
            name: row.get(1)?,
            declared_type: row.get(2)?,
        })
    })?;
    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}
