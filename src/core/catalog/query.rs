use tracing::{error, info};

use super::{CatalogError, CatalogStore, NoticeKind, Scalar};

pub type Row = Vec<Scalar>;
pub type QueryResult = Vec<Row>;

/// Undo the `\'` escaping some models apply to string literals.
/// Not SQL-aware: every occurrence is rewritten.
pub fn normalize_sql(sql: &str) -> String {
    sql.replace("\\'", "'")
}

impl CatalogStore {
    /// Run one statement and return every row it produces.
    ///
    /// An empty statement is rejected with `InvalidArgument`. Anything the
    /// store itself rejects is reported as a notice and comes back as an
    /// empty result, the same shape as a query that matched nothing.
    pub fn execute_query(&self, sql: &str) -> Result<QueryResult, CatalogError> {
        info!(" - DB CALL: execute_query");
        if sql.trim().is_empty() {
            return Err(CatalogError::InvalidArgument(
                "SQL query must be a non-empty string".to_string(),
            ));
        }

        let Some(conn) = self.connection() else {
            error!("Error: {}", CatalogError::StoreUnavailable);
            return Ok(Vec::new());
        };

        info!(" - SQL Query before: {}", sql);
        let sql = normalize_sql(sql);
        info!(" - SQL Query after: {}", sql);

        match run_statement(conn, &sql) {
            Ok(rows) => {
                info!(" - Query returned {} row(s)", rows.len());
                Ok(rows)
            }
            Err(e) => {
                error!("Database error: {}", e);
                self.notices()
                    .push(NoticeKind::QueryError, format!("Query error: {}", e));
                Ok(Vec::new())
            }
        }
    }
}

fn run_statement(conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let width = stmt.column_count();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(Scalar::from(row.get_ref(idx)?));
        }
        out.push(values);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::seed;

    fn seeded_store() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        seed::create_schema(conn).unwrap();
        conn.execute(
            "INSERT INTO tech_products (id, name, description, price, stock, category) \
             VALUES (1, 'Logitech G203', 'gaming mouse', 39.99, 10, 'mouse')",
            [],
        )
        .unwrap();
        store
    }

    #[test]
    fn category_lookup_returns_the_seeded_row() {
        let store = seeded_store();
        let rows = store
            .execute_query("SELECT * FROM tech_products WHERE LOWER(category)='mouse'")
            .unwrap();
        assert_eq!(
            rows,
            vec![vec![
                Scalar::Integer(1),
                Scalar::from("Logitech G203"),
                Scalar::from("gaming mouse"),
                Scalar::Real(39.99),
                Scalar::Integer(10),
                Scalar::from("mouse"),
            ]]
        );
    }

    #[test]
    fn row_width_matches_projection() {
        let store = seeded_store();
        let rows = store
            .execute_query("SELECT name, price FROM tech_products")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| r.len() == 2));
    }

    #[test]
    fn escaped_quotes_are_normalized() {
        assert_eq!(
            normalize_sql("SELECT * FROM t WHERE name = \\'Mouse\\'"),
            "SELECT * FROM t WHERE name = 'Mouse'"
        );
    }

    #[test]
    fn escaped_literal_executes_after_normalization() {
        let store = seeded_store();
        let rows = store
            .execute_query("SELECT id FROM tech_products WHERE name = \\'Logitech G203\\'")
            .unwrap();
        assert_eq!(rows, vec![vec![Scalar::Integer(1)]]);
        assert!(store.notices().is_empty());
    }

    #[test]
    fn empty_sql_is_invalid() {
        let store = seeded_store();
        assert!(matches!(
            store.execute_query(""),
            Err(CatalogError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.execute_query("   "),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_sql_is_invalid_even_without_connection() {
        let store = CatalogStore::disconnected();
        assert!(matches!(
            store.execute_query(""),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_table_is_masked_and_noticed() {
        let store = seeded_store();
        let rows = store.execute_query("SELECT * FROM warehouses").unwrap();
        assert!(rows.is_empty());
        let notices = store.notices().drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::QueryError);
        assert!(notices[0].message.contains("no such table"));
    }

    #[test]
    fn no_match_is_empty_without_notice() {
        let store = seeded_store();
        let rows = store
            .execute_query("SELECT * FROM tech_products WHERE price > 10000")
            .unwrap();
        assert!(rows.is_empty());
        assert!(store.notices().is_empty());
    }

    #[test]
    fn disconnected_store_returns_empty() {
        let store = CatalogStore::disconnected();
        let rows = store.execute_query("SELECT 1").unwrap();
        assert!(rows.is_empty());
        assert!(store.notices().is_empty());
    }

    #[test]
    fn mutating_statements_are_not_blocked() {
        let store = seeded_store();
        let rows = store
            .execute_query("UPDATE tech_products SET stock = 0 WHERE id = 1")
            .unwrap();
        assert!(rows.is_empty());
        let stock = store
            .execute_query("SELECT stock FROM tech_products WHERE id = 1")
            .unwrap();
        assert_eq!(stock, vec![vec![Scalar::Integer(0)]]);
    }
}
