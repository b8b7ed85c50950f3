use super::DbResult;
use rusqlite::Connection;

/// Table column listing used by schema-aware criteria.
pub trait SchemaSource {
    /// Column names of `table` in declaration order; empty when the table
    /// does not exist.
    fn list_columns(&self, table: &str) -> DbResult<Vec<String>>;
}

impl SchemaSource for Connection {
    fn list_columns(&self, table: &str) -> DbResult<Vec<String>> {
        let escaped = table.replace('"', "\"\"");
        let mut stmt = self.prepare(&format!("PRAGMA table_info(\"{escaped}\");"))?;
        let mut rows = stmt.query([])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            columns.push(row.get::<_, String>(1)?);
        }
        Ok(columns)
    }
}
