use crate::SqlitePreferences;
use anyhow::Result;
use rusqlite::OptionalExtension;

impl SqlitePreferences {
    pub fn read(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM preferences WHERE namespace = ?1 AND key = ?2",
                    (self.namespace(), key),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO preferences (namespace, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (namespace, key)
                 DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                (self.namespace(), key, value),
            )?;
            Ok(())
        })
    }

    /// Returns true if a row was deleted.
    pub fn remove(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM preferences WHERE namespace = ?1 AND key = ?2",
                (self.namespace(), key),
            )?;
            Ok(n > 0)
        })
    }

    /// Drop every key in this namespace. Other namespaces are untouched.
    pub fn clear(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM preferences WHERE namespace = ?1",
                [self.namespace()],
            )?;
            Ok(n)
        })
    }
}
