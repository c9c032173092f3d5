//! Entity record storage.
//!
//! Each entity kind is a flat mapping from id to a serialized record, listed
//! back in insertion order. The preferences singleton lives in its own pinned
//! row.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::entities::EntityKind;
use crate::error::{Error, Result};

use super::Storage;

impl Storage {
    /// Insert a serialized record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails, including when the
    /// id is already taken for this kind.
    pub fn insert_record(&self, kind: EntityKind, id: &str, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (kind, id, body) VALUES (?1, ?2, ?3)",
            params![kind.as_str(), id, body],
        )?;
        debug!("Inserted {} {}", kind, id);
        Ok(())
    }

    /// Get a serialized record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_record(&self, kind: EntityKind, id: &str) -> Result<Option<String>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    /// All records of a kind, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_records(&self, kind: EntityKind) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM records WHERE kind = ?1 ORDER BY seq ASC")?;
        let bodies = stmt
            .query_map([kind.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(bodies)
    }

    /// Replace the body of an existing record.
    ///
    /// Returns `false` if no record has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_record(&self, kind: EntityKind, id: &str, body: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE records SET body = ?3 WHERE kind = ?1 AND id = ?2",
            params![kind.as_str(), id, body],
        )?;
        Ok(affected > 0)
    }

    /// Delete a record.
    ///
    /// Returns `true` if a record was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_record(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM records WHERE kind = ?1 AND id = ?2",
            params![kind.as_str(), id],
        )?;
        Ok(affected > 0)
    }

    /// Count records of a kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_records(&self, kind: EntityKind) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE kind = ?1",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// The serialized preferences singleton.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the row is missing.
    pub fn preferences_body(&self) -> Result<String> {
        self.conn
            .query_row(
                "SELECT body FROM preferences WHERE singleton = 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::internal("preferences row missing"))
    }

    /// Replace the preferences singleton.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_preferences_body(&self, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO preferences (singleton, body) VALUES (1, ?1)",
            [body],
        )?;
        Ok(())
    }
}
