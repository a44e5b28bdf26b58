//! Failed lookup log operations (append-only).

use chrono::{DateTime, Utc};
use rusqlite::params;

use super::{Database, DbError, DbResult};
use crate::models::FailedLookup;

impl Database {
    /// Append a failed lookup record.
    pub fn insert_failed_lookup(&self, lookup: &FailedLookup) -> DbResult<()> {
        let drugs_json = serde_json::to_string(&lookup.drugs)?;

        self.conn.execute(
            r#"
            INSERT INTO failed_drug_lookups (id, drugs, source, failed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![lookup.id, drugs_json, lookup.source, lookup.failed_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// List failed lookups, oldest first.
    pub fn list_failed_lookups(&self) -> DbResult<Vec<FailedLookup>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, drugs, source, failed_at
            FROM failed_drug_lookups
            ORDER BY failed_at, rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(FailedLookupRow {
                id: row.get(0)?,
                drugs: row.get(1)?,
                source: row.get(2)?,
                failed_at: row.get(3)?,
            })
        })?;

        let mut lookups = Vec::new();
        for row in rows {
            lookups.push(row?.try_into()?);
        }
        Ok(lookups)
    }
}

/// Intermediate row struct for database mapping.
struct FailedLookupRow {
    id: String,
    drugs: String,
    source: String,
    failed_at: String,
}

impl TryFrom<FailedLookupRow> for FailedLookup {
    type Error = DbError;

    fn try_from(row: FailedLookupRow) -> Result<Self, Self::Error> {
        let failed_at = DateTime::parse_from_rfc3339(&row.failed_at)
            .map_err(|e| DbError::Constraint(format!("bad failed_at timestamp {:?}: {}", row.failed_at, e)))?
            .with_timezone(&Utc);

        Ok(FailedLookup {
            id: row.id,
            drugs: serde_json::from_str(&row.drugs)?,
            source: row.source,
            failed_at,
        })
    }
}
