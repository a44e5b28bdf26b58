//! Interaction store operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{InteractionRecord, Severity};

impl Database {
    /// Find an interaction by case-insensitive substring match in either
    /// orientation. The lowest `id` wins when several rows match.
    pub fn find_interaction(&self, drug_a: &str, drug_b: &str) -> DbResult<Option<InteractionRecord>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT source_id_a, source_id_b, drug_a, drug_b, severity, categories
                FROM drug_interactions
                WHERE (instr(lower(drug_a), lower(?1)) > 0 AND instr(lower(drug_b), lower(?2)) > 0)
                   OR (instr(lower(drug_a), lower(?2)) > 0 AND instr(lower(drug_b), lower(?1)) > 0)
                ORDER BY id
                LIMIT 1
                "#,
                params![drug_a, drug_b],
                |row| {
                    Ok(InteractionRow {
                        source_id_a: row.get(0)?,
                        source_id_b: row.get(1)?,
                        drug_a: row.get(2)?,
                        drug_b: row.get(3)?,
                        severity: row.get(4)?,
                        categories: row.get(5)?,
                    })
                },
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// Replace the whole interaction table in one transaction.
    ///
    /// Any rejected row rolls the load back and leaves the previous contents.
    pub fn replace_interactions(&mut self, records: &[InteractionRecord]) -> DbResult<usize> {
        let tx = self.transaction()?;
        tx.execute("DELETE FROM drug_interactions", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO drug_interactions (source_id_a, source_id_b, drug_a, drug_b, severity, categories)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for record in records {
                if record.categories.is_empty() {
                    return Err(DbError::Constraint(format!(
                        "interaction {}/{} has no categories",
                        record.source_ids.0, record.source_ids.1
                    )));
                }
                stmt.execute(params![
                    record.source_ids.0,
                    record.source_ids.1,
                    record.drugs.0,
                    record.drugs.1,
                    record.severity.as_str(),
                    join_categories(record),
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Number of stored interactions.
    pub fn count_interactions(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM drug_interactions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn join_categories(record: &InteractionRecord) -> String {
    record
        .categories
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Intermediate row struct for database mapping.
struct InteractionRow {
    source_id_a: String,
    source_id_b: String,
    drug_a: String,
    drug_b: String,
    severity: String,
    categories: String,
}

impl TryFrom<InteractionRow> for InteractionRecord {
    type Error = DbError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        let severity: Severity = row.severity.parse().map_err(DbError::Constraint)?;
        let categories = InteractionRecord::parse_categories(&row.categories).ok_or_else(|| {
            DbError::Constraint(format!(
                "interaction {}/{} has no category codes",
                row.source_id_a, row.source_id_b
            ))
        })?;

        Ok(InteractionRecord {
            severity,
            source_ids: (row.source_id_a, row.source_id_b),
            drugs: (row.drug_a, row.drug_b),
            categories,
        })
    }
}
