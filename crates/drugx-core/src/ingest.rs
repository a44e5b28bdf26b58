//! Bulk loader for the interaction store.
//!
//! Reads the interaction CSV (`ddinter_id_a, drug_a, ddinter_id_b, drug_b,
//! severity, categories`) and replaces the store's contents in one
//! transaction. Rows repeating an id pair are merged by taking the union of
//! their categories.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{InteractionRecord, Severity};

/// Ingest errors.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid row {line}: {message}")]
    InvalidRow { line: u64, message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// One CSV row as written by the interaction data processor.
#[derive(Debug, Deserialize)]
struct InteractionCsvRow {
    ddinter_id_a: String,
    drug_a: String,
    ddinter_id_b: String,
    drug_b: String,
    severity: String,
    categories: String,
}

/// Parse and validate interaction rows from any reader.
pub fn read_interactions<R: Read>(reader: R) -> IngestResult<Vec<InteractionRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records: Vec<InteractionRecord> = Vec::new();
    let mut by_ids: HashMap<(String, String), usize> = HashMap::new();

    for (index, row) in csv_reader.deserialize::<InteractionCsvRow>().enumerate() {
        // Header is line 1
        let line = index as u64 + 2;
        let record = validate_row(row?, line)?;

        match by_ids.get(&record.source_ids) {
            Some(&existing) => {
                let merged = &mut records[existing];
                if merged.severity != record.severity {
                    return Err(IngestError::InvalidRow {
                        line,
                        message: format!(
                            "severity {} conflicts with {} for {}/{}",
                            record.severity, merged.severity, record.source_ids.0, record.source_ids.1
                        ),
                    });
                }
                merged.categories.extend(record.categories);
            }
            None => {
                by_ids.insert(record.source_ids.clone(), records.len());
                records.push(record);
            }
        }
    }

    Ok(records)
}

fn validate_row(row: InteractionCsvRow, line: u64) -> IngestResult<InteractionRecord> {
    let invalid = |message: String| IngestError::InvalidRow { line, message };

    for (field, value, max) in [
        ("ddinter_id_a", &row.ddinter_id_a, 50),
        ("ddinter_id_b", &row.ddinter_id_b, 50),
        ("drug_a", &row.drug_a, 255),
        ("drug_b", &row.drug_b, 255),
    ] {
        if value.is_empty() {
            return Err(invalid(format!("{} is empty", field)));
        }
        if value.chars().count() > max {
            return Err(invalid(format!("{} is longer than {} characters", field, max)));
        }
    }

    let severity: Severity = row.severity.parse().map_err(invalid)?;
    let categories = InteractionRecord::parse_categories(&row.categories)
        .ok_or_else(|| invalid(format!("no category codes in {:?}", row.categories)))?;

    Ok(InteractionRecord {
        severity,
        source_ids: (row.ddinter_id_a, row.ddinter_id_b),
        drugs: (row.drug_a, row.drug_b),
        categories,
    })
}

/// Load the CSV at `path`, replacing every stored interaction.
/// Returns the number of interactions stored.
pub fn load_interactions_csv<P: AsRef<Path>>(path: P, db: &mut Database) -> IngestResult<usize> {
    let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
    let records = read_interactions(file)?;
    let loaded = db.replace_interactions(&records)?;
    tracing::info!(path = %path.as_ref().display(), loaded, "Loaded interactions");
    Ok(loaded)
}
