//! SQLite schema definition.

/// Interaction store schema.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Drug Interactions (bulk loaded, read-only at runtime)
-- ============================================================================

CREATE TABLE IF NOT EXISTS drug_interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id_a TEXT NOT NULL CHECK (source_id_a <> '' AND length(source_id_a) <= 50),
    source_id_b TEXT NOT NULL CHECK (source_id_b <> '' AND length(source_id_b) <= 50),
    drug_a TEXT NOT NULL CHECK (drug_a <> '' AND length(drug_a) <= 255),
    drug_b TEXT NOT NULL CHECK (drug_b <> '' AND length(drug_b) <= 255),
    severity TEXT NOT NULL CHECK (severity IN ('Minor', 'Moderate', 'Major', 'Unknown')),
    categories TEXT NOT NULL CHECK (categories <> ''),  -- comma-joined category letters
    UNIQUE (source_id_a, source_id_b)
);

CREATE INDEX IF NOT EXISTS idx_interactions_ids ON drug_interactions(source_id_a, source_id_b);
CREATE INDEX IF NOT EXISTS idx_interactions_drugs_lower ON drug_interactions(lower(drug_a), lower(drug_b));
"#;

/// Failed lookup log schema (append-only).
pub const FAILED_LOOKUPS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS failed_drug_lookups (
    id TEXT PRIMARY KEY,
    drugs TEXT NOT NULL,                         -- JSON array of strings
    source TEXT NOT NULL CHECK (source <> ''),
    failed_at TEXT NOT NULL                      -- RFC 3339
);

CREATE INDEX IF NOT EXISTS idx_failed_lookups_source ON failed_drug_lookups(source);

CREATE TRIGGER IF NOT EXISTS failed_drug_lookups_no_update BEFORE UPDATE ON failed_drug_lookups
BEGIN
    SELECT RAISE(ABORT, 'Failed lookups are append-only');
END;

CREATE TRIGGER IF NOT EXISTS failed_drug_lookups_no_delete BEFORE DELETE ON failed_drug_lookups
BEGIN
    SELECT RAISE(ABORT, 'Failed lookups are append-only');
END;
"#;
