//! SQLite schema definitions and SQL query constants.
//!
//! Entities are kept as JSON documents partitioned by entity type. Unique
//! keys get their own table so the primary key enforces them.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
-- Entity documents
CREATE TABLE IF NOT EXISTS documents (
    entity_type TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (entity_type, id)
);

-- Unique keys, owned by one document each
CREATE TABLE IF NOT EXISTS unique_keys (
    entity_type TEXT NOT NULL,
    idx TEXT NOT NULL,
    value TEXT NOT NULL,
    id TEXT NOT NULL,
    PRIMARY KEY (entity_type, idx, value)
);

CREATE INDEX IF NOT EXISTS idx_unique_keys_owner ON unique_keys(entity_type, id);
"#;

pub const SELECT_DOCUMENTS: &str = r#"
SELECT body
FROM documents
WHERE entity_type = ?1
ORDER BY id
"#;

pub const SELECT_DOCUMENT: &str = r#"
SELECT body
FROM documents
WHERE entity_type = ?1 AND id = ?2
"#;

pub const INSERT_DOCUMENT: &str = r#"
INSERT INTO documents (entity_type, id, body)
VALUES (?1, ?2, ?3)
"#;

pub const UPDATE_DOCUMENT: &str = r#"
UPDATE documents
SET body = ?3
WHERE entity_type = ?1 AND id = ?2
"#;

pub const DELETE_DOCUMENT: &str = r#"
DELETE FROM documents
WHERE entity_type = ?1 AND id = ?2
"#;

pub const INSERT_UNIQUE_KEY: &str = r#"
INSERT INTO unique_keys (entity_type, idx, value, id)
VALUES (?1, ?2, ?3, ?4)
"#;

pub const DELETE_UNIQUE_KEYS: &str = r#"
DELETE FROM unique_keys
WHERE entity_type = ?1 AND id = ?2
"#;
