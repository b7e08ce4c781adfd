//! Database schema SQL.

/// Core tables: catalog_items, item_embeddings, edges.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_items (
    id TEXT PRIMARY KEY,
    item_type TEXT NOT NULL,
    title TEXT NOT NULL,
    item_json TEXT NOT NULL,
    content_hash TEXT UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_catalog_type ON catalog_items(item_type);
CREATE INDEX IF NOT EXISTS idx_catalog_hash ON catalog_items(content_hash);

CREATE TABLE IF NOT EXISTS item_embeddings (
    item_id TEXT PRIMARY KEY REFERENCES catalog_items(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    scale REAL NOT NULL,
    offset_val REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS edges (
    item_a TEXT NOT NULL,
    item_b TEXT NOT NULL,
    score REAL NOT NULL CHECK (score >= 0),
    PRIMARY KEY (item_a, item_b)
);

CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(item_b);
"#;
