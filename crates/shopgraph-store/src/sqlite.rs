//! SQLite-backed store: catalog items, quantized item embeddings, and the
//! co-purchase edge graph.
//!
//! One connection behind a mutex, WAL mode. Edge increments go through a
//! single upsert statement so concurrent feedback events serialize inside
//! SQLite instead of racing in application code.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Axis};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::embedding::{dequantize_uint8, quantize_uint8};
use crate::schema::SCHEMA_SQL;
use crate::types::*;
use shopgraph_core::{Error, Result};

/// SQLite store with catalog, embeddings, and edge graph tables.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    embedding_dim: usize,
    /// Pre-loaded normalized embedding matrix for vector search: (N, dim) float32.
    embedding_matrix: Mutex<EmbeddingMatrix>,
}

struct EmbeddingMatrix {
    /// Normalized embeddings, shape (N, dim).
    matrix: Array2<f32>,
    /// Item IDs corresponding to each row.
    item_ids: Vec<String>,
    /// Whether the matrix needs reloading.
    dirty: bool,
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/graphdb/`). The file will be
    /// `db_dir/shopgraph.db`.
    pub fn open(db_dir: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("shopgraph.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            embedding_dim,
            embedding_matrix: Mutex::new(EmbeddingMatrix {
                matrix: Array2::zeros((0, embedding_dim)),
                item_ids: Vec::new(),
                dirty: true,
            }),
        };

        store.load_embedding_matrix()?;

        let item_count = store.count_items(None)?;
        let edge_count = store.count_all_edges()?;
        info!(
            "SqliteStore initialized: {} items, {} edges, dim={}, path={}",
            item_count,
            edge_count,
            embedding_dim,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -65536;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    fn now_millis() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    // ---------------------------------------------------------------
    // Catalog CRUD
    // ---------------------------------------------------------------

    /// Insert a catalog item. Fails with `DuplicateItem` when the content
    /// hash is already present.
    pub fn add_item(&self, item: &CatalogItem, content_hash: Option<&str>) -> Result<()> {
        let item_json = serde_json::to_string(item)?;
        let now = Self::now_millis();

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO catalog_items (id, item_type, title, item_json, content_hash, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            item.id(),
            item.item_type(),
            item.title(),
            item_json,
            content_hash,
            now
        ])
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                Error::DuplicateItem(content_hash.unwrap_or(item.id()).to_string())
            } else {
                Error::Database(e.to_string())
            }
        })?;
        Ok(())
    }

    /// Find an item ID by content hash.
    pub fn find_item_by_hash(&self, content_hash: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached("SELECT id FROM catalog_items WHERE content_hash = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![content_hash], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(id)
    }

    /// Get a catalog item by ID.
    pub fn get_item(&self, item_id: &str) -> Result<Option<CatalogItem>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .prepare_cached("SELECT item_json FROM catalog_items WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![item_id], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
    }

    /// Batch fetch items, preserving the order of the requested IDs.
    /// Unknown IDs are silently dropped.
    pub fn get_items(&self, item_ids: &[String]) -> Result<Vec<CatalogItem>> {
        let mut items = Vec::with_capacity(item_ids.len());
        for id in item_ids {
            if let Some(item) = self.get_item(id)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Get items with pagination. Returns (items, total_count).
    pub fn items_paginated(&self, page: usize, page_size: usize) -> Result<(Vec<CatalogItem>, i64)> {
        let total = self.count_items(None)?;
        let offset = (page.saturating_sub(1)) * page_size;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT item_json FROM catalog_items ORDER BY created_at DESC, id ASC \
                 LIMIT ?1 OFFSET ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![page_size as i64, offset as i64], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        let items: Vec<CatalogItem> = rows
            .filter_map(|r| r.ok())
            .filter_map(|j| serde_json::from_str(&j).ok())
            .collect();
        Ok((items, total))
    }

    /// Count items, optionally filtered by type.
    pub fn count_items(&self, item_type: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = match item_type {
            Some(t) => conn
                .query_row(
                    "SELECT COUNT(*) FROM catalog_items WHERE item_type = ?1",
                    params![t],
                    |row| row.get(0),
                )
                .map_err(|e| Error::Database(e.to_string()))?,
            None => conn
                .query_row("SELECT COUNT(*) FROM catalog_items", [], |row| row.get(0))
                .map_err(|e| Error::Database(e.to_string()))?,
        };
        Ok(count)
    }

    /// Delete an item and its embedding (cascade).
    pub fn delete_item(&self, item_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM catalog_items WHERE id = ?1", params![item_id])
            .map_err(|e| Error::Database(e.to_string()))?;
        if count > 0 {
            drop(conn);
            self.embedding_matrix.lock().dirty = true;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ---------------------------------------------------------------
    // Item embeddings
    // ---------------------------------------------------------------

    /// Store a quantized embedding for an item and fold it into the
    /// in-memory search matrix.
    pub fn add_item_embedding(&self, item_id: &str, embedding: &Array1<f32>) -> Result<()> {
        let (q_bytes, scale, offset) = quantize_uint8(embedding);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO item_embeddings (item_id, embedding, scale, offset_val) \
             VALUES (?1, ?2, ?3, ?4)",
            params![item_id, q_bytes, scale, offset],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);
        self.append_to_matrix(item_id, embedding)
    }

    /// Fold a just-persisted embedding into the in-memory matrix.
    ///
    /// A stale matrix is fully reloaded instead (the reload picks up the
    /// new row); a replaced embedding also forces a reload so the old row
    /// cannot linger.
    pub fn append_to_matrix(&self, item_id: &str, embedding: &Array1<f32>) -> Result<()> {
        let mut mat = self.embedding_matrix.lock();
        if !mat.dirty && mat.item_ids.iter().any(|id| id == item_id) {
            mat.dirty = true;
        }
        if mat.dirty {
            drop(mat);
            return self.load_embedding_matrix();
        }

        let norm = embedding.dot(embedding).sqrt();
        if norm < 1e-9 {
            return Ok(());
        }
        let normalized = embedding / norm;

        if mat.matrix.nrows() == 0 {
            mat.matrix = normalized.insert_axis(Axis(0)).to_owned();
        } else {
            mat.matrix
                .push(Axis(0), normalized.view())
                .map_err(|e| Error::Internal(format!("Matrix append failed: {}", e)))?;
        }
        mat.item_ids.push(item_id.to_string());
        Ok(())
    }

    /// Fetch an item's stored embedding, dequantized.
    pub fn embedding_for_item(&self, item_id: &str) -> Result<Option<Array1<f32>>> {
        let conn = self.conn.lock();
        let row: Option<(Vec<u8>, f64, f64)> = conn
            .prepare_cached(
                "SELECT embedding, scale, offset_val FROM item_embeddings WHERE item_id = ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![item_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row.map(|(blob, scale, offset)| dequantize_uint8(&blob, scale as f32, offset as f32)))
    }

    // ---------------------------------------------------------------
    // Vector Search
    // ---------------------------------------------------------------

    /// Load and normalize all item embeddings into a matrix for fast search.
    fn load_embedding_matrix(&self) -> Result<()> {
        let mut item_ids = Vec::new();
        let mut embeddings: Vec<Array1<f32>> = Vec::new();

        {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT item_id, embedding, scale, offset_val FROM item_embeddings \
                     ORDER BY item_id ASC",
                )
                .map_err(|e| Error::Database(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let item_id: String = row.get(0)?;
                    let blob: Vec<u8> = row.get(1)?;
                    let scale: f64 = row.get(2)?;
                    let offset: f64 = row.get(3)?;
                    Ok((item_id, blob, scale as f32, offset as f32))
                })
                .map_err(|e| Error::Database(e.to_string()))?;

            for row in rows {
                let (id, blob, scale, offset) = row.map_err(|e| Error::Database(e.to_string()))?;
                let emb = dequantize_uint8(&blob, scale, offset);
                item_ids.push(id);
                embeddings.push(emb);
            }
        } // conn and stmt dropped here

        let mut mat = self.embedding_matrix.lock();
        if embeddings.is_empty() {
            mat.matrix = Array2::zeros((0, self.embedding_dim));
            mat.item_ids = Vec::new();
            mat.dirty = false;
            return Ok(());
        }

        let n = embeddings.len();
        let dim = self.embedding_dim;
        let mut matrix = Array2::zeros((n, dim));
        for (i, emb) in embeddings.iter().enumerate() {
            matrix.row_mut(i).assign(emb);
        }

        // Normalize rows for cosine similarity via dot product
        for mut row in matrix.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 1e-9 {
                row /= norm;
            }
        }

        mat.matrix = matrix;
        mat.item_ids = item_ids;
        mat.dirty = false;
        debug!("Loaded {} embeddings into matrix", n);
        Ok(())
    }

    fn ensure_matrix_loaded(&self) -> Result<()> {
        if self.embedding_matrix.lock().dirty {
            self.load_embedding_matrix()?;
        }
        Ok(())
    }

    /// Cosine similarity search over the catalog.
    ///
    /// Results are descending by similarity, ties broken by item ID
    /// ascending so output is deterministic. Candidates below `threshold`
    /// are dropped. An empty or unloaded matrix yields an empty vec.
    pub fn vector_search(
        &self,
        query_embedding: &Array1<f32>,
        threshold: f64,
        top_k: usize,
    ) -> Result<Vec<CandidateHit>> {
        self.ensure_matrix_loaded()?;

        let mat = self.embedding_matrix.lock();
        if mat.matrix.nrows() == 0 {
            return Ok(Vec::new());
        }

        // Normalize query
        let q_norm = query_embedding.dot(query_embedding).sqrt();
        if q_norm < 1e-9 {
            return Ok(Vec::new());
        }
        let q = query_embedding / q_norm;

        // Matrix multiply: (N, dim) @ (dim,) → (N,)
        let similarities = mat.matrix.dot(&q);

        let mut hits: Vec<CandidateHit> = similarities
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s as f64 >= threshold)
            .map(|(i, &s)| CandidateHit {
                item_id: mat.item_ids[i].clone(),
                similarity: s as f64,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    // ---------------------------------------------------------------
    // Edge graph
    // ---------------------------------------------------------------

    /// Batch upsert edges; an existing row's score is replaced, not added.
    pub fn upsert_edges(&self, edges: &[Edge]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO edges (item_a, item_b, score) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(item_a, item_b) DO UPDATE SET score = excluded.score",
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            for edge in edges {
                stmt.execute(params![edge.item_a, edge.item_b, edge.score])
                    .map_err(|e| Error::Database(e.to_string()))?;
            }
        }
        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        Ok(edges.len())
    }

    /// Atomically add `delta` to an edge's score, creating the row at
    /// `delta` when missing. Single statement, safe under concurrent calls.
    pub fn increment_edge(&self, item_a: &str, item_b: &str, delta: f64) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO edges (item_a, item_b, score) VALUES (?1, ?2, ?3) \
             ON CONFLICT(item_a, item_b) DO UPDATE SET score = score + excluded.score",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![item_a, item_b, delta])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Ranked neighbors of an anchor: score descending, item_b ascending on
    /// ties.
    pub fn top_edges(&self, item_a: &str, limit: usize) -> Result<Vec<EdgeHit>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT item_b, score FROM edges WHERE item_a = ?1 \
                 ORDER BY score DESC, item_b ASC LIMIT ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![item_a, limit as i64], |row| {
                Ok(EdgeHit {
                    item_id: row.get(0)?,
                    score: row.get(1)?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Number of outgoing edges for an anchor.
    pub fn count_edges(&self, item_a: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .prepare_cached("SELECT COUNT(*) FROM edges WHERE item_a = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![item_a], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    /// Total edge rows in the store.
    pub fn count_all_edges(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    /// Atomic full-table replace: delete every prior row, insert the new
    /// batch, all in one transaction. Used once per aggregation run.
    pub fn replace_all_edges(&self, edges: &[Edge]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;
        tx.execute("DELETE FROM edges", [])
            .map_err(|e| Error::Database(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare_cached("INSERT INTO edges (item_a, item_b, score) VALUES (?1, ?2, ?3)")
                .map_err(|e| Error::Database(e.to_string()))?;
            for edge in edges {
                stmt.execute(params![edge.item_a, edge.item_b, edge.score])
                    .map_err(|e| Error::Database(e.to_string()))?;
            }
        }
        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        info!("Edge table replaced: {} rows", edges.len());
        Ok(edges.len())
    }

    /// Globally most-connected items by aggregate incoming edge score,
    /// optionally restricted to one item type. Deduped by construction
    /// (GROUP BY); empty store yields an empty vec.
    pub fn trending(&self, limit: usize, item_type: Option<&str>) -> Result<Vec<EdgeHit>> {
        let conn = self.conn.lock();
        let rows = match item_type {
            Some(t) => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT e.item_b, SUM(e.score) AS total FROM edges e \
                         JOIN catalog_items c ON c.id = e.item_b \
                         WHERE c.item_type = ?1 \
                         GROUP BY e.item_b ORDER BY total DESC, e.item_b ASC LIMIT ?2",
                    )
                    .map_err(|e| Error::Database(e.to_string()))?;
                let mapped = stmt
                    .query_map(params![t, limit as i64], |row| {
                        Ok(EdgeHit {
                            item_id: row.get(0)?,
                            score: row.get(1)?,
                        })
                    })
                    .map_err(|e| Error::Database(e.to_string()))?;
                mapped.filter_map(|r| r.ok()).collect()
            }
            None => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT item_b, SUM(score) AS total FROM edges \
                         GROUP BY item_b ORDER BY total DESC, item_b ASC LIMIT ?1",
                    )
                    .map_err(|e| Error::Database(e.to_string()))?;
                let mapped = stmt
                    .query_map(params![limit as i64], |row| {
                        Ok(EdgeHit {
                            item_id: row.get(0)?,
                            score: row.get(1)?,
                        })
                    })
                    .map_err(|e| Error::Database(e.to_string()))?;
                mapped.filter_map(|r| r.ok()).collect()
            }
        };
        Ok(rows)
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let total_items = self.count_items(None)?;
        let fashion_items = self.count_items(Some("fashion"))?;
        let book_items = self.count_items(Some("book"))?;
        let total_edges = self.count_all_edges()?;

        let conn = self.conn.lock();
        let embeddings_stored: i64 = conn
            .query_row("SELECT COUNT(*) FROM item_embeddings", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        let distinct_anchors: i64 = conn
            .query_row("SELECT COUNT(DISTINCT item_a) FROM edges", [], |row| {
                row.get(0)
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        let mat = self.embedding_matrix.lock();
        let matrix_rows = mat.matrix.nrows();
        let matrix_loaded = matrix_rows > 0;

        Ok(StoreStats {
            total_items,
            fashion_items,
            book_items,
            embeddings_stored,
            total_edges,
            distinct_anchors,
            embedding_dimension: self.embedding_dim,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
            matrix_loaded,
            matrix_rows,
        })
    }
}
