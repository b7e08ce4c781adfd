//! Catalog ingestion: JSONL export → typed items + embeddings.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array1;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use shopgraph_core::{Error, Result};
use shopgraph_infer::EmbedderBackend;
use shopgraph_store::{CatalogItem, SqliteStore};

/// Summary of one catalog ingestion run.
#[derive(Debug, Clone, Default)]
pub struct CatalogReport {
    pub items_added: usize,
    pub duplicates: usize,
    pub skipped_lines: u64,
    pub embedded: usize,
}

/// Loads catalog JSONL exports into the store.
///
/// Each line is a tagged item (`"type": "fashion" | "book"`), optionally
/// carrying a pre-computed `"embedding"` array. Items without one are
/// embedded from their searchable text in batches of `batch_size` when an
/// embedder is available.
pub struct CatalogIngester<'a> {
    store: &'a SqliteStore,
    embedder: &'a dyn EmbedderBackend,
    batch_size: usize,
}

impl<'a> CatalogIngester<'a> {
    pub fn new(store: &'a SqliteStore, embedder: &'a dyn EmbedderBackend, batch_size: usize) -> Self {
        Self {
            store,
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Ingest a catalog file line by line. Unparseable lines are skipped.
    pub fn run(&self, path: &Path) -> Result<CatalogReport> {
        let file = File::open(path)
            .map_err(|e| Error::Aggregate(format!("cannot open {}: {}", path.display(), e)))?;

        let mut report = CatalogReport::default();
        let mut pending: Vec<(CatalogItem, Option<Vec<f32>>)> = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Unreadable line in catalog file: {}", e);
                    report.skipped_lines += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match parse_catalog_line(&line) {
                Some(parsed) => pending.push(parsed),
                None => {
                    report.skipped_lines += 1;
                    continue;
                }
            }

            if pending.len() >= self.batch_size {
                self.flush(&mut pending, &mut report)?;
            }
        }
        self.flush(&mut pending, &mut report)?;

        info!(
            "Catalog ingestion complete: {} added, {} embedded, {} duplicates, {} lines skipped",
            report.items_added, report.embedded, report.duplicates, report.skipped_lines
        );
        Ok(report)
    }

    /// Write a batch of parsed items, embedding the ones that need it in
    /// one batched embedder call.
    fn flush(
        &self,
        pending: &mut Vec<(CatalogItem, Option<Vec<f32>>)>,
        report: &mut CatalogReport,
    ) -> Result<()> {
        let mut to_embed: Vec<(String, String)> = Vec::new();

        for (item, inline_embedding) in pending.drain(..) {
            let text = item.searchable_text();
            let hash = content_hash(&text);

            if self.store.find_item_by_hash(&hash)?.is_some() {
                debug!("Duplicate catalog item, skipping: {}", hash);
                report.duplicates += 1;
                continue;
            }
            match self.store.add_item(&item, Some(&hash)) {
                Ok(()) => {}
                Err(Error::DuplicateItem(hash)) => {
                    debug!("Duplicate catalog item, skipping: {}", hash);
                    report.duplicates += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
            report.items_added += 1;

            match inline_embedding {
                Some(values) if values.len() == self.embedder.dimension() => {
                    self.store
                        .add_item_embedding(item.id(), &Array1::from_vec(values))?;
                    report.embedded += 1;
                }
                Some(values) => {
                    warn!(
                        "Inline embedding for {} has dimension {}, expected {}; re-embedding",
                        item.id(),
                        values.len(),
                        self.embedder.dimension()
                    );
                    to_embed.push((item.id().to_string(), text));
                }
                None => to_embed.push((item.id().to_string(), text)),
            }
        }

        if to_embed.is_empty() || !self.embedder.is_available() {
            return Ok(());
        }

        let texts: Vec<&str> = to_embed.iter().map(|(_, t)| t.as_str()).collect();
        let embeddings = self.embedder.embed_text_batch(&texts);
        for ((item_id, _), embedding) in to_embed.iter().zip(embeddings) {
            if let Some(result) = embedding {
                self.store.add_item_embedding(item_id, &result.embedding)?;
                report.embedded += 1;
            }
        }
        Ok(())
    }

    /// Ingest a single item. Returns whether an embedding was stored.
    pub fn ingest_item(
        &self,
        item: &CatalogItem,
        inline_embedding: Option<Vec<f32>>,
    ) -> Result<bool> {
        let text = item.searchable_text();
        let hash = content_hash(&text);

        if self.store.find_item_by_hash(&hash)?.is_some() {
            return Err(Error::DuplicateItem(hash));
        }

        self.store.add_item(item, Some(&hash))?;

        let embedding = match inline_embedding {
            Some(values) if values.len() == self.embedder.dimension() => {
                Some(Array1::from_vec(values))
            }
            Some(values) => {
                warn!(
                    "Inline embedding for {} has dimension {}, expected {}; re-embedding",
                    item.id(),
                    values.len(),
                    self.embedder.dimension()
                );
                self.embedder.embed_text(&text).map(|r| r.embedding)
            }
            None => self.embedder.embed_text(&text).map(|r| r.embedding),
        };

        if let Some(embedding) = embedding {
            self.store.add_item_embedding(item.id(), &embedding)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Parse one catalog JSONL line into an item and its optional inline
/// embedding.
fn parse_catalog_line(line: &str) -> Option<(CatalogItem, Option<Vec<f32>>)> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let item: CatalogItem = match serde_json::from_value(value.clone()) {
        Ok(i) => i,
        Err(e) => {
            warn!("Skipping catalog line: {}", e);
            return None;
        }
    };
    let embedding = value.get("embedding").and_then(|e| e.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Vec<f32>>()
    });
    Some((item, embedding))
}

/// Compute a SHA-256 content hash.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopgraph_infer::NoopEmbedder;
    use std::io::Write;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path(), 4).unwrap();
        (store, dir)
    }

    #[test]
    fn test_ingest_mixed_catalog() {
        let (store, dir) = test_store();
        let path = dir.path().join("catalog.jsonl");
        let mut f = File::create(&path).unwrap();
        writeln!(
            f,
            r#"{{"type":"fashion","id":"f1","title":"Denim Jacket","brand":"Levi's"}}"#
        )
        .unwrap();
        writeln!(
            f,
            r#"{{"type":"book","id":"b1","title":"Dune","author":"Frank Herbert"}}"#
        )
        .unwrap();
        writeln!(f, "this is not json").unwrap();

        let embedder = NoopEmbedder::new(4);
        let report = CatalogIngester::new(&store, &embedder, 500)
            .run(&path)
            .unwrap();

        assert_eq!(report.items_added, 2);
        assert_eq!(report.skipped_lines, 1);
        assert_eq!(report.embedded, 0);
        assert_eq!(store.count_items(Some("fashion")).unwrap(), 1);
        assert_eq!(store.count_items(Some("book")).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_items_counted_not_fatal() {
        let (store, dir) = test_store();
        let path = dir.path().join("catalog.jsonl");
        let mut f = File::create(&path).unwrap();
        for _ in 0..2 {
            writeln!(f, r#"{{"type":"fashion","id":"f1","title":"Denim Jacket"}}"#).unwrap();
        }

        let embedder = NoopEmbedder::new(4);
        let report = CatalogIngester::new(&store, &embedder, 500)
            .run(&path)
            .unwrap();
        assert_eq!(report.items_added, 1);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn test_small_batch_size_still_ingests_everything() {
        let (store, dir) = test_store();
        let path = dir.path().join("catalog.jsonl");
        let mut f = File::create(&path).unwrap();
        for i in 0..5 {
            writeln!(
                f,
                r#"{{"type":"fashion","id":"f{}","title":"Item {}"}}"#,
                i, i
            )
            .unwrap();
        }

        let embedder = NoopEmbedder::new(4);
        let report = CatalogIngester::new(&store, &embedder, 2)
            .run(&path)
            .unwrap();
        assert_eq!(report.items_added, 5);
        assert_eq!(store.count_items(None).unwrap(), 5);
    }

    #[test]
    fn test_inline_embedding_is_searchable() {
        let (store, dir) = test_store();
        let path = dir.path().join("catalog.jsonl");
        let mut f = File::create(&path).unwrap();
        writeln!(
            f,
            r#"{{"type":"fashion","id":"f1","title":"Red Dress","embedding":[1.0,0.0,0.0,0.0]}}"#
        )
        .unwrap();

        let embedder = NoopEmbedder::new(4);
        let report = CatalogIngester::new(&store, &embedder, 500)
            .run(&path)
            .unwrap();
        assert_eq!(report.embedded, 1);

        let query = Array1::from_vec(vec![1.0, 0.0, 0.0, 0.0]);
        let hits = store.vector_search(&query, 0.5, 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id, "f1");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let (store, dir) = test_store();
        let embedder = NoopEmbedder::new(4);
        let result =
            CatalogIngester::new(&store, &embedder, 500).run(&dir.path().join("nope.jsonl"));
        assert!(matches!(result, Err(Error::Aggregate(_))));
    }
}
