//! Interaction-log aggregation: JSONL stream → co-occurrence edges.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::baskets::{BasketAccumulator, InteractionRecord};
use shopgraph_core::{Error, RecommenderSettings, Result};
use shopgraph_store::{Edge, SqliteStore};

/// Summary of one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub users: usize,
    pub interactions: u64,
    pub skipped_lines: u64,
    pub oversized_baskets: u64,
    pub pairs_counted: usize,
    pub edges_written: usize,
}

/// Offline aggregator: builds the co-purchase edge graph from an
/// interaction log.
pub struct Aggregator {
    settings: RecommenderSettings,
}

impl Aggregator {
    pub fn new(settings: RecommenderSettings) -> Self {
        Self { settings }
    }

    /// Run a full aggregation batch and replace the edge table.
    ///
    /// Opening the source is the first step; a missing or unreadable file
    /// aborts before the destructive `replace_all_edges`, so a failed run
    /// never empties a previously good table.
    pub fn run(&self, store: &SqliteStore, path: &Path) -> Result<AggregateReport> {
        let file = File::open(path).map_err(|e| {
            Error::Aggregate(format!("cannot open {}: {}", path.display(), e))
        })?;

        let (edges, mut report) = self.aggregate_stream(BufReader::new(file))?;
        report.edges_written = store.replace_all_edges(&edges)?;

        info!(
            "Aggregation complete: {} users, {} interactions, {} pairs, {} edges written \
             ({} lines skipped, {} oversized baskets)",
            report.users,
            report.interactions,
            report.pairs_counted,
            report.edges_written,
            report.skipped_lines,
            report.oversized_baskets
        );
        Ok(report)
    }

    /// Aggregate a stream of JSONL interaction records into directed edges.
    ///
    /// Malformed lines (bad JSON, missing or empty user/item) are counted
    /// and skipped. Each surviving canonical pair is emitted in both
    /// orientations at the same score.
    pub fn aggregate_stream<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<(Vec<Edge>, AggregateReport)> {
        let mut baskets = BasketAccumulator::new();
        let mut skipped_lines = 0u64;

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Unreadable line in interaction log: {}", e);
                    skipped_lines += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let record: InteractionRecord = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(_) => {
                    skipped_lines += 1;
                    continue;
                }
            };
            match (record.user_id.as_deref(), record.item_id.as_deref()) {
                (Some(user), Some(item)) if !user.is_empty() && !item.is_empty() => {
                    baskets.record(user, item);
                }
                _ => {
                    skipped_lines += 1;
                }
            }
        }

        let (counts, oversized_baskets) = baskets.count_pairs(self.settings.max_basket_size);
        let pairs_counted = counts.len();

        let mut edges = Vec::new();
        for ((item_a, item_b), count) in counts {
            if count < self.settings.min_co_occurrence {
                continue;
            }
            let score = count as f64;
            // Symmetric relation, stored twice
            edges.push(Edge::new(item_a.clone(), item_b.clone(), score));
            edges.push(Edge::new(item_b, item_a, score));
        }
        edges.sort_by(|a, b| a.item_a.cmp(&b.item_a).then_with(|| a.item_b.cmp(&b.item_b)));

        let report = AggregateReport {
            users: baskets.user_count(),
            interactions: baskets.interaction_count(),
            skipped_lines,
            oversized_baskets,
            pairs_counted,
            edges_written: 0,
        };
        Ok((edges, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path(), 512).unwrap();
        (store, dir)
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(RecommenderSettings::default())
    }

    fn write_log(dir: &TempDir, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("interactions.jsonl");
        let mut f = File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn test_five_users_sharing_a_pair() {
        let (store, dir) = test_store();
        let lines: Vec<String> = (1..=5)
            .flat_map(|u| {
                vec![
                    format!(r#"{{"user_id":"u{}","item_id":"A"}}"#, u),
                    format!(r#"{{"user_id":"u{}","item_id":"B"}}"#, u),
                ]
            })
            .collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let path = write_log(&dir, &refs);

        let report = aggregator().run(&store, &path).unwrap();
        assert_eq!(report.users, 5);
        assert_eq!(report.edges_written, 2);

        let ab = store.top_edges("A", 10).unwrap();
        assert_eq!(ab.len(), 1);
        assert_eq!(ab[0].item_id, "B");
        assert_eq!(ab[0].score, 5.0);

        let ba = store.top_edges("B", 10).unwrap();
        assert_eq!(ba[0].item_id, "A");
        assert_eq!(ba[0].score, 5.0);
    }

    #[test]
    fn test_pairs_below_minimum_are_dropped() {
        let (store, dir) = test_store();
        // Four users share {A,B}; one user shares {A,C}
        let mut lines = Vec::new();
        for u in 1..=4 {
            lines.push(format!(r#"{{"user_id":"u{}","item_id":"A"}}"#, u));
            lines.push(format!(r#"{{"user_id":"u{}","item_id":"B"}}"#, u));
        }
        lines.push(r#"{"user_id":"u9","item_id":"A"}"#.to_string());
        lines.push(r#"{"user_id":"u9","item_id":"C"}"#.to_string());
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let path = write_log(&dir, &refs);

        let report = aggregator().run(&store, &path).unwrap();
        // (A,B) at 4 < 5 and (A,C) at 1 < 5: nothing survives
        assert_eq!(report.pairs_counted, 2);
        assert_eq!(report.edges_written, 0);
        assert_eq!(store.count_all_edges().unwrap(), 0);
    }

    #[test]
    fn test_malformed_lines_skipped_not_fatal() {
        let settings = RecommenderSettings {
            min_co_occurrence: 1,
            ..Default::default()
        };
        let (edges, report) = Aggregator::new(settings)
            .aggregate_stream(
                &br#"{"user_id":"u1","item_id":"A"}
not json at all
{"user_id":"u1"}
{"user_id":"","item_id":"B"}
{"user_id":"u1","item_id":"B"}
"#[..],
            )
            .unwrap();

        assert_eq!(report.skipped_lines, 3);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_emitted_edges_satisfy_invariants() {
        let settings = RecommenderSettings {
            min_co_occurrence: 2,
            ..Default::default()
        };
        let mut input = String::new();
        for u in 1..=3 {
            for item in ["A", "B", "C"] {
                input.push_str(&format!(r#"{{"user_id":"u{}","item_id":"{}"}}"#, u, item));
                input.push('\n');
            }
        }
        let (edges, _) = Aggregator::new(settings.clone())
            .aggregate_stream(input.as_bytes())
            .unwrap();

        assert!(!edges.is_empty());
        for edge in &edges {
            assert!(edge.score >= settings.min_co_occurrence as f64);
            assert_ne!(edge.item_a, edge.item_b);
        }
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let settings = RecommenderSettings {
            min_co_occurrence: 1,
            ..Default::default()
        };
        let forward = r#"{"user_id":"u1","item_id":"A"}
{"user_id":"u1","item_id":"B"}
"#;
        let reverse = r#"{"user_id":"u1","item_id":"B"}
{"user_id":"u1","item_id":"A"}
"#;
        let (e1, _) = Aggregator::new(settings.clone())
            .aggregate_stream(forward.as_bytes())
            .unwrap();
        let (e2, _) = Aggregator::new(settings)
            .aggregate_stream(reverse.as_bytes())
            .unwrap();
        assert_eq!(e1, e2);
    }

    #[test]
    fn test_missing_source_preserves_existing_edges() {
        let (store, dir) = test_store();
        store
            .upsert_edges(&[Edge::new("A", "B", 5.0), Edge::new("B", "A", 5.0)])
            .unwrap();

        let result = aggregator().run(&store, &dir.path().join("does-not-exist.jsonl"));
        assert!(matches!(result, Err(Error::Aggregate(_))));
        // The destructive replace never ran
        assert_eq!(store.count_all_edges().unwrap(), 2);
    }

    #[test]
    fn test_rerun_replaces_prior_batch() {
        let (store, dir) = test_store();
        store
            .upsert_edges(&[Edge::new("stale1", "stale2", 99.0)])
            .unwrap();

        let lines: Vec<String> = (1..=5)
            .flat_map(|u| {
                vec![
                    format!(r#"{{"user_id":"u{}","item_id":"X"}}"#, u),
                    format!(r#"{{"user_id":"u{}","item_id":"Y"}}"#, u),
                ]
            })
            .collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let path = write_log(&dir, &refs);

        aggregator().run(&store, &path).unwrap();
        assert_eq!(store.count_edges("stale1").unwrap(), 0);
        assert_eq!(store.count_all_edges().unwrap(), 2);
    }
}
