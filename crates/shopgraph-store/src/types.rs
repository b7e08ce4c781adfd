//! Data types for catalog items, edges, and search results.

use serde::{Deserialize, Serialize};

/// A catalog item. The two product domains carry different fields, so the
/// variant is resolved from an explicit `type` tag rather than key sniffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogItem {
    Fashion {
        id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        brand: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        categories: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_base64: Option<String>,
    },
    Book {
        id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        categories: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_base64: Option<String>,
    },
}

impl CatalogItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Fashion { id, .. } | Self::Book { id, .. } => id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Fashion { title, .. } | Self::Book { title, .. } => title,
        }
    }

    pub fn item_type(&self) -> &'static str {
        match self {
            Self::Fashion { .. } => "fashion",
            Self::Book { .. } => "book",
        }
    }

    pub fn categories(&self) -> &[String] {
        match self {
            Self::Fashion { categories, .. } | Self::Book { categories, .. } => categories,
        }
    }

    /// Flatten the item into the text that gets embedded for content search.
    pub fn searchable_text(&self) -> String {
        match self {
            Self::Fashion {
                title,
                brand,
                categories,
                price,
                description,
                ..
            } => {
                let mut text = format!("Fashion: {}.", title);
                if let Some(brand) = brand {
                    text.push_str(&format!(" Brand: {}.", brand));
                }
                if !categories.is_empty() {
                    text.push_str(&format!(" Categories: {}.", categories.join(", ")));
                }
                if let Some(price) = price {
                    text.push_str(&format!(" Price: {}.", price));
                }
                if let Some(desc) = description {
                    text.push_str(&format!(" Description: {}", desc));
                }
                text
            }
            Self::Book {
                title,
                author,
                categories,
                description,
                ..
            } => {
                let mut text = format!("Book: {}.", title);
                if let Some(author) = author {
                    text.push_str(&format!(" Author: {}.", author));
                }
                if !categories.is_empty() {
                    text.push_str(&format!(" Categories: {}.", categories.join(", ")));
                }
                if let Some(desc) = description {
                    text.push_str(&format!(" Description: {}", desc));
                }
                text
            }
        }
    }
}

/// A directed co-purchase edge: "item_b is relevant given item_a is viewed".
///
/// The offline aggregator writes the symmetric relation as two directed
/// rows; feedback increments only the observed direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub item_a: String,
    pub item_b: String,
    pub score: f64,
}

impl Edge {
    pub fn new(item_a: impl Into<String>, item_b: impl Into<String>, score: f64) -> Self {
        Self {
            item_a: item_a.into(),
            item_b: item_b.into(),
            score,
        }
    }
}

/// A ranked neighbor fetched from the edge table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeHit {
    pub item_id: String,
    pub score: f64,
}

/// A vector search candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateHit {
    pub item_id: String,
    pub similarity: f64,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_items: i64,
    pub fashion_items: i64,
    pub book_items: i64,
    pub embeddings_stored: i64,
    pub total_edges: i64,
    pub distinct_anchors: i64,
    pub embedding_dimension: usize,
    pub db_path: String,
    pub db_size_mb: f64,
    pub matrix_loaded: bool,
    pub matrix_rows: usize,
}
