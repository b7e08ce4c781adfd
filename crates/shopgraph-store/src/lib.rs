//! ShopGraph Store — SQLite co-purchase edge graph + catalog + vector search.

pub mod embedding;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
