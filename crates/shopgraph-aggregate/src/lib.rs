//! ShopGraph Aggregate — offline batch jobs.
//!
//! Turns raw interaction logs into weighted co-occurrence edges and loads
//! catalog exports into the store.

pub mod aggregate;
pub mod baskets;
pub mod catalog;

pub use aggregate::{AggregateReport, Aggregator};
pub use baskets::{canonical_pair, BasketAccumulator, InteractionRecord};
pub use catalog::{content_hash, CatalogIngester, CatalogReport};
