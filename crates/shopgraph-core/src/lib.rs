//! ShopGraph Core — error taxonomy, configuration, data paths.

pub mod config;
pub mod error;

pub use config::{DataPaths, RecommenderSettings, ShopGraphConfig};
pub use error::{Error, Result};
