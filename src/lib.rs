pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod service;

pub use config::{AppConfig, MatcherConfig, ScoringConfig};
pub use db::create_pool;
pub use error::{MatcherError, Result};
pub use models::{BomLine, CatalogRecord, MatchMethod, MatchResult, PriceTier, QueryResult};
pub use service::{BomItemMatcher, CatalogProvider, CatalogQuery, CatalogQueryEngine, CatalogSnapshot, MatchType};
