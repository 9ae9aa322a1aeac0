pub mod bom;
pub mod catalog;
pub mod result;

pub use bom::BomLine;
pub use catalog::{CatalogField, CatalogRecord, CatalogRow, LcscProductRow, PriceTier, PriceTierRow};
pub use result::{ConfidenceLevel, MatchMethod, MatchResult, QueryResult};
