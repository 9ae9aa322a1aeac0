pub mod cache;
pub mod matcher;
pub mod normalize;
pub mod query;
pub mod scorer;
pub mod snapshot;

pub use cache::{CacheKey, MatchCache};
pub use matcher::{score_candidate, BomItemMatcher};
pub use normalize::{normalize, tokenize};
pub use query::{CatalogProvider, CatalogQuery, CatalogQueryEngine, MatchType, Searchable};
pub use scorer::{partial_ratio, ratio, FieldScorer};
pub use snapshot::{CatalogSnapshot, PreparedRecord};
