pub mod profile_cache;
pub mod recommenders;
pub mod service;
pub mod similarity;

pub use profile_cache::ProfileCache;
pub use service::{RecommenderService, TopRatedByCategory};
pub use similarity::cosine_similarity;
