pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::RecommendError;
pub use ingest::{CsvImporter, ImportReport};
pub use services::{RecommenderService, TopRatedByCategory};
pub use store::memory::InMemoryStore;
pub use store::{RatingStore, RestaurantCatalog};
