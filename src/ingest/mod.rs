use crate::models::{Rating, Restaurant, RestaurantId, UserId};
use crate::store::memory::InMemoryStore;
use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct RestaurantRecord {
    #[serde(rename = "restId")]
    rest_id: RestaurantId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RatingRecord {
    #[serde(rename = "userId")]
    user_id: UserId,
    #[serde(rename = "restId")]
    rest_id: RestaurantId,
    // The upstream dump has blank cells; they deserialize to None and the
    // row is skipped.
    rating: Option<f64>,
    rating_env: Option<f64>,
    rating_flavor: Option<f64>,
    rating_service: Option<f64>,
    /// Epoch milliseconds.
    timestamp: i64,
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkRecord {
    #[serde(rename = "restId")]
    rest_id: RestaurantId,
    #[serde(rename = "dianpingId")]
    external_id: String,
}

/// What came out of one import run, reported to the operator.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ImportReport {
    pub restaurants: usize,
    pub ratings: usize,
    /// Rows dropped for being malformed, out of range, or referencing an
    /// unknown restaurant.
    pub skipped_ratings: usize,
    pub external_ids: usize,
    pub rated_restaurants: usize,
}

/// Loads the scraped dataset (restaurants.csv, ratings.csv, links.csv)
/// into a store. Validation happens here, at the write boundary: the
/// recommenders never see an out-of-range score.
pub struct CsvImporter<'a> {
    store: &'a InMemoryStore,
}

/// A sub-score cell must hold a whole number of stars in 1..=5.
fn score_from(value: Option<f64>) -> Option<u8> {
    let value = value?;
    if !value.is_finite() || value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return None;
    }
    Some(value as u8)
}

fn rating_from_record(record: RatingRecord) -> Option<Rating> {
    let overall = score_from(record.rating)?;
    let environment = score_from(record.rating_env)?;
    let flavor = score_from(record.rating_flavor)?;
    let service = score_from(record.rating_service)?;
    let timestamp = Utc.timestamp_millis_opt(record.timestamp).single()?;
    Some(Rating {
        user_id: record.user_id,
        restaurant_id: record.rest_id,
        overall,
        environment,
        flavor,
        service,
        timestamp,
        comment: record.comment.filter(|c| !c.is_empty()),
    })
}

impl<'a> CsvImporter<'a> {
    pub fn new(store: &'a InMemoryStore) -> Self {
        Self { store }
    }

    pub fn import_dir(&self, dir: &Path) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        report.restaurants = self.import_restaurants(&dir.join("restaurants.csv"))?;
        let (loaded, skipped) = self.import_ratings(&dir.join("ratings.csv"))?;
        report.ratings = loaded;
        report.skipped_ratings = skipped;

        let links_path = dir.join("links.csv");
        if links_path.exists() {
            report.external_ids = self.import_links(&links_path)?;
        }
        report.rated_restaurants = self.store.rated_restaurant_count();

        info!(
            "import finished: {} restaurants, {} ratings ({} skipped), {} external ids, {} rated restaurants",
            report.restaurants,
            report.ratings,
            report.skipped_ratings,
            report.external_ids,
            report.rated_restaurants
        );
        Ok(report)
    }

    fn import_restaurants(&self, path: &Path) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let mut imported = 0;
        for record in reader.deserialize::<RestaurantRecord>() {
            let record = record.with_context(|| format!("reading {}", path.display()))?;
            self.store
                .insert_restaurant(Restaurant::new(record.rest_id, record.name));
            imported += 1;
        }
        Ok(imported)
    }

    fn import_ratings(&self, path: &Path) -> Result<(usize, usize)> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;

        let mut parsed: Vec<Rating> = Vec::new();
        let mut skipped = 0usize;
        for record in reader.deserialize::<RatingRecord>() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    warn!("skipping malformed rating row: {err}");
                    skipped += 1;
                    continue;
                }
            };
            match rating_from_record(record) {
                Some(rating) => parsed.push(rating),
                None => skipped += 1,
            }
        }

        // One bulk commit; aggregates are recomputed once at the end.
        let loaded = self.store.bulk_load_ratings(parsed);
        Ok((loaded.loaded, skipped + loaded.skipped))
    }

    fn import_links(&self, path: &Path) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let mut imported = 0;
        for record in reader.deserialize::<LinkRecord>() {
            let record = record.with_context(|| format!("reading {}", path.display()))?;
            if self
                .store
                .set_external_id(record.rest_id, record.external_id)
                .is_ok()
            {
                imported += 1;
            }
        }
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn test_import_skips_and_counts_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "restaurants.csv",
            "restId,name\n1,Lotus Garden\n2,Golden Wok\n",
        );
        write(
            dir.path(),
            "ratings.csv",
            concat!(
                "userId,restId,rating,rating_env,rating_flavor,rating_service,timestamp,comment\n",
                "100,1,5,4,5,4,1600000000000,great\n",
                "101,1,4,4,4,4,1600000000000,\n",
                "102,2,,3,3,3,1600000000000,\n",   // blank score
                "103,2,9,3,3,3,1600000000000,\n",  // out of range
                "104,7,4,4,4,4,1600000000000,\n",  // unknown restaurant
            ),
        );
        write(dir.path(), "links.csv", "restId,dianpingId\n1,dp-900\n");

        let store = InMemoryStore::new();
        let report = CsvImporter::new(&store).import_dir(dir.path()).unwrap();

        assert_eq!(report.restaurants, 2);
        assert_eq!(report.ratings, 2);
        assert_eq!(report.skipped_ratings, 3);
        assert_eq!(report.external_ids, 1);
        assert_eq!(report.rated_restaurants, 1);

        use crate::store::RestaurantCatalog;
        let lotus = store.restaurant(1).await.unwrap().unwrap();
        assert_eq!(lotus.review_count, 2);
        assert!((lotus.avg_rating - 4.5).abs() < 1e-9);
        assert_eq!(lotus.external_id.as_deref(), Some("dp-900"));
    }

    #[test]
    fn test_score_parsing() {
        assert_eq!(score_from(Some(4.0)), Some(4));
        assert_eq!(score_from(Some(0.0)), None);
        assert_eq!(score_from(Some(5.5)), None);
        assert_eq!(score_from(Some(6.0)), None);
        assert_eq!(score_from(Some(f64::NAN)), None);
        assert_eq!(score_from(None), None);
    }

    #[test]
    fn test_comment_and_timestamp_parsing() {
        let record = RatingRecord {
            user_id: 1,
            rest_id: 2,
            rating: Some(4.0),
            rating_env: Some(3.0),
            rating_flavor: Some(5.0),
            rating_service: Some(4.0),
            timestamp: 1_600_000_000_000,
            comment: Some(String::new()),
        };
        let rating = rating_from_record(record).unwrap();
        assert_eq!(rating.timestamp.timestamp(), 1_600_000_000);
        assert!(rating.comment.is_none());
    }
}
