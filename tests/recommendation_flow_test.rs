//! End-to-end flow over the in-memory store: import, rate, recommend.

use chrono::Utc;
use recommender_service::config::RecommendConfig;
use recommender_service::models::{Rating, Restaurant, RestaurantId, UserId};
use recommender_service::{CsvImporter, InMemoryStore, RecommenderService};
use std::fs;
use std::sync::Arc;

fn rating(user_id: UserId, restaurant_id: RestaurantId, overall: u8) -> Rating {
    Rating {
        user_id,
        restaurant_id,
        overall,
        environment: overall,
        flavor: overall,
        service: overall,
        timestamp: Utc::now(),
        comment: None,
    }
}

fn config() -> RecommendConfig {
    RecommendConfig {
        default_limit: 6,
        popular_min_reviews: 1,
        precompute_links: false,
        link_fanout: 20,
    }
}

fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for (id, name) in [
        (1, "Lotus Garden"),
        (2, "Golden Wok"),
        (3, "Night Noodles"),
        (4, "Harbor House"),
        (5, "nan"),
    ] {
        store.insert_restaurant(Restaurant::new(id, name));
    }
    for (user, rest, score) in [
        (100, 1, 5),
        (100, 2, 3),
        (200, 1, 5),
        (200, 2, 3),
        (200, 3, 4),
        (201, 1, 4),
        (201, 4, 5),
        (202, 4, 4),
        (203, 5, 5), // placeholder-named restaurant, must never surface
    ] {
        store.upsert_rating(rating(user, rest, score)).unwrap();
    }
    store
}

#[tokio::test]
async fn test_csv_import_feeds_the_recommenders() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("restaurants.csv"),
        "restId,name\n1,Lotus Garden\n2,Golden Wok\n3,Night Noodles\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("ratings.csv"),
        concat!(
            "userId,restId,rating,rating_env,rating_flavor,rating_service,timestamp,comment\n",
            "100,1,5,5,5,5,1600000000000,\n",
            "100,2,3,3,3,3,1600000000000,\n",
            "200,1,5,5,5,5,1600000000000,\n",
            "200,2,3,3,3,3,1600000000000,\n",
            "200,3,4,4,4,4,1600000000000,\n",
        ),
    )
    .unwrap();

    let store = Arc::new(InMemoryStore::new());
    let report = CsvImporter::new(&store).import_dir(dir.path()).unwrap();
    assert_eq!(report.ratings, 5);
    assert_eq!(report.skipped_ratings, 0);

    let service = RecommenderService::new(store.clone(), store.clone(), &config());
    let personalized = service.personalized_recommendations(100, 5).await.unwrap();
    assert_eq!(personalized.len(), 1);
    assert_eq!(personalized[0].id, 3);
}

#[tokio::test]
async fn test_hybrid_never_surfaces_invalid_restaurants() {
    let store = seeded_store();
    let service = RecommenderService::new(store.clone(), store.clone(), &config());

    let (results, _stats) = service
        .hybrid_recommendations(Some(100), Some(1), 10)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.id != 5));
}

#[tokio::test]
async fn test_rating_write_shifts_recommendations() {
    let store = seeded_store();
    let service = RecommenderService::new(store.clone(), store.clone(), &config());

    let before = service.trending_restaurants(10).await.unwrap();
    let top_before = before[0].id;

    // Pile perfect reviews onto the bottom-ranked valid restaurant and it
    // must overtake the old leader.
    let underdog = before.last().unwrap().id;
    for user in 300..330 {
        store.upsert_rating(rating(user, underdog, 5)).unwrap();
    }

    let after = service.trending_restaurants(10).await.unwrap();
    assert_eq!(after[0].id, underdog);
    assert_ne!(after[0].id, top_before);
}

#[tokio::test]
async fn test_popularity_is_deterministic_on_unchanged_store() {
    let store = seeded_store();
    let service = RecommenderService::new(store.clone(), store.clone(), &config());

    let first = service.trending_restaurants(10).await.unwrap();
    let second = service.trending_restaurants(10).await.unwrap();
    let first_ids: Vec<RestaurantId> = first.iter().map(|r| r.id).collect();
    let second_ids: Vec<RestaurantId> = second.iter().map(|r| r.id).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn test_precomputed_links_do_not_change_content_rankings() {
    let store = seeded_store();
    let service = RecommenderService::new(store.clone(), store.clone(), &config());

    let direct = service.similar_restaurants(1, 3).await.unwrap();
    store.replace_all_links(service.compute_links(3).await.unwrap());
    let via_links = service.similar_restaurants(1, 3).await.unwrap();

    let direct_ids: Vec<RestaurantId> = direct.iter().map(|r| r.id).collect();
    let link_ids: Vec<RestaurantId> = via_links.iter().map(|r| r.id).collect();
    assert_eq!(direct_ids, link_ids);
}
