use recommender_service::{Config, CsvImporter, InMemoryStore, RecommenderService};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    info!("starting {}", config.service.service_name);

    let store = Arc::new(InMemoryStore::new());
    let report = CsvImporter::new(&store).import_dir(Path::new(&config.data.data_dir))?;
    info!("import report: {}", serde_json::to_string(&report)?);

    let service = RecommenderService::new(store.clone(), store.clone(), &config.recommend);

    if config.recommend.precompute_links {
        let links = service.compute_links(config.recommend.link_fanout).await?;
        info!("precomputed {} similarity edges", links.len());
        store.replace_all_links(links);
    }

    let popular = service
        .popular_restaurants(config.recommend.default_limit)
        .await?;
    for restaurant in &popular {
        info!(
            "popular: {} (avg {:.2}, {} reviews)",
            restaurant.name, restaurant.avg_rating, restaurant.review_count
        );
    }

    if config.data.demo_user_id.is_some() || config.data.demo_restaurant_id.is_some() {
        let (recommendations, stats) = service
            .hybrid_recommendations(
                config.data.demo_user_id,
                config.data.demo_restaurant_id,
                config.recommend.default_limit,
            )
            .await?;
        info!(
            "hybrid demo run: popularity={} content={} collaborative={} fused={}",
            stats.popularity_count,
            stats.content_count,
            stats.collaborative_count,
            stats.fused_count
        );
        for restaurant in &recommendations {
            info!(
                "recommended: {} (avg {:.2}, {} reviews)",
                restaurant.name, restaurant.avg_rating, restaurant.review_count
            );
        }
    }

    Ok(())
}
