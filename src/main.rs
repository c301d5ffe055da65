use std::sync::Arc;

use anyhow::{Error, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use notify_service::api;
use notify_service::clients::database::Database;
use notify_service::clients::mailer::HttpMailer;
use notify_service::clients::redis::RedisCache;
use notify_service::config::Config;
use notify_service::pipeline::{Collaborators, Pipeline};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;
    init_tracing(&config);

    let database = Arc::new(Database::connect(&config.database_url).await?);
    let cache = Arc::new(RedisCache::connect(&config.redis_url).await?);
    let mailer = Arc::new(HttpMailer::new(&config)?);

    let pipeline = Pipeline::new(
        &config,
        Collaborators {
            cache,
            mailer,
            notifications: database.clone(),
            preferences: database.clone(),
            follows: database.clone(),
            users: database.clone(),
            activities: database.clone(),
            revisions: database,
        },
    );

    api::run_api_server(&config).await?;

    // The API server only returns on SIGINT; drain what is still
    // queued before exiting.
    pipeline.shutdown().await;

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
