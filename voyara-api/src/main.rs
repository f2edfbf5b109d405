use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyara_api::{app, AppState, AuthConfig, Repositories, Settings};
use voyara_core::events::EventPublisher;
use voyara_core::limits::RateLimiter;
use voyara_store::app_config::{Config, StorageBackend};
use voyara_store::{DbClient, EventProducer, MemoryRateLimiter, MemoryStore, RedisClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyara_api=debug,voyara_request=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    info!("Starting Voyara API on port {}", config.server.port);

    let (repos, limiter, business_rules) = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; nothing survives a restart");
            (
                Repositories::memory(Arc::new(MemoryStore::new())),
                Arc::new(MemoryRateLimiter::new()) as Arc<dyn RateLimiter>,
                config.business_rules.clone(),
            )
        }
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;

            // Fall back to file rules if the table is unavailable
            let rules = match db.fetch_business_rules(config.business_rules.clone()).await {
                Ok(rules) => rules,
                Err(e) => {
                    warn!("Could not load business rules from database: {}", e);
                    config.business_rules.clone()
                }
            };

            let redis = RedisClient::new(&config.redis.url)
                .await
                .context("Failed to connect to Redis")?;

            (Repositories::postgres(&db), Arc::new(redis) as Arc<dyn RateLimiter>, rules)
        }
    };

    let downstream: Option<Arc<dyn EventPublisher>> = if config.kafka.enabled {
        let producer = EventProducer::new(&config.kafka.brokers, &config.kafka.topic)
            .context("Failed to create Kafka producer")?;
        info!("Publishing request events to Kafka topic {}", config.kafka.topic);
        Some(Arc::new(producer) as Arc<dyn EventPublisher>)
    } else {
        None
    };

    let sweep_seconds = business_rules.expiry_sweep_seconds;
    let state = AppState::new(
        repos,
        limiter,
        downstream,
        Settings {
            auth: AuthConfig {
                secret: config.auth.jwt_secret.clone(),
            },
            business_rules,
            rate_limits: config.rate_limits.clone(),
            debug: config.app.debug,
        },
    );

    tokio::spawn(voyara_request::start_expiry_sweeper(state.approval.clone(), sweep_seconds));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
