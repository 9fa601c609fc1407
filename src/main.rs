use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use digital_house_api::config::Config;
use digital_house_api::middleware::AppLifecycle;
use digital_house_api::repository::Repositories;
use digital_house_api::services::{
    EmailService, Mailer, ObjectStorage, OptionsService, R2Storage, UnconfiguredStorage,
};
use digital_house_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "digital_house_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::load()?);
    tracing::info!("Configuration loaded successfully");

    if config.admin.api_key.trim().is_empty() {
        tracing::warn!("ADMIN__API_KEY is not set; static admin key access is disabled");
    }

    // Lazy pool: the listener comes up before the database is reachable.
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_lazy(&config.database.url)?;
    let repos = Repositories::postgres(pool.clone());

    let mailer: Arc<dyn Mailer> = Arc::new(EmailService::new(&config.smtp)?);

    let storage: Arc<dyn ObjectStorage> = if config.storage.is_configured() {
        Arc::new(R2Storage::new(&config.storage).await?)
    } else {
        tracing::warn!("Object storage not configured; media uploads are unavailable");
        Arc::new(UnconfiguredStorage::new(config.storage.key_prefix.clone()))
    };

    let lifecycle = AppLifecycle::starting();
    let state = AppState {
        config: config.clone(),
        repos: repos.clone(),
        mailer,
        storage,
        lifecycle: lifecycle.clone(),
    };

    tokio::spawn(async move {
        let result = async {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");
            OptionsService::from_repository(repos.options.clone())
                .seed_defaults()
                .await?;
            anyhow::Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                lifecycle.mark_ready();
                tracing::info!("Database ready; accepting API requests");
            }
            Err(e) => {
                lifecycle.mark_failed();
                tracing::error!(error = %e, "Database initialization failed; API requests will be refused");
            }
        }
    });

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
