use std::time::Duration;

use diesel::Connection;
use diesel_migrations::MigrationHarness;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use muster_core::config::load_config;
use muster_db::db::DbProvider;
use muster_db::db::connection::create_pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Muster recurring event worker");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    run_migrations(&config.database.url).await?;

    let pool = create_pool(
        &config.database.url,
        u32::from(config.database.max_connections),
    )
    .await?;

    tracing::info!("Database connection pool created.");

    run_generation_loop(&pool, &config.generation).await
}

/// Runs diesel migrations on the given database URL.
async fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::PgConnection::establish(&url)?;
        conn.run_pending_migrations(muster_db::MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
        Ok::<_, anyhow::Error>(())
    })
    .await??;

    tracing::info!("Migrations are up to date");
    Ok(())
}

/// Periodically tops up the materialization window for every recurring
/// series. A failed sweep is logged and retried on the next tick.
async fn run_generation_loop(
    pool: &muster_db::db::connection::DbPool,
    generation: &muster_core::config::GenerationConfig,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(generation.tick_seconds));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(
        window_months = generation.window_months,
        tick_seconds = generation.tick_seconds,
        "Generation worker running"
    );

    loop {
        ticker.tick().await;

        match pool.get_connection().await {
            Ok(mut conn) => {
                match muster_service::generation::sweep_all_series(
                    &mut conn,
                    generation.window_months,
                )
                .await
                {
                    Ok(summary) => {
                        tracing::debug!(
                            series = summary.series,
                            failed = summary.failed,
                            inserted = summary.inserted,
                            "Generation tick finished"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Generation sweep failed");
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not get a database connection for the sweep");
            }
        }
    }
}
