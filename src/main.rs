#[macro_use]
extern crate rocket;

use demerit_tracker::database::{CURRENT_SCHEMA, migrate_database_declaratively};
use demerit_tracker::db::{clean_expired_sessions, ensure_seed_data};
use demerit_tracker::env::load_environment;
use demerit_tracker::init_rocket;
use demerit_tracker::telemetry::init_tracing;
use rocket::tokio;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

#[launch]
async fn rocket() -> _ {
    init_tracing();

    if let Err(e) = load_environment() {
        warn!("Failed to load environment files: {}", e);
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:demerit.db?mode=rwc".to_string());

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    info!("Running database migrations...");
    match migrate_database_declaratively(pool.clone(), CURRENT_SCHEMA, false).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    if let Err(e) = ensure_seed_data(&pool).await {
        error!("Failed to seed reference data: {}", e);
        panic!("Database seeding failed: {}", e);
    }

    let pool_clone = pool.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    init_rocket(pool).await
}
