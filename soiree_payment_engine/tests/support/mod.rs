//! Shared scaffolding for the integration tests: a fresh migrated SQLite store per test, plus a
//! funding shortcut that goes through the normal settlement path.
use log::*;
use soiree_payment_engine::{PaymentLedgerDatabase, SqliteDatabase};
use spe_common::MinorUnits;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub fn random_db_url() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/spe_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub async fn new_store() -> SqliteDatabase {
    let url = random_db_url();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    migrate!("./migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

/// Funds a wallet through the settlement path, exactly as a verified gateway payment would.
pub async fn fund_wallet(db: &SqliteDatabase, user_id: &str, amount: i64) {
    let reference = format!("test-funding-{user_id}-{}", rand::random::<u64>());
    let outcome = db
        .apply_gateway_credit(&reference, MinorUnits::from(amount), user_id)
        .await
        .expect("Error funding wallet");
    assert!(outcome.credited);
}
