use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use crate::errors::ImportError;
use crate::migrator::Migrator;

/// Establishes a database connection with sane pool defaults.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, ImportError> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!("database connection established");
    Ok(db)
}

/// Runs the embedded catalog migrations.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), ImportError> {
    info!("running catalog migrations");
    let start = std::time::Instant::now();

    let result = Migrator::up(db, None).await.map_err(ImportError::Database);

    match &result {
        Ok(_) => info!("migrations completed in {:?}", start.elapsed()),
        Err(e) => error!("migrations failed after {:?}: {}", start.elapsed(), e),
    }
    result
}
