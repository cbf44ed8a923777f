use sea_orm::{Database, DatabaseConnection};
use migration::Migrator;
use sea_orm_migration::MigratorTrait;

/// Fresh in-memory SQLite database with every migration applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}
