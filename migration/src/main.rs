use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use std::{fs, path::Path};
use util::{config, paths};

mod runner;

#[tokio::main]
async fn main() {
    let db_path = config::database_path();
    let url = format!("sqlite://{}?mode=rwc", db_path);
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("clean") => {
            remove_db_file(&db_path);
        }
        Some("fresh") => {
            remove_db_file(&db_path);
            create_db_dir(&db_path);
            runner::run_all_migrations(&url).await;
        }
        Some("rollback") => {
            let db = sea_orm::Database::connect(&url)
                .await
                .expect("DB connection failed");
            Migrator::down(&db, None).await.expect("Rollback failed");
            println!("Rolled back all migrations");
        }
        _ => {
            create_db_dir(&db_path);
            runner::run_all_migrations(&url).await;
        }
    }
}

fn remove_db_file(path: &str) {
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path).expect("Failed to delete DB file");
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }

    // Stored submissions are only reachable through the database rows.
    let storage_path = paths::storage_root();
    if storage_path.exists() {
        fs::remove_dir_all(&storage_path).expect("Failed to delete submission storage");
        println!("Deleted submission storage: {}", storage_path.display());
    } else {
        println!("Submission storage does not exist: {}", storage_path.display());
    }
}

fn create_db_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).expect("Failed to create DB directory");
    }
}
