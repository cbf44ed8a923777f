//! Shared handles passed to every route handler through axum's `State` extractor.

use db::field_store::{DbFieldStore, FieldStore};
use sea_orm::DatabaseConnection;
use services::email::Mailer;
use std::sync::Arc;
use util::storage::BlobStorage;

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    fields: Arc<dyn FieldStore>,
    storage: Arc<dyn BlobStorage>,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Block fields are kept in the same database as everything else.
    pub fn new(db: DatabaseConnection, storage: Arc<dyn BlobStorage>, mailer: Arc<dyn Mailer>) -> Self {
        let fields: Arc<dyn FieldStore> = Arc::new(DbFieldStore::new(db.clone()));
        Self {
            db,
            fields,
            storage,
            mailer,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn fields(&self) -> Arc<dyn FieldStore> {
        self.fields.clone()
    }

    pub fn storage(&self) -> Arc<dyn BlobStorage> {
        self.storage.clone()
    }

    pub fn mailer(&self) -> Arc<dyn Mailer> {
        self.mailer.clone()
    }
}
