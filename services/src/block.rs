//! Per-request view of one assignment block and its configuration.

use chrono::{DateTime, Utc};
use db::field_store::{BlockKey, FieldStore, Namespace};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const DEFAULT_DISPLAY_NAME: &str = "Staff Ungraded Assignment";
pub const DEFAULT_POINTS: u64 = 100;

/// Field names as persisted in the block namespaces.
pub mod fields {
    // settings scope
    pub const DISPLAY_NAME: &str = "display_name";
    pub const POINTS: &str = "points";
    pub const WEIGHT: &str = "weight";
    pub const DUE: &str = "due";
    // content scope
    pub const DESCRIPTION: &str = "description";
    pub const ASSIGNMENT_NAME: &str = "assignment_name";
    // user_state scope
    pub const SUBMISSION: &str = "submission";
}

/// Author configuration of an assignment block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSettings {
    pub display_name: String,
    pub description: Option<String>,
    pub assignment_name: Option<String>,
    pub points: u64,
    pub weight: Option<f64>,
    pub due: Option<DateTime<Utc>>,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            description: None,
            assignment_name: None,
            points: DEFAULT_POINTS,
            weight: None,
            due: None,
        }
    }
}

/// Reads one stored field, falling back to `default` when absent or unreadable.
fn read<T: serde::de::DeserializeOwned>(map: &HashMap<String, Value>, name: &str, default: T) -> T {
    match map.get(name) {
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            tracing::warn!(field = name, error = %e, "ignoring unreadable stored field");
            default
        }),
        None => default,
    }
}

impl AssignmentSettings {
    pub async fn load(store: &dyn FieldStore, block: BlockKey) -> Result<Self, DbErr> {
        let settings = store.get_all(block, Namespace::Settings).await?;
        let content = store.get_all(block, Namespace::Content).await?;
        let defaults = Self::default();

        Ok(Self {
            display_name: read(&settings, fields::DISPLAY_NAME, defaults.display_name),
            points: read(&settings, fields::POINTS, defaults.points),
            weight: read(&settings, fields::WEIGHT, defaults.weight),
            due: read(&settings, fields::DUE, defaults.due),
            description: read(&content, fields::DESCRIPTION, defaults.description),
            assignment_name: read(&content, fields::ASSIGNMENT_NAME, defaults.assignment_name),
        })
    }

    pub fn past_due(&self, now: DateTime<Utc>) -> bool {
        self.due.is_some_and(|due| now > due)
    }
}

/// Handle to one block for the duration of a request.
///
/// The configuration is loaded on first use and reused for the rest of the request.
pub struct BlockContext {
    key: BlockKey,
    store: Arc<dyn FieldStore>,
    settings: OnceCell<AssignmentSettings>,
}

impl BlockContext {
    pub fn new(store: Arc<dyn FieldStore>, key: BlockKey) -> Self {
        Self {
            key,
            store,
            settings: OnceCell::new(),
        }
    }

    pub fn key(&self) -> BlockKey {
        self.key
    }

    pub fn store(&self) -> &dyn FieldStore {
        self.store.as_ref()
    }

    pub async fn settings(&self) -> Result<&AssignmentSettings, DbErr> {
        self.settings
            .get_or_try_init(|| AssignmentSettings::load(self.store.as_ref(), self.key))
            .await
    }
}
