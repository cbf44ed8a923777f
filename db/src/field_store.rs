//! Namespaced key-value persistence for block fields.
//!
//! A block keeps its state in three separate namespaces: author settings, authored
//! content, and per-user state. Services talk to the [`FieldStore`] trait and never see
//! how values are stored; [`DbFieldStore`] keeps them as JSON text in `block_fields`.

use crate::models::block_field::{self, Column, Entity as BlockFieldEntity, FieldScope, SHARED_OWNER};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Select, Set, TransactionTrait,
};
use serde_json::Value;
use std::collections::HashMap;

/// Identifies one block instance within a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub course_id: i64,
    pub block_id: i64,
}

impl BlockKey {
    pub fn new(course_id: i64, block_id: i64) -> Self {
        Self { course_id, block_id }
    }
}

/// Namespace a field lives in. Per-user state is keyed by the user it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Settings,
    Content,
    User(i64),
}

impl Namespace {
    fn parts(self) -> (FieldScope, i64) {
        match self {
            Namespace::Settings => (FieldScope::Settings, SHARED_OWNER),
            Namespace::Content => (FieldScope::Content, SHARED_OWNER),
            Namespace::User(user_id) => (FieldScope::UserState, user_id),
        }
    }
}

/// A pending field assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub namespace: Namespace,
    pub name: String,
    pub value: Value,
}

impl FieldWrite {
    pub fn new(namespace: Namespace, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            namespace,
            name: name.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait FieldStore: Send + Sync {
    async fn get(
        &self,
        block: BlockKey,
        namespace: Namespace,
        name: &str,
    ) -> Result<Option<Value>, DbErr>;

    async fn get_all(
        &self,
        block: BlockKey,
        namespace: Namespace,
    ) -> Result<HashMap<String, Value>, DbErr>;

    /// Applies every write or none of them.
    async fn commit(&self, block: BlockKey, writes: Vec<FieldWrite>) -> Result<(), DbErr>;
}

/// [`FieldStore`] backed by the `block_fields` table.
#[derive(Clone)]
pub struct DbFieldStore {
    db: DatabaseConnection,
}

impl DbFieldStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn scoped(block: BlockKey, namespace: Namespace) -> Select<BlockFieldEntity> {
    let (scope, user_id) = namespace.parts();
    BlockFieldEntity::find()
        .filter(Column::CourseId.eq(block.course_id))
        .filter(Column::BlockId.eq(block.block_id))
        .filter(Column::Scope.eq(scope))
        .filter(Column::UserId.eq(user_id))
}

fn decode(row: &block_field::Model) -> Result<Value, DbErr> {
    serde_json::from_str(&row.value)
        .map_err(|e| DbErr::Custom(format!("corrupt value for field '{}': {e}", row.name)))
}

/// Inserts the field or, when its key already exists, replaces the value in place.
async fn upsert<C: ConnectionTrait>(conn: &C, block: BlockKey, write: FieldWrite) -> Result<(), DbErr> {
    let (scope, user_id) = write.namespace.parts();
    let row = block_field::ActiveModel {
        course_id: Set(block.course_id),
        block_id: Set(block.block_id),
        scope: Set(scope),
        user_id: Set(user_id),
        name: Set(write.name),
        value: Set(write.value.to_string()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };

    BlockFieldEntity::insert(row)
        .on_conflict(
            OnConflict::columns([
                Column::CourseId,
                Column::BlockId,
                Column::Scope,
                Column::UserId,
                Column::Name,
            ])
            .update_columns([Column::Value, Column::UpdatedAt])
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl FieldStore for DbFieldStore {
    async fn get(
        &self,
        block: BlockKey,
        namespace: Namespace,
        name: &str,
    ) -> Result<Option<Value>, DbErr> {
        scoped(block, namespace)
            .filter(Column::Name.eq(name))
            .one(&self.db)
            .await?
            .map(|row| decode(&row))
            .transpose()
    }

    async fn get_all(
        &self,
        block: BlockKey,
        namespace: Namespace,
    ) -> Result<HashMap<String, Value>, DbErr> {
        scoped(block, namespace)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| decode(&row).map(|v| (row.name, v)))
            .collect()
    }

    async fn commit(&self, block: BlockKey, writes: Vec<FieldWrite>) -> Result<(), DbErr> {
        if writes.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            course_id = block.course_id,
            block_id = block.block_id,
            fields = writes.len(),
            "committing block fields"
        );
        let txn = self.db.begin().await?;
        for write in writes {
            upsert(&txn, block, write).await?;
        }
        txn.commit().await
    }
}
