use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// One persisted field value of a block, in one of three namespaces.
///
/// `user_id` is the owning user for the `user_state` scope and [`SHARED_OWNER`] otherwise.
/// `(course_id, block_id, scope, user_id, name)` is unique. `value` holds JSON text.
pub const SHARED_OWNER: i64 = 0;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "block_fields")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_id: i64,
    pub block_id: i64,
    pub scope: FieldScope,
    pub user_id: i64,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "block_field_scope")]
pub enum FieldScope {
    /// Author-facing settings such as display name, points and weight.
    #[sea_orm(string_value = "settings")]
    Settings,
    /// Authored content such as the description.
    #[sea_orm(string_value = "content")]
    Content,
    /// Per-student state.
    #[sea_orm(string_value = "user_state")]
    UserState,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
