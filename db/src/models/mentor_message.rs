use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;

/// Audit row for a relayed message that the mail transport refused.
///
/// Rows are written once and never updated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "mentor_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub course_id: i64,
    /// Always `false` for rows written by the relay.
    pub is_delivered: bool,
    /// User who attempted the relay.
    pub sent_by: i64,
    /// Recipient address(es) attempted, comma separated.
    pub sent_to: String,
    /// Error text reported by the transport.
    #[sea_orm(column_type = "Text")]
    pub error: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SentBy",
        to = "super::user::Column::Id"
    )]
    Sender,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn record_undelivered(
        db: &DatabaseConnection,
        course_id: i64,
        sent_by: i64,
        sent_to: &str,
        subject: &str,
        message: &str,
        error: &str,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            subject: Set(subject.to_owned()),
            message: Set(message.to_owned()),
            course_id: Set(course_id),
            is_delivered: Set(false),
            sent_by: Set(sent_by),
            sent_to: Set(sent_to.to_owned()),
            error: Set(error.to_owned()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Failure records for a course, oldest first.
    pub async fn find_by_course(
        db: &DatabaseConnection,
        course_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}
