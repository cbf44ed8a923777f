use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde::Serialize;

/// Mentor contact for a course: up to three addresses that relayed messages go to.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "mentors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub course_id: i64,
    pub email1: Option<String>,
    pub email2: Option<String>,
    pub email3: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        course_id: i64,
        emails: [Option<&str>; 3],
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        let [email1, email2, email3] = emails.map(|e| e.map(str::to_owned));
        ActiveModel {
            course_id: Set(course_id),
            email1: Set(email1),
            email2: Set(email2),
            email3: Set(email3),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn find_by_course(
        db: &DatabaseConnection,
        course_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .one(db)
            .await
    }

    /// Configured addresses in slot order, skipping empty slots.
    pub fn recipients(&self) -> Vec<String> {
        [&self.email1, &self.email2, &self.email3]
            .into_iter()
            .flatten()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
