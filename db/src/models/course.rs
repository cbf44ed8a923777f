use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use serde::Serialize;

/// A course offering. Blocks, enrolments and mentors all hang off a course.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique course code, e.g. `COS301`.
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_course_role::Entity")]
    UserCourseRole,
    #[sea_orm(has_one = "super::mentor::Entity")]
    Mentor,
}

impl Related<super::user_course_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserCourseRole.def()
    }
}

impl Related<super::mentor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mentor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(db: &DatabaseConnection, code: &str, name: &str) -> Result<Model, DbErr> {
        ActiveModel {
            code: Set(code.to_owned()),
            name: Set(name.to_owned()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }
}
