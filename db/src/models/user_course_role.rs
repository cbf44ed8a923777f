use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Enrolment of a user in a course, with the role they hold there.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_course_roles")]
pub struct Model {
    /// User ID (foreign key to `users`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Course ID (foreign key to `courses`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: i64,

    pub role: Role,
}

/// Enum representing user roles within a course.
/// Backed by a `user_course_role_type` enum in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_course_role_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "instructor")]
    Instructor,

    #[sea_orm(string_value = "staff")]
    Staff,

    #[sea_orm(string_value = "student")]
    Student,
}

impl Role {
    /// Instructors and course staff may configure blocks and relay messages.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Instructor | Role::Staff)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

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
    pub async fn assign_user_to_course(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
        role: Role,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            role: Set(role),
        }
        .insert(db)
        .await
    }

    /// Role the user holds in the course, `None` when not enrolled.
    pub async fn find_role(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Role>, DbErr> {
        Ok(Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::CourseId.eq(course_id))
            .one(db)
            .await?
            .map(|m| m.role))
    }
}
