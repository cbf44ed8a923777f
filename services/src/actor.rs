use db::models::{
    user::Model as UserModel,
    user_course_role::{Model as RoleModel, Role},
};
use sea_orm::{DatabaseConnection, DbErr};

/// The authenticated user a request acts for, resolved against one course.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: i64,
    pub email: String,
    /// Site administrator. Administrators act as staff in every course.
    pub admin: bool,
    /// Role in the course, `None` when not enrolled.
    pub role: Option<Role>,
}

impl Actor {
    /// Looks up the user and their role in `course_id`. `None` if the user does not exist.
    pub async fn load(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Actor>, DbErr> {
        let Some(user) = UserModel::get_by_id(db, user_id).await? else {
            return Ok(None);
        };
        let role = RoleModel::find_role(db, user_id, course_id).await?;
        Ok(Some(Actor {
            user_id: user.id,
            email: user.email,
            admin: user.admin,
            role,
        }))
    }

    pub fn is_enrolled_student(&self) -> bool {
        self.role == Some(Role::Student)
    }

    /// Instructor or staff in the course, or an administrator.
    pub fn is_staff(&self) -> bool {
        self.admin || self.role.is_some_and(Role::is_staff)
    }
}
