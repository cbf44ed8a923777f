use api::{auth::generate_jwt, routes::routes, state::AppState};
use axum::Router;
use db::models::{
    course::Model as CourseModel,
    mentor::Model as MentorModel,
    user::Model as UserModel,
    user_course_role::{Model as RoleModel, Role},
};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;
use services::email::RecordingMailer;
use std::sync::Arc;
use util::{config::AppConfig, storage::MemoryStorage};

pub const TEST_JWT_SECRET: &str = "test-secret";

/// Router plus the handles a test needs to seed data and inspect side effects.
pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub storage: Arc<MemoryStorage>,
    pub mailer: Arc<RecordingMailer>,
}

pub async fn make_test_app() -> TestApp {
    AppConfig::set_jwt_secret(TEST_JWT_SECRET);

    let db = setup_test_db().await;
    let storage = Arc::new(MemoryStorage::new());
    let mailer = Arc::new(RecordingMailer::new());
    let state = AppState::new(db.clone(), storage.clone(), mailer.clone());

    TestApp {
        app: Router::new().nest("/api", routes(state)),
        db,
        storage,
        mailer,
    }
}

/// A user in a course, with a bearer token for them.
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub token: String,
}

pub async fn create_course(db: &DatabaseConnection, mentor_emails: [Option<&str>; 3]) -> i64 {
    let course = CourseModel::create(db, "COS301", "Software Engineering").await.unwrap();
    MentorModel::create(db, course.id, mentor_emails).await.unwrap();
    course.id
}

pub async fn create_user(db: &DatabaseConnection, username: &str, course_id: i64, role: Option<Role>) -> TestUser {
    let email = format!("{username}@example.com");
    let user = UserModel::create(db, username, &email, false).await.unwrap();
    if let Some(role) = role {
        RoleModel::assign_user_to_course(db, user.id, course_id, role).await.unwrap();
    }
    let (token, _) = generate_jwt(user.id, false).unwrap();
    TestUser {
        id: user.id,
        email,
        token,
    }
}

pub fn block_uri(course_id: i64, block_id: i64, action: &str) -> String {
    format!("/api/courses/{course_id}/blocks/{block_id}/{action}")
}
