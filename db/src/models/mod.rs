pub mod block_field;
pub mod course;
pub mod mentor;
pub mod mentor_message;
pub mod user;
pub mod user_course_role;

pub use block_field::Entity as BlockField;
pub use course::Entity as Course;
pub use mentor::Entity as Mentor;
pub use mentor_message::Entity as MentorMessage;
pub use user::Entity as User;
pub use user_course_role::Entity as UserCourseRole;
