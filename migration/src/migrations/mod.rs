pub mod m202610190001_create_users;
pub mod m202610190002_create_courses;
pub mod m202610190003_create_user_course_roles;
pub mod m202610190004_create_mentors;
pub mod m202610190005_create_mentor_messages;
pub mod m202610190006_create_block_fields;
