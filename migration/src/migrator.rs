use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202610190001_create_users::Migration),
            Box::new(migrations::m202610190002_create_courses::Migration),
            Box::new(migrations::m202610190003_create_user_course_roles::Migration),
            Box::new(migrations::m202610190004_create_mentors::Migration),
            Box::new(migrations::m202610190005_create_mentor_messages::Migration),
            Box::new(migrations::m202610190006_create_block_fields::Migration),
        ]
    }
}
