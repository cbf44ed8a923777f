use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202610190006_create_block_fields"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("block_fields"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("course_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("block_id")).integer().not_null())
                    .col(
                        ColumnDef::new(Alias::new("scope"))
                            .enumeration(
                                Alias::new("block_field_scope"),
                                vec![
                                    Alias::new("settings"),
                                    Alias::new("content"),
                                    Alias::new("user_state"),
                                ],
                            )
                            .not_null(),
                    )
                    // 0 for the shared settings and content scopes.
                    .col(ColumnDef::new(Alias::new("user_id")).integer().not_null().default(0))
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("value")).text().not_null())
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_block_fields_key")
                    .table(Alias::new("block_fields"))
                    .col(Alias::new("course_id"))
                    .col(Alias::new("block_id"))
                    .col(Alias::new("scope"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("name"))
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("block_fields")).to_owned())
            .await
    }
}
