use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // List and search queries read from this view.
        db.execute_unprepared(
            r#"
            CREATE OR REPLACE VIEW view_all_users AS
            SELECT id, first_name, last_name, email, phone, created_at
            FROM users
            "#,
        )
        .await?;

        // Single-record lookups read from this view.
        db.execute_unprepared(
            r#"
            CREATE OR REPLACE VIEW view_user_details AS
            SELECT id, first_name, last_name, email, phone, created_at
            FROM users
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP VIEW IF EXISTS view_user_details")
            .await?;
        db.execute_unprepared("DROP VIEW IF EXISTS view_all_users")
            .await?;
        Ok(())
    }
}
