use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            r#"
            CREATE OR REPLACE FUNCTION create_user(
                p_first_name TEXT,
                p_last_name TEXT,
                p_email TEXT,
                p_phone TEXT
            ) RETURNS BIGINT
            LANGUAGE plpgsql
            AS $$
            DECLARE
                v_id BIGINT;
            BEGIN
                INSERT INTO users (first_name, last_name, email, phone)
                VALUES (p_first_name, p_last_name, p_email, p_phone)
                RETURNING id INTO v_id;
                RETURN v_id;
            END;
            $$
            "#,
        )
        .await?;

        // OUT parameters on procedures need PostgreSQL 14+.
        db.execute_unprepared(
            r#"
            CREATE OR REPLACE PROCEDURE create_user_procedure(
                p_first_name TEXT,
                p_last_name TEXT,
                p_email TEXT,
                p_phone TEXT,
                OUT new_id BIGINT
            )
            LANGUAGE plpgsql
            AS $$
            BEGIN
                INSERT INTO users (first_name, last_name, email, phone)
                VALUES (p_first_name, p_last_name, p_email, p_phone)
                RETURNING id INTO new_id;
            END;
            $$
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP PROCEDURE IF EXISTS create_user_procedure")
            .await?;
        db.execute_unprepared("DROP FUNCTION IF EXISTS create_user")
            .await?;
        Ok(())
    }
}
