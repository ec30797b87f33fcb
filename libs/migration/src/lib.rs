pub use sea_orm_migration::prelude::*;

mod m20250105_000000_create_users;
mod m20250105_000001_create_user_views;
mod m20250105_000002_create_user_routines;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250105_000000_create_users::Migration),
            Box::new(m20250105_000001_create_user_views::Migration),
            Box::new(m20250105_000002_create_user_routines::Migration),
        ]
    }
}
