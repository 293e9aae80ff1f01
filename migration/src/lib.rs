pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_cache_tables;
mod m20240615_000001_add_showtime_cache_unique;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_cache_tables::Migration),
            Box::new(m20240615_000001_add_showtime_cache_unique::Migration),
        ]
    }
}
