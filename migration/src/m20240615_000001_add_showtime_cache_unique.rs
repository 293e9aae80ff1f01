use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Lets the cache insert with ON CONFLICT DO NOTHING on (venue_id, film_id).
        manager
            .create_index(
                Index::create()
                    .name("idx_showtime_cache_unique")
                    .table(ShowtimeCache::Table)
                    .if_not_exists()
                    .col(ShowtimeCache::VenueId)
                    .col(ShowtimeCache::FilmId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_showtime_cache_unique")
                    .table(ShowtimeCache::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ShowtimeCache {
    Table,
    VenueId,
    FilmId,
}
