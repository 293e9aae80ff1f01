use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VenueCache::Table)
                    .if_not_exists()
                    .col(string(VenueCache::VenueId).primary_key())
                    .col(string(VenueCache::Name))
                    .col(string(VenueCache::Address))
                    .col(string(VenueCache::City))
                    .col(string(VenueCache::Lat))
                    .col(string(VenueCache::Lng))
                    .col(text_null(VenueCache::Contact))
                    .col(text_null(VenueCache::Url))
                    .col(text_null(VenueCache::Hours))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShowtimeCache::Table)
                    .if_not_exists()
                    .col(pk_auto(ShowtimeCache::Id))
                    .col(string(ShowtimeCache::VenueId))
                    .col(string(ShowtimeCache::FilmId))
                    .col(string(ShowtimeCache::FilmName))
                    .col(text(ShowtimeCache::Showings))
                    .col(text(ShowtimeCache::ShowDates))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_showtime_cache_venue")
                    .table(ShowtimeCache::Table)
                    .if_not_exists()
                    .col(ShowtimeCache::VenueId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ShowtimeCache::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(VenueCache::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum VenueCache {
    Table,
    VenueId,
    Name,
    Address,
    City,
    Lat,
    Lng,
    Contact,
    Url,
    Hours,
}

#[derive(DeriveIden)]
enum ShowtimeCache {
    Table,
    Id,
    VenueId,
    FilmId,
    FilmName,
    Showings,
    ShowDates,
}
