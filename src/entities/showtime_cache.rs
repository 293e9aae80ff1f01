use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "showtime_cache")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub venue_id: String,
    pub film_id: String,
    pub film_name: String,
    pub showings: String,
    pub show_dates: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
