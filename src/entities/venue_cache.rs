use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "venue_cache")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub venue_id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub lat: String,
    pub lng: String,
    // JSON-encoded
    pub contact: Option<String>,
    pub url: Option<String>,
    pub hours: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
