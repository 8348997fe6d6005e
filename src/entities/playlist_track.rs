use sea_orm::entity::prelude::*;

/// One slot of a playlist. The same track may fill several slots.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "playlist_tracks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub playlist_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub position: i32,
    pub track_id: i64,
}

impl ActiveModelBehavior for ActiveModel {}
