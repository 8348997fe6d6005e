use sea_orm::entity::prelude::*;

use crate::domain::Connector;

/// A platform-native id for a local track.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "track_connector_ids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub connector: Connector,
    #[sea_orm(primary_key, auto_increment = false)]
    pub external_id: String,
    pub track_id: i64,
}

impl ActiveModelBehavior for ActiveModel {}
