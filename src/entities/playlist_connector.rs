use sea_orm::entity::prelude::*;

use crate::domain::Connector;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "playlist_connectors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub playlist_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub connector: Connector,
    pub external_id: String,
    /// Last version/snapshot token seen for this connector.
    pub version_token: Option<String>,
    pub sync_pending: bool,
}

impl ActiveModelBehavior for ActiveModel {}
