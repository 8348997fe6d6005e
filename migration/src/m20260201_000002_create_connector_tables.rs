use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Platform-native track ids, one per connector
        manager
            .create_table(
                Table::create()
                    .table(TrackConnectorId::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TrackConnectorId::Connector).string().not_null())
                    .col(ColumnDef::new(TrackConnectorId::ExternalId).string().not_null())
                    .col(ColumnDef::new(TrackConnectorId::TrackId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(TrackConnectorId::Connector)
                            .col(TrackConnectorId::ExternalId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_track_connector_ids_track_id")
                            .from(TrackConnectorId::Table, TrackConnectorId::TrackId)
                            .to("tracks", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // External playlist ids plus the last known version token
        manager
            .create_table(
                Table::create()
                    .table(PlaylistConnector::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PlaylistConnector::PlaylistId).integer().not_null())
                    .col(ColumnDef::new(PlaylistConnector::Connector).string().not_null())
                    .col(ColumnDef::new(PlaylistConnector::ExternalId).string().not_null())
                    .col(ColumnDef::new(PlaylistConnector::VersionToken).string())
                    .primary_key(
                        Index::create()
                            .col(PlaylistConnector::PlaylistId)
                            .col(PlaylistConnector::Connector),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_playlist_connectors_playlist_id")
                            .from(PlaylistConnector::Table, PlaylistConnector::PlaylistId)
                            .to("playlists", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_track_connector_ids_track_id")
                    .table(TrackConnectorId::Table)
                    .col(TrackConnectorId::TrackId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_playlist_connectors_external_id")
                    .table(PlaylistConnector::Table)
                    .col(PlaylistConnector::Connector)
                    .col(PlaylistConnector::ExternalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlaylistConnector::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrackConnectorId::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum TrackConnectorId {
    #[sea_orm(iden = "track_connector_ids")]
    Table,
    Connector,
    ExternalId,
    TrackId,
}

#[derive(DeriveIden)]
enum PlaylistConnector {
    #[sea_orm(iden = "playlist_connectors")]
    Table,
    PlaylistId,
    Connector,
    ExternalId,
    VersionToken,
}
