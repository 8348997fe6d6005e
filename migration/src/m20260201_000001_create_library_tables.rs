use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create tracks table
        manager
            .create_table(
                Table::create()
                    .table(Track::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Track::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Track::Title).string().not_null())
                    .col(ColumnDef::new(Track::Artists).json().not_null())
                    .col(ColumnDef::new(Track::Album).string())
                    .col(ColumnDef::new(Track::DurationMs).big_integer())
                    .col(ColumnDef::new(Track::Isrc).string())
                    .col(
                        ColumnDef::new(Track::CreatedAt)
                            .integer()
                            .not_null()
                            .default(Expr::cust("(strftime('%s', 'now'))")),
                    )
                    .col(
                        ColumnDef::new(Track::UpdatedAt)
                            .integer()
                            .not_null()
                            .default(Expr::cust("(strftime('%s', 'now'))")),
                    )
                    .to_owned(),
            )
            .await?;

        // Create playlists table
        manager
            .create_table(
                Table::create()
                    .table(Playlist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Playlist::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Playlist::Name).string().not_null())
                    .col(ColumnDef::new(Playlist::Description).string())
                    .col(ColumnDef::new(Playlist::LastSyncedAt).timestamp())
                    .col(ColumnDef::new(Playlist::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Playlist::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create playlist_tracks table, one row per slot
        manager
            .create_table(
                Table::create()
                    .table(PlaylistTrack::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PlaylistTrack::PlaylistId).integer().not_null())
                    .col(ColumnDef::new(PlaylistTrack::Position).integer().not_null())
                    .col(ColumnDef::new(PlaylistTrack::TrackId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(PlaylistTrack::PlaylistId)
                            .col(PlaylistTrack::Position),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_playlist_tracks_playlist_id")
                            .from(PlaylistTrack::Table, PlaylistTrack::PlaylistId)
                            .to(Playlist::Table, Playlist::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_playlist_tracks_track_id")
                            .from(PlaylistTrack::Table, PlaylistTrack::TrackId)
                            .to(Track::Table, Track::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracks_isrc")
                    .table(Track::Table)
                    .col(Track::Isrc)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlaylistTrack::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Playlist::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Track::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Track {
    #[sea_orm(iden = "tracks")]
    Table,
    Id,
    Title,
    Artists,
    Album,
    DurationMs,
    Isrc,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Playlist {
    #[sea_orm(iden = "playlists")]
    Table,
    Id,
    Name,
    Description,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PlaylistTrack {
    #[sea_orm(iden = "playlist_tracks")]
    Table,
    PlaylistId,
    Position,
    TrackId,
}
