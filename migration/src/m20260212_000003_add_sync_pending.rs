use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Set when a remote sync failed part way and the next run has to reconcile
        manager
            .alter_table(
                Table::alter()
                    .table("playlist_connectors")
                    .add_column(
                        ColumnDef::new("sync_pending")
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table("playlist_connectors")
                    .drop_column("sync_pending")
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
