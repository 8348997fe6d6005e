pub use sea_orm_migration::prelude::*;

mod m20260201_000001_create_library_tables;
mod m20260201_000002_create_connector_tables;
mod m20260212_000003_add_sync_pending;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260201_000001_create_library_tables::Migration),
            Box::new(m20260201_000002_create_connector_tables::Migration),
            Box::new(m20260212_000003_add_sync_pending::Migration),
        ]
    }
}
