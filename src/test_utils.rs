use std::sync::Arc;

use sea_orm::{ConnectOptions, Database as SeaDatabase};

use crate::database::Database;

pub async fn test_db() -> Arc<Database> {
    // one connection, every pooled connection would get its own in-memory database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let conn = SeaDatabase::connect(opt).await.unwrap();

    Arc::new(Database::prepare(conn).await.unwrap())
}
