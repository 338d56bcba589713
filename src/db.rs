use anyhow::Result;
use sea_orm::{Database, DatabaseConnection};

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let conn = Database::connect(database_url).await?;
    Ok(conn)
}

/// Apply the SQL files in `migrations/` through the pool backing the ORM connection.
///
/// Returns how many migrations the schema is now at.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<usize> {
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(conn.get_postgres_connection_pool()).await?;
    Ok(migrator.iter().count())
}
