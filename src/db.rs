use sea_orm::{Database, DatabaseConnection, DbErr};
use std::env;

/// Connection string used when DATABASE_URL is not set: a SQLite file
/// next to the binary, created on first run.
const DEFAULT_DATABASE_URL: &str = "sqlite://coursework.db?mode=rwc";

/// Opens the connection pool. `Database::connect` hands out pooled
/// connections, so handlers borrow one per request and release it when
/// the request ends; there is no process-global connection to leak.
pub async fn set_up_db() -> Result<DatabaseConnection, DbErr> {
    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let db = Database::connect(db_url).await?;

    Ok(db)
}
