use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Cover URL cache, one row per normalized identifier
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS cover_cache (
            isbn TEXT PRIMARY KEY NOT NULL,
            url TEXT NOT NULL,
            fetched_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Staleness is checked per read, the index only helps manual cleanup
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "CREATE INDEX IF NOT EXISTS idx_cover_cache_fetched_at ON cover_cache (fetched_at)"
                .to_owned(),
        ))
        .await;

    Ok(())
}
