use std::error::Error;

use diesel::{sql_query, RunQueryDsl, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::debug;

pub const BLOB_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/blob");
pub const CONTENT_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/content");

/// Which schema a database file carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbType {
    /// Ledger and metrics tables.
    Blob,
    /// Components, asset blobs and assets.
    Content,
}

fn get_migrations(db_type: &DbType) -> EmbeddedMigrations {
    match db_type {
        DbType::Blob => BLOB_MIGRATIONS,
        DbType::Content => CONTENT_MIGRATIONS,
    }
}

pub fn apply_migrations(
    conn: &mut SqliteConnection,
    db_type: &DbType,
) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    loop {
        match conn.run_pending_migrations(get_migrations(db_type)) {
            Ok(applied) => {
                if !applied.is_empty() {
                    debug!(?db_type, count = applied.len(), "applied migrations");
                }
                break;
            }
            Err(e) if e.to_string().contains("already exists") => {
                debug!(?db_type, "schema created by another connection, recording version");
                mark_first_pending(conn, db_type)?;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

// A node racing us may have created the tables before recording the version.
fn mark_first_pending(
    conn: &mut SqliteConnection,
    db_type: &DbType,
) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let pending = conn.pending_migrations(get_migrations(db_type))?;
    if let Some(first) = pending.first() {
        sql_query("INSERT OR IGNORE INTO __diesel_schema_migrations (version) VALUES (?1)")
            .bind::<diesel::sql_types::Text, _>(first.name().version().to_string())
            .execute(conn)?;
    }

    Ok(())
}
