use std::{fs::create_dir_all, path::Path};

use diesel::Connection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::Error;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Open (creating if necessary) the cache database and bring its schema up
/// to date. Unlike a fatal panic this leaves the decision to abort or run
/// without caching to the caller.
pub fn run_migrations(database_url: &str) -> Result<(), Error> {
    let path = Path::new(database_url);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            create_dir_all(parent).map_err(Error::storage)?;
        }
    }
    let mut connection =
        diesel::sqlite::SqliteConnection::establish(database_url).map_err(Error::storage)?;
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(Error::storage)?;

    Ok(())
}
