/*!
 * Cache schema definitions.
 *
 * One database file per job with two tables: `cache` holds paragraphs and
 * their translations, `info` holds job metadata and batch bookkeeping.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the cache schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        debug!("Initializing cache schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating cache schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read cache schema version")
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {};", version))?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS cache (
            id INTEGER UNIQUE,
            md5 TEXT UNIQUE,
            raw TEXT,
            original TEXT,
            ignored INTEGER DEFAULT 0,
            attributes TEXT DEFAULT NULL,
            page TEXT DEFAULT NULL,
            translation TEXT DEFAULT NULL,
            engine_name TEXT DEFAULT NULL,
            target_lang TEXT DEFAULT NULL
        );

        CREATE TABLE IF NOT EXISTS info (
            key TEXT UNIQUE,
            value TEXT
        );
        "#,
    )
    .context("Failed to create cache tables")?;
    Ok(())
}
