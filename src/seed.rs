use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::db;
use crate::recipes;

pub struct SeedStats {
    pub read: usize,
    pub inserted: usize,
}

/// Load the scraper's CSV into the recipe table. A missing or malformed file is an error.
pub fn seed_recipes(conn: &Connection, csv_path: &Path) -> Result<SeedStats> {
    let records = recipes::read_csv(csv_path).context("Recipe seeding failed")?;
    let inserted = db::insert_recipes(conn, &records)?;
    info!(
        path = %csv_path.display(),
        read = records.len(),
        inserted,
        "Seeded recipes"
    );
    Ok(SeedStats {
        read: records.len(),
        inserted,
    })
}
