use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Column order of the scraper output file.
pub const CSV_COLUMNS: [&str; 4] = ["title", "image_url", "parent_category", "link"];

/// One recipe found on a ranking page. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub title: String,
    pub image_url: String,
    pub parent_category: String,
    pub link: String,
}

/// Write the header and one row per record.
pub fn write_records<W: Write>(writer: W, records: &[RecipeRecord]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    // Written explicitly so an empty run still produces the header.
    csv.write_record(CSV_COLUMNS)?;
    for r in records {
        csv.serialize(r)?;
    }
    csv.flush()?;
    Ok(())
}

/// Create or truncate `path` and write all records to it.
pub fn write_csv(path: &Path, records: &[RecipeRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_records(file, records).with_context(|| format!("Failed to write {:?}", path))
}

pub fn read_csv(path: &Path) -> Result<Vec<RecipeRecord>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open {:?}", path))?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<RecipeRecord>, _>>()
        .with_context(|| format!("Malformed recipe row in {:?}", path))?;
    Ok(rows)
}
