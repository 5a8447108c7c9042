use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use crate::models::InventoryRecord;

/// Open an inventory file and return its rows lazily, in file order.
/// A row that cannot be decoded (e.g. a missing DEVICE_TYPE or IP_ADDRESS column)
/// yields an error when it is reached.
pub fn read_inventory(path: &Path) -> Result<impl Iterator<Item = Result<InventoryRecord>>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open inventory {}", path.display()))?;
    Ok(records_from_reader(file))
}

/// Same as [`read_inventory`] over any reader
pub fn records_from_reader<R: Read>(reader: R) -> impl Iterator<Item = Result<InventoryRecord>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
        .into_deserialize::<InventoryRecord>()
        .enumerate()
        .map(|(idx, row)| {
            // +2: one for the header, one for 1-based line numbers
            row.with_context(|| format!("Malformed inventory row {}", idx + 2))
        })
}
